use thiserror::Error;

use crate::availability::selection::TypeConflict;
use crate::consolidation::AggregationError;
use crate::domain::quotation::CycleId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("selection rejected: {0}")]
    EligibilityConflict(#[from] TypeConflict),
    #[error("invalid {entity} transition from {from} to {to}")]
    InvalidTransition { entity: &'static str, from: String, to: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("quotation not found: {cycle_id}")]
    QuotationNotFound { cycle_id: CycleId },
    #[error("data gathering failure: {0}")]
    Gathering(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<AggregationError> for ApplicationError {
    fn from(value: AggregationError) -> Self {
        match value {
            AggregationError::NotFound { cycle_id } => Self::QuotationNotFound { cycle_id },
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The selection could not be processed. Check the chosen requisitions and try again."
            }
            Self::NotFound { .. } => "Quotation not found.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::QuotationNotFound { cycle_id } => Self::NotFound {
                message: format!("quotation `{cycle_id}` does not exist"),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Gathering(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::availability::selection::TypeConflict;
    use crate::consolidation::AggregationError;
    use crate::domain::quotation::CycleId;
    use crate::domain::requisition::RequisitionType;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn eligibility_conflict_maps_to_bad_request_naming_types() {
        let interface = ApplicationError::from(DomainError::from(
            TypeConflict::ReplenishmentWithDirectPurchase,
        ))
        .into_interface("req-1");

        match interface {
            InterfaceError::BadRequest { ref message, ref correlation_id } => {
                assert_eq!(correlation_id, "req-1");
                assert!(message.contains("replenishment"));
                assert!(message.contains("direct_purchase"));
            }
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn anchor_conflict_message_names_both_types() {
        let error = DomainError::from(TypeConflict::IncompatibleWithAnchor {
            anchor: RequisitionType::Emergency,
            candidate: RequisitionType::Replenishment,
        });

        let message = error.to_string();
        assert!(message.contains("emergency"));
        assert!(message.contains("replenishment"));
    }

    #[test]
    fn missing_cycle_maps_to_not_found_state() {
        let interface =
            ApplicationError::from(AggregationError::NotFound { cycle_id: CycleId::from("C-9") })
                .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert_eq!(interface.user_message(), "Quotation not found.");
    }

    #[test]
    fn gathering_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::Gathering("read timed out".to_owned()).into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("bad threshold".to_owned()).into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
