use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

string_id!(RequisitionId);
string_id!(RequisitionItemId);
string_id!(MaterialId);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequisitionType {
    Replenishment,
    DirectPurchase,
    Emergency,
}

impl RequisitionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replenishment => "replenishment",
            Self::DirectPurchase => "direct_purchase",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for RequisitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requisition lifecycle state. Values the backend adds later are kept
/// verbatim as `Unknown` and never count as quotable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequisitionWorkflowState {
    Created,
    PendingApproval,
    Approved,
    Rejected,
    Forwarded,
    InQuotation,
    Finished,
    Cancelled,
    Unknown(String),
}

impl RequisitionWorkflowState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Forwarded => "forwarded",
            Self::InQuotation => "in_quotation",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
            Self::Unknown(value) => value,
        }
    }

    pub fn is_cancelled_or_rejected(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Rejected)
    }
}

impl From<String> for RequisitionWorkflowState {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "pending_approval" => Self::PendingApproval,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "forwarded" => Self::Forwarded,
            "in_quotation" => Self::InQuotation,
            "finished" => Self::Finished,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown(value),
        }
    }
}

impl From<RequisitionWorkflowState> for String {
    fn from(value: RequisitionWorkflowState) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for RequisitionWorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requisition {
    pub id: RequisitionId,
    pub number: String,
    #[serde(rename = "type")]
    pub requisition_type: RequisitionType,
    #[serde(default)]
    pub priority: String,
    pub status: RequisitionWorkflowState,
    #[serde(default)]
    pub workflow_state: Option<RequisitionWorkflowState>,
    #[serde(default)]
    pub cost_center_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    pub requester_id: String,
    #[serde(default)]
    pub requested_on: Option<NaiveDate>,
}

impl Requisition {
    /// `workflow_state` wins over the legacy `status` column when both exist.
    pub fn effective_state(&self) -> &RequisitionWorkflowState {
        self.workflow_state.as_ref().unwrap_or(&self.status)
    }

    /// Approved or already in quotation, and neither column cancelled/rejected.
    pub fn is_quotable_state(&self) -> bool {
        let terminal = self.status.is_cancelled_or_rejected()
            || self.workflow_state.as_ref().is_some_and(|state| state.is_cancelled_or_rejected());
        if terminal {
            return false;
        }

        matches!(
            self.effective_state(),
            RequisitionWorkflowState::Approved | RequisitionWorkflowState::InQuotation
        )
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority.trim().eq_ignore_ascii_case("high")
    }

    pub fn can_transition_to(&self, next: &RequisitionWorkflowState) -> bool {
        use RequisitionWorkflowState::*;

        matches!(
            (self.effective_state(), next),
            (Created, PendingApproval)
                | (Created, Cancelled)
                | (PendingApproval, Approved)
                | (PendingApproval, Rejected)
                | (Approved, Forwarded)
                | (Approved, Cancelled)
                | (Forwarded, InQuotation)
                | (Forwarded, Cancelled)
                | (InQuotation, Finished)
        )
    }

    pub fn transition_to(&mut self, next: RequisitionWorkflowState) -> Result<(), DomainError> {
        if self.can_transition_to(&next) {
            self.status = next.clone();
            self.workflow_state = Some(next);
            return Ok(());
        }

        Err(DomainError::InvalidTransition {
            entity: "requisition",
            from: self.effective_state().to_string(),
            to: next.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionItem {
    pub id: RequisitionItemId,
    pub requisition_id: RequisitionId,
    pub material_id: MaterialId,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub estimated_unit_value: Option<Decimal>,
}

impl RequisitionItem {
    /// `None` when the product leaves the `Decimal` range.
    pub fn estimated_total(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.estimated_unit_value.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        MaterialId, Requisition, RequisitionId, RequisitionItem, RequisitionItemId,
        RequisitionType, RequisitionWorkflowState,
    };
    use crate::errors::DomainError;

    fn requisition(
        status: RequisitionWorkflowState,
        workflow_state: Option<RequisitionWorkflowState>,
    ) -> Requisition {
        Requisition {
            id: RequisitionId::from("R-1"),
            number: "REQ-0001".to_owned(),
            requisition_type: RequisitionType::Replenishment,
            priority: "normal".to_owned(),
            status,
            workflow_state,
            cost_center_id: None,
            project_id: None,
            requester_id: "U-1".to_owned(),
            requested_on: None,
        }
    }

    #[test]
    fn workflow_state_takes_precedence_over_status() {
        let req = requisition(
            RequisitionWorkflowState::Created,
            Some(RequisitionWorkflowState::Approved),
        );
        assert_eq!(req.effective_state(), &RequisitionWorkflowState::Approved);
        assert!(req.is_quotable_state());
    }

    #[test]
    fn cancelled_status_blocks_even_when_workflow_is_approved() {
        let req = requisition(
            RequisitionWorkflowState::Cancelled,
            Some(RequisitionWorkflowState::Approved),
        );
        assert!(!req.is_quotable_state());
    }

    #[test]
    fn unknown_states_round_trip_and_are_not_quotable() {
        let state: RequisitionWorkflowState =
            serde_json::from_str("\"on_hold\"").expect("any string parses");
        assert_eq!(state, RequisitionWorkflowState::Unknown("on_hold".to_owned()));
        assert_eq!(serde_json::to_string(&state).expect("serialize"), "\"on_hold\"");
        assert!(!requisition(state, None).is_quotable_state());
    }

    #[test]
    fn allows_forwarded_requisition_to_enter_quotation() {
        let mut req = requisition(RequisitionWorkflowState::Forwarded, None);
        req.transition_to(RequisitionWorkflowState::InQuotation).expect("forwarded->in_quotation");
        assert_eq!(req.effective_state(), &RequisitionWorkflowState::InQuotation);
    }

    #[test]
    fn blocks_finished_requisition_from_reopening() {
        let mut req = requisition(RequisitionWorkflowState::Finished, None);
        let error = req
            .transition_to(RequisitionWorkflowState::Approved)
            .expect_err("finished->approved should fail");
        assert!(matches!(error, DomainError::InvalidTransition { entity: "requisition", .. }));
    }

    #[test]
    fn requisition_type_uses_snake_case_wire_names() {
        let parsed: RequisitionType =
            serde_json::from_str("\"direct_purchase\"").expect("direct purchase");
        assert_eq!(parsed, RequisitionType::DirectPurchase);
        assert_eq!(RequisitionType::Emergency.to_string(), "emergency");
    }

    #[test]
    fn estimated_total_treats_missing_unit_value_as_zero() {
        let mut item = RequisitionItem {
            id: RequisitionItemId::from("I-1"),
            requisition_id: RequisitionId::from("R-1"),
            material_id: MaterialId::from("M-1"),
            quantity: Decimal::new(10, 0),
            unit: "un".to_owned(),
            estimated_unit_value: Some(Decimal::new(5, 0)),
        };
        assert_eq!(item.estimated_total(), Some(Decimal::new(50, 0)));

        item.estimated_unit_value = None;
        assert_eq!(item.estimated_total(), Some(Decimal::ZERO));

        item.quantity = Decimal::MAX;
        item.estimated_unit_value = Some(Decimal::new(2, 0));
        assert_eq!(item.estimated_total(), None);
    }
}
