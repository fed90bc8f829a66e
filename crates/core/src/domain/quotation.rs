use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::requisition::{MaterialId, RequisitionId, RequisitionItemId};
use crate::normalize::{FieldNormalizer, NormalizationIssue, RawFlag, RawNumber};

string_id!(CycleId);
string_id!(QuotationSupplierId);
string_id!(SupplierId);
string_id!(OfferId);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CycleState {
    Draft,
    PendingApproval,
    Approved,
    Open,
    InQuotation,
    Complete,
    Rejected,
    Cancelled,
    Unknown(String),
}

impl CycleState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Open => "open",
            Self::InQuotation => "in_quotation",
            Self::Complete => "complete",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Unknown(value) => value,
        }
    }

    /// Offers under a cycle in one of these states claim their requisition items.
    pub fn claims_items(&self) -> bool {
        matches!(
            self,
            Self::Draft | Self::PendingApproval | Self::Approved | Self::Open | Self::InQuotation
        )
    }

    /// A cycle in one of these states hides its requisition from new cycles entirely.
    pub fn blocks_requisition(&self) -> bool {
        matches!(self, Self::Draft | Self::PendingApproval)
    }
}

impl From<String> for CycleState {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Self::Draft,
            "pending_approval" => Self::PendingApproval,
            "approved" => Self::Approved,
            "open" => Self::Open,
            "in_quotation" => Self::InQuotation,
            "complete" => Self::Complete,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown(value),
        }
    }
}

impl From<CycleState> for String {
    fn from(value: CycleState) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SupplierStatus {
    Pending,
    Approved,
    Complete,
    Declined,
    Unknown(String),
}

impl SupplierStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Complete => "complete",
            Self::Declined => "declined",
            Self::Unknown(value) => value,
        }
    }

    pub fn is_approved_or_complete(&self) -> bool {
        matches!(self, Self::Approved | Self::Complete)
    }
}

impl From<String> for SupplierStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "complete" => Self::Complete,
            "declined" => Self::Declined,
            _ => Self::Unknown(value),
        }
    }
}

impl From<SupplierStatus> for String {
    fn from(value: SupplierStatus) -> Self {
        value.as_str().to_owned()
    }
}

/// Cycle row as stored by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationCycleRecord {
    pub id: CycleId,
    pub requisition_id: RequisitionId,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub observations: Option<String>,
    pub workflow_state: CycleState,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub freight_general: Option<RawNumber>,
    #[serde(default)]
    pub discount_percent_general: Option<RawNumber>,
    #[serde(default)]
    pub discount_value_general: Option<RawNumber>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationCycle {
    pub id: CycleId,
    pub requisition_id: RequisitionId,
    pub number: String,
    pub observations: Option<String>,
    pub workflow_state: CycleState,
    pub created_by: Option<String>,
    pub freight_general: Decimal,
    pub discount_percent_general: Decimal,
    pub discount_value_general: Decimal,
}

impl QuotationCycleRecord {
    pub fn normalize(&self, issues: &mut Vec<NormalizationIssue>) -> QuotationCycle {
        let mut fields = FieldNormalizer::new(format!("cycle:{}", self.id), issues);

        QuotationCycle {
            id: self.id.clone(),
            requisition_id: self.requisition_id.clone(),
            number: self.number.clone(),
            observations: self.observations.clone(),
            workflow_state: self.workflow_state.clone(),
            created_by: self.created_by.clone(),
            freight_general: fields.value("freight_general", self.freight_general.as_ref()),
            discount_percent_general: fields
                .value("discount_percent_general", self.discount_percent_general.as_ref()),
            discount_value_general: fields
                .value("discount_value_general", self.discount_value_general.as_ref()),
        }
    }
}

/// Per-supplier bid row as stored by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationSupplierRecord {
    pub id: QuotationSupplierId,
    pub cycle_id: CycleId,
    pub supplier_id: SupplierId,
    #[serde(default)]
    pub freight: Option<RawNumber>,
    #[serde(default)]
    pub tax: Option<RawNumber>,
    #[serde(default)]
    pub discount_percent: Option<RawNumber>,
    #[serde(default)]
    pub discount_value: Option<RawNumber>,
    #[serde(default)]
    pub status: Option<SupplierStatus>,
    #[serde(default)]
    pub selected: Option<bool>,
    #[serde(default)]
    pub observations: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationSupplier {
    pub id: QuotationSupplierId,
    pub cycle_id: CycleId,
    pub supplier_id: SupplierId,
    pub freight: Decimal,
    pub tax: Decimal,
    pub discount_percent: Decimal,
    pub discount_value: Decimal,
    pub status: Option<SupplierStatus>,
    pub selected: Option<bool>,
    pub observations: Option<String>,
    /// Whether the stored row carried `freight` (null/absent is not zero).
    pub freight_recorded: bool,
    pub discount_value_recorded: bool,
}

impl QuotationSupplier {
    /// Rows written before freight/discount capture have neither column set.
    pub fn has_detailed_costs(&self) -> bool {
        self.freight_recorded || self.discount_value_recorded
    }
}

impl QuotationSupplierRecord {
    pub fn normalize(&self, issues: &mut Vec<NormalizationIssue>) -> QuotationSupplier {
        let mut fields = FieldNormalizer::new(format!("supplier:{}", self.id), issues);
        let freight = fields.amount("freight", self.freight.as_ref());
        let discount_value = fields.amount("discount_value", self.discount_value.as_ref());

        QuotationSupplier {
            id: self.id.clone(),
            cycle_id: self.cycle_id.clone(),
            supplier_id: self.supplier_id.clone(),
            freight: freight.value,
            tax: fields.value("tax", self.tax.as_ref()),
            discount_percent: fields.value("discount_percent", self.discount_percent.as_ref()),
            discount_value: discount_value.value,
            status: self.status.clone(),
            selected: self.selected,
            observations: self.observations.clone(),
            freight_recorded: freight.recorded,
            discount_value_recorded: discount_value.recorded,
        }
    }
}

/// Priced line offered by one supplier for one requisition item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationItemOfferRecord {
    pub id: OfferId,
    pub quotation_supplier_id: QuotationSupplierId,
    pub requisition_item_id: RequisitionItemId,
    pub material_id: MaterialId,
    #[serde(default)]
    pub quantity_offered: Option<RawNumber>,
    /// Older rows only carry the requested quantity.
    #[serde(default)]
    pub quantity: Option<RawNumber>,
    #[serde(default)]
    pub unit_value: Option<RawNumber>,
    #[serde(default)]
    pub freight: Option<RawNumber>,
    #[serde(default)]
    pub discount_percent: Option<RawNumber>,
    #[serde(default)]
    pub discount_value: Option<RawNumber>,
    #[serde(default)]
    pub is_winner: Option<RawFlag>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationItemOffer {
    pub id: OfferId,
    pub quotation_supplier_id: QuotationSupplierId,
    pub requisition_item_id: RequisitionItemId,
    pub material_id: MaterialId,
    pub quantity_offered: Decimal,
    pub unit_value: Decimal,
    pub freight: Decimal,
    pub discount_percent: Decimal,
    pub discount_value: Decimal,
    pub is_winner: bool,
}

impl QuotationItemOfferRecord {
    pub fn normalize(&self, issues: &mut Vec<NormalizationIssue>) -> QuotationItemOffer {
        let mut fields = FieldNormalizer::new(format!("offer:{}", self.id), issues);
        let quantity_offered = match self.quantity_offered.as_ref() {
            Some(raw) => fields.value("quantity_offered", Some(raw)),
            None => fields.value("quantity", self.quantity.as_ref()),
        };
        let is_winner = self.is_winner.as_ref().is_some_and(RawFlag::is_set)
            || self.status.as_deref().is_some_and(|status| status.trim() == "winner");

        QuotationItemOffer {
            id: self.id.clone(),
            quotation_supplier_id: self.quotation_supplier_id.clone(),
            requisition_item_id: self.requisition_item_id.clone(),
            material_id: self.material_id.clone(),
            quantity_offered,
            unit_value: fields.value("unit_value", self.unit_value.as_ref()),
            freight: fields.value("freight", self.freight.as_ref()),
            discount_percent: fields.value("discount_percent", self.discount_percent.as_ref()),
            discount_value: fields.value("discount_value", self.discount_value.as_ref()),
            is_winner,
        }
    }
}
