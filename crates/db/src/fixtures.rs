use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tender_core::domain::approval::{ApprovalFlowKey, ApprovalFlowSnapshot};
use tender_core::domain::quotation::{
    QuotationCycleRecord, QuotationItemOfferRecord, QuotationSupplierRecord, SupplierId,
};
use tender_core::domain::requisition::{MaterialId, Requisition, RequisitionItem};

use crate::repositories::RepositoryError;

/// Deterministic purchasing dataset: five requisitions, an open cycle, a
/// split-award cycle awaiting approval, and a legacy cycle without
/// freight/discount columns.
const SEED_DATASET: &str = include_str!("../fixtures/seed.json");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalFlowEntry {
    pub key: ApprovalFlowKey,
    pub snapshot: ApprovalFlowSnapshot,
}

/// Raw records as exported by the hosting application.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub requisitions: Vec<Requisition>,
    #[serde(default)]
    pub requisition_items: Vec<RequisitionItem>,
    #[serde(default)]
    pub cycles: Vec<QuotationCycleRecord>,
    #[serde(default)]
    pub suppliers: Vec<QuotationSupplierRecord>,
    #[serde(default)]
    pub offers: Vec<QuotationItemOfferRecord>,
    #[serde(default)]
    pub materials: BTreeMap<MaterialId, String>,
    #[serde(default)]
    pub supplier_names: BTreeMap<SupplierId, String>,
    #[serde(default)]
    pub users: BTreeMap<String, String>,
    #[serde(default)]
    pub approval_flows: Vec<ApprovalFlowEntry>,
}

impl Dataset {
    pub fn seed() -> Result<Self, RepositoryError> {
        Self::from_json(SEED_DATASET)
    }

    pub fn from_json(raw: &str) -> Result<Self, RepositoryError> {
        serde_json::from_str(raw).map_err(|error| RepositoryError::Decode(error.to_string()))
    }
}
