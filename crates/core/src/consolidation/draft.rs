use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::availability::selection::check_bulk_types;
use crate::availability::AvailabilityView;
use crate::domain::quotation::SupplierId;
use crate::domain::requisition::{RequisitionItemId, RequisitionType};

pub const MIN_SUPPLIERS: usize = 2;
pub const MAX_SUPPLIERS: usize = 6;

/// Items and invited suppliers for a cycle about to be created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationDraft {
    pub item_ids: Vec<RequisitionItemId>,
    pub supplier_ids: Vec<SupplierId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftViolationCode {
    EmptySelection,
    MixedTypes,
    EmergencySupplierCount,
    MinSuppliers,
    MaxSuppliers,
    DuplicateSupplier,
    UnavailableItem,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftViolation {
    pub code: DraftViolationCode,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftValidation {
    pub valid: bool,
    pub requisition_type: Option<RequisitionType>,
    pub violations: Vec<DraftViolation>,
}

impl DraftValidation {
    pub fn has(&self, code: DraftViolationCode) -> bool {
        self.violations.iter().any(|violation| violation.code == code)
    }
}

pub fn validate_draft(draft: &QuotationDraft, view: &AvailabilityView) -> DraftValidation {
    let mut violations = Vec::new();
    let mut push = |code, message: String| violations.push(DraftViolation { code, message });

    if draft.item_ids.is_empty() {
        push(DraftViolationCode::EmptySelection, "select at least one item".to_owned());
    }

    let mut types = Vec::new();
    for item_id in &draft.item_ids {
        match view.items.iter().find(|entry| &entry.item.id == item_id) {
            Some(entry) => types.push(entry.requisition_type),
            None => push(
                DraftViolationCode::UnavailableItem,
                format!("item `{item_id}` is not available for quotation"),
            ),
        }
    }

    let requisition_type = match check_bulk_types(types) {
        Ok(anchor) => anchor,
        Err(conflict) => {
            push(DraftViolationCode::MixedTypes, conflict.to_string());
            None
        }
    };

    let mut seen = BTreeSet::new();
    for supplier_id in &draft.supplier_ids {
        if !seen.insert(supplier_id) {
            push(
                DraftViolationCode::DuplicateSupplier,
                format!("supplier `{supplier_id}` is listed more than once"),
            );
        }
    }

    let supplier_count = seen.len();
    if requisition_type == Some(RequisitionType::Emergency) {
        if supplier_count != 1 {
            push(
                DraftViolationCode::EmergencySupplierCount,
                format!("emergency quotations need exactly one supplier, got {supplier_count}"),
            );
        }
    } else if supplier_count < MIN_SUPPLIERS {
        push(
            DraftViolationCode::MinSuppliers,
            format!("at least {MIN_SUPPLIERS} suppliers are required, got {supplier_count}"),
        );
    }

    if supplier_count > MAX_SUPPLIERS {
        push(
            DraftViolationCode::MaxSuppliers,
            format!("at most {MAX_SUPPLIERS} suppliers are allowed, got {supplier_count}"),
        );
    }

    DraftValidation { valid: violations.is_empty(), requisition_type, violations }
}
