pub mod criteria;
pub mod selection;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::quotation::{QuotationCycle, QuotationItemOffer, QuotationSupplier};
use crate::domain::requisition::{
    Requisition, RequisitionId, RequisitionItem, RequisitionItemId, RequisitionType,
};

use self::selection::Selection;

/// Result of loading one requisition's items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemLookup {
    Loaded { items: Vec<RequisitionItem> },
    Failed { reason: String },
}

impl ItemLookup {
    pub fn loaded(items: Vec<RequisitionItem>) -> Self {
        Self::Loaded { items }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed { reason: reason.into() }
    }
}

/// Items already attached to an active cycle, and requisitions hidden by a
/// cycle that has not left draft or approval.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimIndex {
    pub claimed_item_ids: BTreeSet<RequisitionItemId>,
    pub blocked_requisition_ids: BTreeSet<RequisitionId>,
}

impl ClaimIndex {
    pub fn from_claimed_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = RequisitionItemId>,
    {
        Self { claimed_item_ids: items.into_iter().collect(), ..Self::default() }
    }

    pub fn from_cycles(
        cycles: &[QuotationCycle],
        suppliers: &[QuotationSupplier],
        offers: &[QuotationItemOffer],
    ) -> Self {
        let active_cycles: BTreeSet<_> = cycles
            .iter()
            .filter(|cycle| cycle.workflow_state.claims_items())
            .map(|cycle| &cycle.id)
            .collect();
        let active_suppliers: BTreeSet<_> = suppliers
            .iter()
            .filter(|supplier| active_cycles.contains(&supplier.cycle_id))
            .map(|supplier| &supplier.id)
            .collect();

        let claimed_item_ids = offers
            .iter()
            .filter(|offer| active_suppliers.contains(&offer.quotation_supplier_id))
            .map(|offer| offer.requisition_item_id.clone())
            .collect();
        let blocked_requisition_ids = cycles
            .iter()
            .filter(|cycle| cycle.workflow_state.blocks_requisition())
            .map(|cycle| cycle.requisition_id.clone())
            .collect();

        Self { claimed_item_ids, blocked_requisition_ids }
    }

    pub fn is_claimed(&self, item: &RequisitionItemId) -> bool {
        self.claimed_item_ids.contains(item)
    }

    pub fn is_blocked(&self, requisition: &RequisitionId) -> bool {
        self.blocked_requisition_ids.contains(requisition)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityInput {
    pub requisitions: Vec<Requisition>,
    pub items_by_requisition: BTreeMap<RequisitionId, ItemLookup>,
    pub claims: ClaimIndex,
    /// The caller's current selection, used only to report the anchor type.
    #[serde(default)]
    pub selection: Selection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    ToQuote,
    InQuotation { claimed: usize, total: usize },
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToQuote => f.write_str("TO_QUOTE"),
            Self::InQuotation { claimed, total } => {
                write!(f, "IN_QUOTATION ({claimed} / {total} items)")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableRequisition {
    pub requisition: Requisition,
    pub status: AvailabilityStatus,
    /// Items not yet claimed by an active cycle.
    pub available_items: Vec<RequisitionItem>,
    pub total_items: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableItem {
    pub item: RequisitionItem,
    pub requisition_number: String,
    pub requisition_type: RequisitionType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AvailabilityWarning {
    ItemLookupFailed { requisition_id: RequisitionId, reason: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityView {
    pub requisitions: Vec<AvailableRequisition>,
    pub items: Vec<AvailableItem>,
    pub anchor_type: Option<RequisitionType>,
    pub warnings: Vec<AvailabilityWarning>,
}

impl AvailabilityView {
    pub fn contains_item(&self, id: &RequisitionItemId) -> bool {
        self.items.iter().any(|entry| &entry.item.id == id)
    }

    pub fn requisition(&self, id: &RequisitionId) -> Option<&AvailableRequisition> {
        self.requisitions.iter().find(|entry| &entry.requisition.id == id)
    }

    /// Type of the first selected entry still visible in this view.
    fn visible_anchor(&self, selection: &Selection) -> Option<RequisitionType> {
        let from_requisitions = self
            .requisitions
            .iter()
            .find(|entry| selection.contains_requisition(&entry.requisition.id))
            .map(|entry| entry.requisition.requisition_type);

        from_requisitions.or_else(|| {
            self.items
                .iter()
                .find(|entry| selection.contains_item(&entry.item.id))
                .map(|entry| entry.requisition_type)
        })
    }
}

pub trait AvailabilityFilter: Send + Sync {
    fn filter(&self, input: &AvailabilityInput) -> AvailabilityView;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicAvailabilityFilter;

impl AvailabilityFilter for DeterministicAvailabilityFilter {
    fn filter(&self, input: &AvailabilityInput) -> AvailabilityView {
        filter_available(input)
    }
}

pub fn filter_available(input: &AvailabilityInput) -> AvailabilityView {
    let mut view = AvailabilityView::default();

    for requisition in &input.requisitions {
        if !requisition.is_quotable_state() || input.claims.is_blocked(&requisition.id) {
            continue;
        }

        let items: &[RequisitionItem] = match input.items_by_requisition.get(&requisition.id) {
            Some(ItemLookup::Loaded { items }) => items,
            Some(ItemLookup::Failed { reason }) => {
                item_lookup_failed(&mut view, requisition, reason);
                &[]
            }
            None => {
                item_lookup_failed(&mut view, requisition, "no item lookup result");
                &[]
            }
        };

        let available_items: Vec<RequisitionItem> =
            items.iter().filter(|item| !input.claims.is_claimed(&item.id)).cloned().collect();
        if available_items.is_empty() {
            continue;
        }

        let total = items.len();
        let claimed = total - available_items.len();
        let status = if claimed == 0 {
            AvailabilityStatus::ToQuote
        } else {
            AvailabilityStatus::InQuotation { claimed, total }
        };

        view.items.extend(available_items.iter().map(|item| AvailableItem {
            item: item.clone(),
            requisition_number: requisition.number.clone(),
            requisition_type: requisition.requisition_type,
        }));
        view.requisitions.push(AvailableRequisition {
            requisition: requisition.clone(),
            status,
            available_items,
            total_items: total,
        });
    }

    view.anchor_type = view.visible_anchor(&input.selection);

    tracing::info!(
        event_name = "availability.projection.computed",
        requisitions = view.requisitions.len(),
        items = view.items.len(),
        warnings = view.warnings.len(),
        "availability projection computed"
    );

    view
}

fn item_lookup_failed(view: &mut AvailabilityView, requisition: &Requisition, reason: &str) {
    tracing::warn!(
        event_name = "availability.item_lookup.failed",
        requisition_id = %requisition.id,
        reason,
        "requisition items unavailable; treating requisition as empty"
    );
    view.warnings.push(AvailabilityWarning::ItemLookupFailed {
        requisition_id: requisition.id.clone(),
        reason: reason.to_owned(),
    });
}


#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::fixtures::{input, item, requisition};
    use super::{
        filter_available, AvailabilityStatus, AvailabilityWarning, ClaimIndex, ItemLookup,
    };
    use crate::domain::quotation::{
        CycleId, CycleState, OfferId, QuotationCycle, QuotationItemOffer, QuotationSupplier,
        QuotationSupplierId, SupplierId,
    };
    use crate::domain::requisition::{
        MaterialId, RequisitionId, RequisitionItemId, RequisitionType, RequisitionWorkflowState,
    };

    fn cycle(id: &str, requisition: &str, state: CycleState) -> QuotationCycle {
        QuotationCycle {
            id: CycleId::from(id),
            requisition_id: RequisitionId::from(requisition),
            number: format!("COT-{id}"),
            observations: None,
            workflow_state: state,
            created_by: None,
            freight_general: Decimal::ZERO,
            discount_percent_general: Decimal::ZERO,
            discount_value_general: Decimal::ZERO,
        }
    }

    fn supplier(id: &str, cycle: &str) -> QuotationSupplier {
        QuotationSupplier {
            id: QuotationSupplierId::from(id),
            cycle_id: CycleId::from(cycle),
            supplier_id: SupplierId::from("S-1"),
            freight: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            discount_value: Decimal::ZERO,
            status: None,
            selected: None,
            observations: None,
            freight_recorded: false,
            discount_value_recorded: false,
        }
    }

    fn offer(id: &str, supplier: &str, item: &str) -> QuotationItemOffer {
        QuotationItemOffer {
            id: OfferId::from(id),
            quotation_supplier_id: QuotationSupplierId::from(supplier),
            requisition_item_id: RequisitionItemId::from(item),
            material_id: MaterialId::from("M-1"),
            quantity_offered: Decimal::ONE,
            unit_value: Decimal::ONE,
            freight: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            discount_value: Decimal::ZERO,
            is_winner: false,
        }
    }

    #[test]
    fn unclaimed_requisition_is_to_quote_with_all_items() {
        let view = filter_available(&input(
            vec![requisition("R1", RequisitionType::Replenishment)],
            vec![item("I1", "R1", 10, 5), item("I2", "R1", 1, 100)],
            ClaimIndex::default(),
        ));

        assert_eq!(view.requisitions.len(), 1);
        assert_eq!(view.requisitions[0].status, AvailabilityStatus::ToQuote);
        assert_eq!(view.items.len(), 2);
        assert!(view.warnings.is_empty());
    }

    #[test]
    fn partially_claimed_requisition_reports_progress() {
        let view = filter_available(&input(
            vec![requisition("R1", RequisitionType::DirectPurchase)],
            vec![item("I1", "R1", 1, 1), item("I2", "R1", 1, 1), item("I3", "R1", 1, 1)],
            ClaimIndex::from_claimed_items([RequisitionItemId::from("I2")]),
        ));

        let status = view.requisitions[0].status;
        assert_eq!(status, AvailabilityStatus::InQuotation { claimed: 1, total: 3 });
        assert_eq!(status.to_string(), "IN_QUOTATION (1 / 3 items)");
        assert!(!view.contains_item(&RequisitionItemId::from("I2")));
        assert_eq!(view.items.len(), 2);
    }

    #[test]
    fn fully_claimed_requisition_is_excluded() {
        let view = filter_available(&input(
            vec![requisition("R1", RequisitionType::Emergency)],
            vec![item("I1", "R1", 1, 1)],
            ClaimIndex::from_claimed_items([RequisitionItemId::from("I1")]),
        ));

        assert!(view.requisitions.is_empty());
        assert!(view.items.is_empty());
    }

    #[test]
    fn claimed_items_never_appear_even_when_requisition_is_eligible() {
        let claims = ClaimIndex::from_claimed_items([
            RequisitionItemId::from("I1"),
            RequisitionItemId::from("I4"),
        ]);
        let view = filter_available(&input(
            vec![
                requisition("R1", RequisitionType::Replenishment),
                requisition("R2", RequisitionType::Replenishment),
            ],
            vec![
                item("I1", "R1", 1, 1),
                item("I2", "R1", 1, 1),
                item("I3", "R2", 1, 1),
                item("I4", "R2", 1, 1),
            ],
            claims.clone(),
        ));

        for entry in &view.items {
            assert!(!claims.is_claimed(&entry.item.id), "{} leaked", entry.item.id);
        }
        for entry in &view.requisitions {
            assert!(entry.available_items.iter().all(|item| !claims.is_claimed(&item.id)));
        }
    }

    #[test]
    fn ineligible_states_and_blocked_requisitions_are_hidden() {
        let mut cancelled = requisition("R1", RequisitionType::Replenishment);
        cancelled.workflow_state = Some(RequisitionWorkflowState::Cancelled);
        let mut created = requisition("R2", RequisitionType::Replenishment);
        created.status = RequisitionWorkflowState::Created;
        let mut in_quotation = requisition("R3", RequisitionType::Replenishment);
        in_quotation.workflow_state = Some(RequisitionWorkflowState::InQuotation);
        let blocked = requisition("R4", RequisitionType::Replenishment);

        let mut claims = ClaimIndex::default();
        claims.blocked_requisition_ids.insert(RequisitionId::from("R4"));

        let view = filter_available(&input(
            vec![cancelled, created, in_quotation, blocked],
            vec![
                item("I1", "R1", 1, 1),
                item("I2", "R2", 1, 1),
                item("I3", "R3", 1, 1),
                item("I4", "R4", 1, 1),
            ],
            claims,
        ));

        let ids: Vec<_> = view.requisitions.iter().map(|entry| entry.requisition.id.0.as_str()).collect();
        assert_eq!(ids, vec!["R3"]);
        assert_eq!(view.items.len(), 1);
    }

    #[test]
    fn failed_item_lookup_excludes_requisition_with_warning() {
        let mut availability = input(
            vec![
                requisition("R1", RequisitionType::Replenishment),
                requisition("R2", RequisitionType::Replenishment),
            ],
            vec![item("I1", "R1", 1, 1), item("I2", "R2", 1, 1)],
            ClaimIndex::default(),
        );
        availability
            .items_by_requisition
            .insert(RequisitionId::from("R2"), ItemLookup::failed("connection reset"));

        let view = filter_available(&availability);

        assert_eq!(view.requisitions.len(), 1);
        assert_eq!(
            view.warnings,
            vec![AvailabilityWarning::ItemLookupFailed {
                requisition_id: RequisitionId::from("R2"),
                reason: "connection reset".to_owned(),
            }]
        );
    }

    #[test]
    fn anchor_follows_selected_entries_still_visible() {
        let mut availability = input(
            vec![
                requisition("R1", RequisitionType::Emergency),
                requisition("R2", RequisitionType::Replenishment),
            ],
            vec![item("I1", "R1", 1, 1), item("I2", "R2", 1, 1)],
            ClaimIndex::default(),
        );
        availability.selection = availability
            .selection
            .toggle_requisition(&RequisitionId::from("R1"), RequisitionType::Emergency)
            .expect("first selection");

        assert_eq!(filter_available(&availability).anchor_type, Some(RequisitionType::Emergency));

        availability.claims = ClaimIndex::from_claimed_items([RequisitionItemId::from("I1")]);
        assert_eq!(filter_available(&availability).anchor_type, None);
    }

    #[test]
    fn claim_index_only_counts_active_cycles() {
        let cycles = vec![
            cycle("C1", "R1", CycleState::Open),
            cycle("C2", "R2", CycleState::Complete),
            cycle("C3", "R3", CycleState::Draft),
        ];
        let suppliers = vec![supplier("QS1", "C1"), supplier("QS2", "C2"), supplier("QS3", "C3")];
        let offers =
            vec![offer("O1", "QS1", "I1"), offer("O2", "QS2", "I2"), offer("O3", "QS3", "I3")];

        let claims = ClaimIndex::from_cycles(&cycles, &suppliers, &offers);

        assert!(claims.is_claimed(&RequisitionItemId::from("I1")));
        assert!(!claims.is_claimed(&RequisitionItemId::from("I2")));
        assert!(claims.is_claimed(&RequisitionItemId::from("I3")));
        assert!(claims.is_blocked(&RequisitionId::from("R3")));
        assert!(!claims.is_blocked(&RequisitionId::from("R1")));
    }
}
