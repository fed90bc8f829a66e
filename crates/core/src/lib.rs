pub mod audit;
pub mod availability;
pub mod config;
pub mod consolidation;
pub mod domain;
pub mod errors;
pub mod normalize;
pub mod runtime;

pub use availability::criteria::RequisitionCriteria;
pub use availability::selection::{check_bulk_types, validate_type_selection, Selection, TypeConflict};
pub use availability::{
    filter_available, AvailabilityFilter, AvailabilityInput, AvailabilityStatus, AvailabilityView,
    AvailabilityWarning, AvailableItem, AvailableRequisition, ClaimIndex,
    DeterministicAvailabilityFilter, ItemLookup,
};
pub use consolidation::draft::{
    validate_draft, DraftValidation, DraftViolation, DraftViolationCode, QuotationDraft,
};
pub use consolidation::{
    aggregate_costs, AggregationError, AggregationInput, CostAggregationEngine, CostReport,
    DeterministicCostAggregationEngine, ItemLine, LegacySummary, ReferenceNames, ReportSettings,
    ReportWarning, SupplierLine,
};
pub use domain::approval::{ApprovalFlowKey, ApprovalFlowSnapshot, ApprovalStep, ApprovalStepStatus};
pub use domain::quotation::{
    CycleId, CycleState, QuotationCycle, QuotationCycleRecord, QuotationItemOffer,
    QuotationItemOfferRecord, QuotationSupplier, QuotationSupplierRecord, SupplierId,
};
pub use domain::requisition::{
    MaterialId, Requisition, RequisitionId, RequisitionItem, RequisitionItemId, RequisitionType,
    RequisitionWorkflowState,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use runtime::ConsolidationRuntime;
