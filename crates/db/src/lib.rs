pub mod fixtures;
pub mod gather;
pub mod repositories;

pub use fixtures::{ApprovalFlowEntry, Dataset};
pub use gather::{GatheredAvailability, QuotationGatherer};
pub use repositories::{
    ApprovalFlowReader, InMemoryStore, QuotationRepository, ReferenceDataRepository,
    RepositoryError, RequisitionRepository,
};
