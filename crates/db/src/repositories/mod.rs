use async_trait::async_trait;
use thiserror::Error;

use tender_core::domain::approval::{ApprovalFlowKey, ApprovalFlowSnapshot};
use tender_core::domain::quotation::{
    CycleId, QuotationCycleRecord, QuotationItemOfferRecord, QuotationSupplierId,
    QuotationSupplierRecord, SupplierId,
};
use tender_core::domain::requisition::{MaterialId, Requisition, RequisitionId, RequisitionItem};

pub mod memory;

pub use memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RequisitionRepository: Send + Sync {
    /// Requisitions the hosting application considers open for quotation.
    async fn list_open(&self, limit: u32) -> Result<Vec<Requisition>, RepositoryError>;

    async fn list_items(
        &self,
        requisition_id: &RequisitionId,
    ) -> Result<Vec<RequisitionItem>, RepositoryError>;
}

#[async_trait]
pub trait QuotationRepository: Send + Sync {
    async fn find_cycle(&self, id: &CycleId)
        -> Result<Option<QuotationCycleRecord>, RepositoryError>;

    async fn list_cycles(&self, limit: u32) -> Result<Vec<QuotationCycleRecord>, RepositoryError>;

    async fn list_suppliers(
        &self,
        cycle_id: &CycleId,
    ) -> Result<Vec<QuotationSupplierRecord>, RepositoryError>;

    async fn list_offers(
        &self,
        quotation_supplier_id: &QuotationSupplierId,
    ) -> Result<Vec<QuotationItemOfferRecord>, RepositoryError>;
}

#[async_trait]
pub trait ReferenceDataRepository: Send + Sync {
    async fn material_name(&self, id: &MaterialId) -> Result<Option<String>, RepositoryError>;
    async fn supplier_name(&self, id: &SupplierId) -> Result<Option<String>, RepositoryError>;
    async fn user_name(&self, id: &str) -> Result<Option<String>, RepositoryError>;
}

#[async_trait]
pub trait ApprovalFlowReader: Send + Sync {
    async fn snapshot(
        &self,
        key: &ApprovalFlowKey,
    ) -> Result<Option<ApprovalFlowSnapshot>, RepositoryError>;
}
