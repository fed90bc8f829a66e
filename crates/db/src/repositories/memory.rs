use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::RwLock;

use tender_core::domain::approval::{ApprovalFlowKey, ApprovalFlowSnapshot};
use tender_core::domain::quotation::{
    CycleId, QuotationCycleRecord, QuotationItemOfferRecord, QuotationSupplierId,
    QuotationSupplierRecord, SupplierId,
};
use tender_core::domain::requisition::{MaterialId, Requisition, RequisitionId, RequisitionItem};

use super::{
    ApprovalFlowReader, QuotationRepository, ReferenceDataRepository, RepositoryError,
    RequisitionRepository,
};
use crate::fixtures::Dataset;

/// Serves every repository trait from one in-memory dataset. Individual
/// reads can be made to fail, and all reads can be slowed down.
#[derive(Default)]
pub struct InMemoryStore {
    dataset: RwLock<Dataset>,
    failing_reads: RwLock<BTreeSet<String>>,
    latency: Option<Duration>,
}

impl InMemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset: RwLock::new(dataset), ..Self::default() }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the read identified by `key` fail, e.g. `items:R-001`,
    /// `offers:QS-200A`, `material:M-CABLE`.
    pub async fn fail_read(&self, key: impl Into<String>) {
        self.failing_reads.write().await.insert(key.into());
    }

    pub async fn replace(&self, dataset: Dataset) {
        *self.dataset.write().await = dataset;
    }

    async fn read_guard(&self, key: String) -> Result<(), RepositoryError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing_reads.read().await.contains(&key) {
            return Err(RepositoryError::Unavailable(format!("read `{key}` failed")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RequisitionRepository for InMemoryStore {
    async fn list_open(&self, limit: u32) -> Result<Vec<Requisition>, RepositoryError> {
        self.read_guard("requisitions".to_string()).await?;
        let dataset = self.dataset.read().await;
        Ok(dataset.requisitions.iter().take(limit as usize).cloned().collect())
    }

    async fn list_items(
        &self,
        requisition_id: &RequisitionId,
    ) -> Result<Vec<RequisitionItem>, RepositoryError> {
        self.read_guard(format!("items:{requisition_id}")).await?;
        let dataset = self.dataset.read().await;
        Ok(dataset
            .requisition_items
            .iter()
            .filter(|item| &item.requisition_id == requisition_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl QuotationRepository for InMemoryStore {
    async fn find_cycle(
        &self,
        id: &CycleId,
    ) -> Result<Option<QuotationCycleRecord>, RepositoryError> {
        self.read_guard(format!("cycle:{id}")).await?;
        let dataset = self.dataset.read().await;
        Ok(dataset.cycles.iter().find(|cycle| &cycle.id == id).cloned())
    }

    async fn list_cycles(&self, limit: u32) -> Result<Vec<QuotationCycleRecord>, RepositoryError> {
        self.read_guard("cycles".to_string()).await?;
        let dataset = self.dataset.read().await;
        Ok(dataset.cycles.iter().take(limit as usize).cloned().collect())
    }

    async fn list_suppliers(
        &self,
        cycle_id: &CycleId,
    ) -> Result<Vec<QuotationSupplierRecord>, RepositoryError> {
        self.read_guard(format!("suppliers:{cycle_id}")).await?;
        let dataset = self.dataset.read().await;
        Ok(dataset.suppliers.iter().filter(|supplier| &supplier.cycle_id == cycle_id).cloned().collect())
    }

    async fn list_offers(
        &self,
        quotation_supplier_id: &QuotationSupplierId,
    ) -> Result<Vec<QuotationItemOfferRecord>, RepositoryError> {
        self.read_guard(format!("offers:{quotation_supplier_id}")).await?;
        let dataset = self.dataset.read().await;
        Ok(dataset
            .offers
            .iter()
            .filter(|offer| &offer.quotation_supplier_id == quotation_supplier_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl ReferenceDataRepository for InMemoryStore {
    async fn material_name(&self, id: &MaterialId) -> Result<Option<String>, RepositoryError> {
        self.read_guard(format!("material:{id}")).await?;
        Ok(self.dataset.read().await.materials.get(id).cloned())
    }

    async fn supplier_name(&self, id: &SupplierId) -> Result<Option<String>, RepositoryError> {
        self.read_guard(format!("supplier:{id}")).await?;
        Ok(self.dataset.read().await.supplier_names.get(id).cloned())
    }

    async fn user_name(&self, id: &str) -> Result<Option<String>, RepositoryError> {
        self.read_guard(format!("user:{id}")).await?;
        Ok(self.dataset.read().await.users.get(id).cloned())
    }
}

#[async_trait::async_trait]
impl ApprovalFlowReader for InMemoryStore {
    async fn snapshot(
        &self,
        key: &ApprovalFlowKey,
    ) -> Result<Option<ApprovalFlowSnapshot>, RepositoryError> {
        self.read_guard(format!("approval:{}", key.entity_id)).await?;
        let dataset = self.dataset.read().await;
        Ok(dataset
            .approval_flows
            .iter()
            .find(|entry| &entry.key == key)
            .map(|entry| entry.snapshot.clone()))
    }
}
