use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tender_core::availability::selection::Selection;
use tender_core::availability::{AvailabilityInput, ClaimIndex, ItemLookup};
use tender_core::config::GatheringConfig;
use tender_core::consolidation::{AggregationInput, ReferenceNames};
use tender_core::domain::approval::{ApprovalFlowKey, ApprovalFlowSnapshot};
use tender_core::domain::quotation::{
    CycleId, QuotationCycle, QuotationItemOffer, QuotationItemOfferRecord, QuotationSupplier,
    QuotationSupplierId, QuotationSupplierRecord,
};
use tender_core::errors::ApplicationError;

use crate::repositories::{
    ApprovalFlowReader, InMemoryStore, QuotationRepository, ReferenceDataRepository,
    RepositoryError, RequisitionRepository,
};

/// Availability input plus the requester display names the search
/// criteria match against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatheredAvailability {
    pub input: AvailabilityInput,
    pub requester_names: BTreeMap<String, String>,
}

/// Fans reads out across the repositories and assembles engine inputs.
///
/// Every gathering call runs under one timeout. A failed read of a single
/// record is logged and treated as absent; failing to list requisitions or
/// cycles at all aborts the call.
#[derive(Clone)]
pub struct QuotationGatherer {
    requisitions: Arc<dyn RequisitionRepository>,
    quotations: Arc<dyn QuotationRepository>,
    reference_data: Arc<dyn ReferenceDataRepository>,
    approvals: Arc<dyn ApprovalFlowReader>,
    timeout: Duration,
    page_size: u32,
}

impl QuotationGatherer {
    pub fn new(
        requisitions: Arc<dyn RequisitionRepository>,
        quotations: Arc<dyn QuotationRepository>,
        reference_data: Arc<dyn ReferenceDataRepository>,
        approvals: Arc<dyn ApprovalFlowReader>,
    ) -> Self {
        let defaults = GatheringConfig::default();
        Self {
            requisitions,
            quotations,
            reference_data,
            approvals,
            timeout: Duration::from_millis(defaults.timeout_ms),
            page_size: defaults.max_page_size,
        }
    }

    pub fn from_store(store: Arc<InMemoryStore>) -> Self {
        Self::new(store.clone(), store.clone(), store.clone(), store)
    }

    pub fn with_settings(mut self, config: &GatheringConfig) -> Self {
        self.timeout = Duration::from_millis(config.timeout_ms);
        self.page_size = config.max_page_size;
        self
    }

    pub async fn availability_input(
        &self,
        selection: Selection,
    ) -> Result<GatheredAvailability, ApplicationError> {
        self.bounded("availability", async {
            let requisitions = self
                .requisitions
                .list_open(self.page_size)
                .await
                .map_err(|error| fatal("requisitions", error))?;

            let lookups = join_all(requisitions.iter().map(|requisition| async move {
                let lookup = match self.requisitions.list_items(&requisition.id).await {
                    Ok(items) => ItemLookup::loaded(items),
                    Err(error) => {
                        record_failed("items", requisition.id.as_str(), &error);
                        ItemLookup::failed(error.to_string())
                    }
                };
                (requisition.id.clone(), lookup)
            }))
            .await;

            let claims = self.claim_index().await?;

            let requester_ids: BTreeSet<&str> =
                requisitions.iter().map(|requisition| requisition.requester_id.as_str()).collect();
            let requester_names = join_all(requester_ids.into_iter().map(|id| async move {
                match self.reference_data.user_name(id).await {
                    Ok(name) => name.map(|name| (id.to_owned(), name)),
                    Err(error) => {
                        record_failed("user", id, &error);
                        None
                    }
                }
            }))
            .await
            .into_iter()
            .flatten()
            .collect();

            info!(
                event_name = "gathering.availability.completed",
                requisitions = requisitions.len(),
                claimed_items = claims.claimed_item_ids.len(),
                blocked_requisitions = claims.blocked_requisition_ids.len(),
                "availability inputs gathered"
            );

            Ok(GatheredAvailability {
                input: AvailabilityInput {
                    requisitions,
                    items_by_requisition: lookups.into_iter().collect(),
                    claims,
                    selection,
                },
                requester_names,
            })
        })
        .await
    }

    pub async fn aggregation_input(
        &self,
        cycle_id: &CycleId,
    ) -> Result<AggregationInput, ApplicationError> {
        self.bounded("aggregation", async {
            let record = self
                .quotations
                .find_cycle(cycle_id)
                .await
                .map_err(|error| fatal("cycle", error))?
                .ok_or_else(|| ApplicationError::QuotationNotFound { cycle_id: cycle_id.clone() })?;

            let mut issues = Vec::new();
            let cycle = record.normalize(&mut issues);
            let suppliers: Vec<QuotationSupplier> = self
                .suppliers_of(cycle_id)
                .await
                .iter()
                .map(|supplier| supplier.normalize(&mut issues))
                .collect();
            let offers: Vec<QuotationItemOffer> = self
                .offers_of(suppliers.iter().map(|supplier| &supplier.id))
                .await
                .iter()
                .map(|offer| offer.normalize(&mut issues))
                .collect();

            let names = self.reference_names(&suppliers, &offers).await;

            info!(
                event_name = "gathering.aggregation.completed",
                cycle_id = %cycle_id,
                suppliers = suppliers.len(),
                offers = offers.len(),
                normalization_issues = issues.len(),
                "aggregation inputs gathered"
            );

            Ok(AggregationInput {
                cycle_id: cycle_id.clone(),
                cycle: Some(cycle),
                suppliers,
                offers,
                names,
                normalization_issues: issues,
            })
        })
        .await
    }

    pub async fn approval_snapshot(
        &self,
        key: &ApprovalFlowKey,
    ) -> Result<Option<ApprovalFlowSnapshot>, ApplicationError> {
        self.bounded("approval", async {
            self.approvals.snapshot(key).await.map_err(|error| fatal("approval flow", error))
        })
        .await
    }

    async fn claim_index(&self) -> Result<ClaimIndex, ApplicationError> {
        let records = self
            .quotations
            .list_cycles(self.page_size)
            .await
            .map_err(|error| fatal("cycles", error))?;

        // Only the identifiers and states matter here; numeric issues are
        // reported when the cycle itself is aggregated.
        let mut ignored = Vec::new();
        let cycles: Vec<QuotationCycle> =
            records.iter().map(|record| record.normalize(&mut ignored)).collect();
        let active: Vec<&QuotationCycle> =
            cycles.iter().filter(|cycle| cycle.workflow_state.claims_items()).collect();

        let supplier_lists = join_all(active.iter().map(|cycle| self.suppliers_of(&cycle.id))).await;
        let suppliers: Vec<QuotationSupplier> = supplier_lists
            .iter()
            .flatten()
            .map(|record| record.normalize(&mut ignored))
            .collect();
        let offers: Vec<QuotationItemOffer> = self
            .offers_of(suppliers.iter().map(|supplier| &supplier.id))
            .await
            .iter()
            .map(|record| record.normalize(&mut ignored))
            .collect();

        Ok(ClaimIndex::from_cycles(&cycles, &suppliers, &offers))
    }

    async fn suppliers_of(
        &self,
        cycle_id: &CycleId,
    ) -> Vec<QuotationSupplierRecord> {
        self.quotations.list_suppliers(cycle_id).await.unwrap_or_else(|error| {
            record_failed("suppliers", cycle_id.as_str(), &error);
            Vec::new()
        })
    }

    async fn offers_of<'a>(
        &self,
        supplier_ids: impl Iterator<Item = &'a QuotationSupplierId>,
    ) -> Vec<QuotationItemOfferRecord> {
        join_all(supplier_ids.map(|id| async move {
            self.quotations.list_offers(id).await.unwrap_or_else(|error| {
                record_failed("offers", id.as_str(), &error);
                Vec::new()
            })
        }))
        .await
        .into_iter()
        .flatten()
        .collect()
    }

    async fn reference_names(
        &self,
        suppliers: &[QuotationSupplier],
        offers: &[QuotationItemOffer],
    ) -> ReferenceNames {
        let material_ids: BTreeSet<_> = offers.iter().map(|offer| &offer.material_id).collect();
        let supplier_ids: BTreeSet<_> = suppliers.iter().map(|supplier| &supplier.supplier_id).collect();

        let materials = join_all(material_ids.into_iter().map(|id| async move {
            match self.reference_data.material_name(id).await {
                Ok(name) => name.map(|name| (id.clone(), name)),
                Err(error) => {
                    record_failed("material", id.as_str(), &error);
                    None
                }
            }
        }));
        let supplier_names = join_all(supplier_ids.into_iter().map(|id| async move {
            match self.reference_data.supplier_name(id).await {
                Ok(name) => name.map(|name| (id.clone(), name)),
                Err(error) => {
                    record_failed("supplier", id.as_str(), &error);
                    None
                }
            }
        }));
        let (materials, supplier_names) = futures::join!(materials, supplier_names);

        ReferenceNames {
            materials: materials.into_iter().flatten().collect(),
            suppliers: supplier_names.into_iter().flatten().collect(),
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        work: impl Future<Output = Result<T, ApplicationError>>,
    ) -> Result<T, ApplicationError> {
        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    event_name = "gathering.timed_out",
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "data gathering exceeded its timeout"
                );
                Err(ApplicationError::Gathering(format!(
                    "{operation} reads did not complete within {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

fn record_failed(kind: &'static str, id: &str, error: &RepositoryError) {
    warn!(
        event_name = "gathering.record_failed",
        record_kind = kind,
        record_id = id,
        error = %error,
        "read failed; treating record as absent"
    );
}

fn fatal(what: &str, error: RepositoryError) -> ApplicationError {
    ApplicationError::Gathering(format!("failed to read {what}: {error}"))
}
