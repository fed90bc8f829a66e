pub mod costs;
pub mod draft;
pub mod report;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ReportConfig;
use crate::domain::quotation::{CycleId, QuotationCycle, QuotationItemOffer, QuotationSupplier, SupplierId};
use crate::domain::requisition::MaterialId;
use crate::normalize::NormalizationIssue;

pub use self::costs::aggregate_costs;
pub use self::report::{CostReport, ItemLine, LegacySummary, ReportWarning, SupplierLine};

/// Display names resolved by the caller. Misses degrade to placeholders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceNames {
    pub materials: BTreeMap<MaterialId, String>,
    pub suppliers: BTreeMap<SupplierId, String>,
}

/// Normalized records for one cycle. `cycle` is `None` when the lookup
/// found nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationInput {
    pub cycle_id: CycleId,
    pub cycle: Option<QuotationCycle>,
    pub suppliers: Vec<QuotationSupplier>,
    pub offers: Vec<QuotationItemOffer>,
    #[serde(default)]
    pub names: ReferenceNames,
    #[serde(default)]
    pub normalization_issues: Vec<NormalizationIssue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSettings {
    pub high_freight_threshold_pct: Decimal,
    pub material_placeholder: String,
    pub supplier_placeholder: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for ReportSettings {
    fn from(config: &ReportConfig) -> Self {
        Self {
            high_freight_threshold_pct: Decimal::from(config.high_freight_threshold_pct),
            material_placeholder: config.material_placeholder.clone(),
            supplier_placeholder: config.supplier_placeholder.clone(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("quotation cycle `{cycle_id}` not found")]
    NotFound { cycle_id: CycleId },
}

pub trait CostAggregationEngine: Send + Sync {
    fn aggregate(&self, input: &AggregationInput) -> Result<CostReport, AggregationError>;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicCostAggregationEngine {
    settings: ReportSettings,
}

impl DeterministicCostAggregationEngine {
    pub fn new(settings: ReportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }
}

impl CostAggregationEngine for DeterministicCostAggregationEngine {
    fn aggregate(&self, input: &AggregationInput) -> Result<CostReport, AggregationError> {
        aggregate_costs(input, &self.settings)
    }
}
