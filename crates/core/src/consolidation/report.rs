//! Report output types. Monetary fields serialize as JSON numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quotation::{CycleId, OfferId, QuotationSupplierId, SupplierId};
use crate::domain::requisition::{MaterialId, RequisitionItemId};

/// One offered line, winning or not. Only winners feed the totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLine {
    pub offer_id: OfferId,
    pub quotation_supplier_id: QuotationSupplierId,
    pub supplier_name: String,
    pub requisition_item_id: RequisitionItemId,
    pub material_id: MaterialId,
    pub material_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity_offered: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_value: Decimal,
    /// `quantity_offered * unit_value`.
    #[serde(with = "rust_decimal::serde::float")]
    pub base: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub freight: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub is_winner: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierLine {
    pub quotation_supplier_id: QuotationSupplierId,
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub winning_items: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub items_subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub items_freight: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub items_discount_total: Decimal,
    /// Percentage component of the supplier-level discount, as an amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub supplier_discount_pct: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub supplier_discount_total: Decimal,
    /// Supplier freight plus tax plus the freight of its winning items.
    #[serde(with = "rust_decimal::serde::float")]
    pub supplier_freight_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub supplier_total: Decimal,
    /// Value used for the market average; only the absolute discount applies.
    #[serde(with = "rust_decimal::serde::float")]
    pub bid_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub freight_share_pct: Decimal,
    pub lowest_item_price: bool,
    pub high_freight_impact: bool,
    pub observations: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportWarning {
    MissingMaterialName { material_id: MaterialId },
    MissingSupplierName { supplier_id: SupplierId },
    MalformedNumericField { record: String, field: String, raw: String },
    /// The value left the `Decimal` range; the record contributes zero.
    ArithmeticOverflow { record: String, field: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostReport {
    pub cycle_id: CycleId,
    pub cycle_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub grand_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_items: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_freight: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_discount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub general_discount: Decimal,
    /// `average_bid - grand_total`, or zero when no positive average exists.
    /// May be negative; see [`CostReport::savings_for_display`].
    #[serde(with = "rust_decimal::serde::float")]
    pub savings: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_bid: Decimal,
    /// The cycle predates freight/discount capture; render [`LegacySummary`].
    pub is_legacy: bool,
    pub supplier_count: usize,
    pub winning_item_count: usize,
    pub justification: Option<String>,
    pub per_supplier: Vec<SupplierLine>,
    pub per_item: Vec<ItemLine>,
    pub warnings: Vec<ReportWarning>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySummary {
    pub cycle_id: CycleId,
    #[serde(with = "rust_decimal::serde::float")]
    pub grand_total: Decimal,
    pub supplier_count: usize,
}

impl CostReport {
    pub fn savings_for_display(&self) -> Decimal {
        self.savings.max(Decimal::ZERO)
    }

    pub fn legacy_summary(&self) -> Option<LegacySummary> {
        self.is_legacy.then(|| LegacySummary {
            cycle_id: self.cycle_id.clone(),
            grand_total: self.grand_total,
            supplier_count: self.supplier_count,
        })
    }

    pub fn winning_items(&self) -> impl Iterator<Item = &ItemLine> {
        self.per_item.iter().filter(|line| line.is_winner)
    }
}
