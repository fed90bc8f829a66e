//! Consolidated cost arithmetic for one quotation cycle.
//!
//! Discounts stack in three layers. Item and supplier discounts are both
//! computed against the winning-items subtotal and summed; the cycle-level
//! general discount comes last, on the net left after the first two layers.
//! No layer clamps: a large absolute discount can drive a contribution
//! negative and the report carries that value as computed.

use rust_decimal::Decimal;

use super::report::{CostReport, ItemLine, ReportWarning, SupplierLine};
use super::{AggregationError, AggregationInput, ReferenceNames, ReportSettings};
use crate::audit::inputs_hash;
use crate::domain::quotation::{QuotationCycle, QuotationItemOffer, QuotationSupplier, SupplierId};
use crate::domain::requisition::MaterialId;
use crate::normalize::{checked_sum, mean, percent_of};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItemCost {
    pub base: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// `None` when the line leaves the `Decimal` range.
pub fn item_cost(offer: &QuotationItemOffer) -> Option<ItemCost> {
    let base = offer.quantity_offered.checked_mul(offer.unit_value)?;
    let discount = percent_of(base, offer.discount_percent)?.checked_add(offer.discount_value)?;
    let total = base.checked_add(offer.freight)?.checked_sub(discount)?;

    Some(ItemCost { base, discount, total })
}

/// Explicitly selected suppliers, else approved/complete ones, else everyone.
pub fn qualifying_suppliers(suppliers: &[QuotationSupplier]) -> Vec<&QuotationSupplier> {
    let selected: Vec<_> = suppliers.iter().filter(|supplier| supplier.selected == Some(true)).collect();
    if !selected.is_empty() {
        return selected;
    }

    let approved: Vec<_> = suppliers
        .iter()
        .filter(|supplier| supplier.status.as_ref().is_some_and(|status| status.is_approved_or_complete()))
        .collect();
    if !approved.is_empty() {
        return approved;
    }

    suppliers.iter().collect()
}

/// Every qualifying supplier lacks both freight and absolute discount.
pub fn is_legacy_cycle(qualifying: &[&QuotationSupplier]) -> bool {
    !qualifying.is_empty() && qualifying.iter().all(|supplier| !supplier.has_detailed_costs())
}

pub fn aggregate_costs(
    input: &AggregationInput,
    settings: &ReportSettings,
) -> Result<CostReport, AggregationError> {
    let cycle = input
        .cycle
        .as_ref()
        .filter(|cycle| cycle.id == input.cycle_id)
        .ok_or_else(|| AggregationError::NotFound { cycle_id: input.cycle_id.clone() })?;

    let mut names = NameResolver::new(&input.names, settings);
    let mut overflows = Vec::new();
    let qualifying = qualifying_suppliers(&input.suppliers);
    let is_legacy = is_legacy_cycle(&qualifying);

    let mut per_item = Vec::new();
    let mut per_supplier = Vec::new();
    for supplier in &qualifying {
        let supplier_name = names.supplier(&supplier.supplier_id);
        let mut winners = Vec::new();

        for offer in input.offers.iter().filter(|offer| offer.quotation_supplier_id == supplier.id) {
            let cost = item_cost(offer).unwrap_or_else(|| {
                overflowed(&mut overflows, format!("offer:{}", offer.id), "total");
                ItemCost::default()
            });
            if offer.is_winner {
                winners.push((offer, cost));
            }
            per_item.push(ItemLine {
                offer_id: offer.id.clone(),
                quotation_supplier_id: supplier.id.clone(),
                supplier_name: supplier_name.clone(),
                requisition_item_id: offer.requisition_item_id.clone(),
                material_id: offer.material_id.clone(),
                material_name: names.material(&offer.material_id),
                quantity_offered: offer.quantity_offered,
                unit_value: offer.unit_value,
                base: cost.base,
                freight: offer.freight,
                discount: cost.discount,
                total: cost.total,
                is_winner: offer.is_winner,
            });
        }

        if winners.is_empty() {
            continue;
        }
        match supplier_line(supplier, supplier_name, &winners, settings) {
            Some(line) => per_supplier.push(line),
            None => overflowed(&mut overflows, format!("supplier:{}", supplier.id), "supplier_total"),
        }
    }

    let lowest_subtotal = per_supplier.iter().map(|line| line.items_subtotal).min();
    if let Some(lowest) = lowest_subtotal.filter(|lowest| *lowest > Decimal::ZERO) {
        for line in &mut per_supplier {
            line.lowest_item_price = line.items_subtotal == lowest;
        }
    }

    let totals = cycle_totals(cycle, &per_supplier).unwrap_or_else(|| {
        overflowed(&mut overflows, format!("cycle:{}", cycle.id), "grand_total");
        CycleTotals::default()
    });

    let bids: Vec<Decimal> = per_supplier.iter().map(|line| line.bid_value).collect();
    let average_bid = mean(&bids).unwrap_or_else(|| {
        overflowed(&mut overflows, format!("cycle:{}", cycle.id), "average_bid");
        Decimal::ZERO
    });
    let savings = if average_bid > Decimal::ZERO {
        average_bid.checked_sub(totals.grand_total).unwrap_or_else(|| {
            overflowed(&mut overflows, format!("cycle:{}", cycle.id), "savings");
            Decimal::ZERO
        })
    } else {
        Decimal::ZERO
    };

    let justification = cycle
        .observations
        .clone()
        .filter(|text| !text.trim().is_empty())
        .or_else(|| {
            qualifying
                .iter()
                .filter_map(|supplier| supplier.observations.clone())
                .find(|text| !text.trim().is_empty())
        });

    let mut warnings = names.into_warnings();
    warnings.extend(overflows);
    warnings.extend(input.normalization_issues.iter().map(|issue| {
        ReportWarning::MalformedNumericField {
            record: issue.record.clone(),
            field: issue.field.clone(),
            raw: issue.raw.clone(),
        }
    }));

    let report = CostReport {
        cycle_id: cycle.id.clone(),
        cycle_number: cycle.number.clone(),
        grand_total: totals.grand_total,
        total_items: totals.total_items,
        total_freight: totals.total_freight,
        total_discount: totals.total_discount,
        general_discount: totals.general_discount,
        savings,
        average_bid,
        is_legacy,
        supplier_count: per_supplier.len(),
        winning_item_count: per_item.iter().filter(|line| line.is_winner).count(),
        justification,
        per_supplier,
        per_item,
        warnings,
    };

    tracing::info!(
        event_name = "consolidation.report.computed",
        cycle_id = %report.cycle_id,
        inputs_hash = %inputs_hash(input),
        grand_total = %report.grand_total,
        total_discount = %report.total_discount,
        savings = %report.savings,
        supplier_count = report.supplier_count,
        is_legacy = report.is_legacy,
        "cost report computed"
    );

    Ok(report)
}

#[derive(Clone, Copy, Debug, Default)]
struct CycleTotals {
    total_items: Decimal,
    total_freight: Decimal,
    general_discount: Decimal,
    total_discount: Decimal,
    grand_total: Decimal,
}

fn cycle_totals(cycle: &QuotationCycle, per_supplier: &[SupplierLine]) -> Option<CycleTotals> {
    let total_items = checked_sum(per_supplier.iter().map(|line| line.items_subtotal))?;
    let total_freight = checked_sum(per_supplier.iter().map(|line| line.supplier_freight_total))?
        .checked_add(cycle.freight_general)?;
    let layered_discounts = per_supplier.iter().try_fold(Decimal::ZERO, |sum, line| {
        sum.checked_add(line.supplier_discount_total)?.checked_add(line.items_discount_total)
    })?;
    let pre_general_net = total_items.checked_add(total_freight)?.checked_sub(layered_discounts)?;
    let general_discount = percent_of(pre_general_net, cycle.discount_percent_general)?
        .checked_add(cycle.discount_value_general)?;
    let total_discount = layered_discounts.checked_add(general_discount)?;
    let grand_total = total_items.checked_add(total_freight)?.checked_sub(total_discount)?;

    Some(CycleTotals { total_items, total_freight, general_discount, total_discount, grand_total })
}

fn supplier_line(
    supplier: &QuotationSupplier,
    supplier_name: String,
    winners: &[(&QuotationItemOffer, ItemCost)],
    settings: &ReportSettings,
) -> Option<SupplierLine> {
    let items_subtotal = checked_sum(winners.iter().map(|(_, cost)| cost.base))?;
    let items_freight = checked_sum(winners.iter().map(|(offer, _)| offer.freight))?;
    let items_discount_total = checked_sum(winners.iter().map(|(_, cost)| cost.discount))?;

    let supplier_discount_pct = percent_of(items_subtotal, supplier.discount_percent)?;
    let supplier_discount_total = supplier_discount_pct.checked_add(supplier.discount_value)?;
    let supplier_freight_total = checked_sum([supplier.freight, supplier.tax, items_freight])?;
    let supplier_total = items_subtotal
        .checked_add(supplier_freight_total)?
        .checked_sub(supplier_discount_total.checked_add(items_discount_total)?)?;
    let bid_value = checked_sum([items_subtotal, supplier.freight, supplier.tax, items_freight])?
        .checked_sub(supplier.discount_value)?;

    // A share too large to represent is still a high freight impact.
    let freight_share_pct = if supplier_total > Decimal::ZERO {
        supplier_freight_total
            .checked_div(supplier_total)
            .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::MAX)
    } else {
        Decimal::ZERO
    };

    Some(SupplierLine {
        quotation_supplier_id: supplier.id.clone(),
        supplier_id: supplier.supplier_id.clone(),
        supplier_name,
        winning_items: winners.len(),
        items_subtotal,
        items_freight,
        items_discount_total,
        supplier_discount_pct,
        supplier_discount_total,
        supplier_freight_total,
        supplier_total,
        bid_value,
        freight_share_pct: freight_share_pct.round_dp(2),
        lowest_item_price: false,
        high_freight_impact: freight_share_pct > settings.high_freight_threshold_pct,
        observations: supplier.observations.clone(),
    })
}

fn overflowed(warnings: &mut Vec<ReportWarning>, record: String, field: &str) {
    tracing::warn!(
        event_name = "consolidation.arithmetic.overflow",
        record = %record,
        field,
        "value out of decimal range; contribution counted as zero"
    );
    warnings.push(ReportWarning::ArithmeticOverflow { record, field: field.to_owned() });
}

struct NameResolver<'a> {
    names: &'a ReferenceNames,
    settings: &'a ReportSettings,
    warnings: Vec<ReportWarning>,
}

impl<'a> NameResolver<'a> {
    fn new(names: &'a ReferenceNames, settings: &'a ReportSettings) -> Self {
        Self { names, settings, warnings: Vec::new() }
    }

    fn material(&mut self, id: &MaterialId) -> String {
        if let Some(name) = self.names.materials.get(id) {
            return name.clone();
        }
        self.miss(ReportWarning::MissingMaterialName { material_id: id.clone() });
        self.settings.material_placeholder.clone()
    }

    fn supplier(&mut self, id: &SupplierId) -> String {
        if let Some(name) = self.names.suppliers.get(id) {
            return name.clone();
        }
        self.miss(ReportWarning::MissingSupplierName { supplier_id: id.clone() });
        self.settings.supplier_placeholder.clone()
    }

    fn miss(&mut self, warning: ReportWarning) {
        if !self.warnings.contains(&warning) {
            tracing::warn!(
                event_name = "consolidation.reference_data.missing",
                warning = ?warning,
                "reference name unresolved; using placeholder"
            );
            self.warnings.push(warning);
        }
    }

    fn into_warnings(self) -> Vec<ReportWarning> {
        self.warnings
    }
}
