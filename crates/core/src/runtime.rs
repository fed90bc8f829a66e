use crate::audit::{inputs_hash, AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::availability::{
    AvailabilityFilter, AvailabilityInput, AvailabilityView, DeterministicAvailabilityFilter,
};
use crate::consolidation::draft::{validate_draft, DraftValidation, QuotationDraft};
use crate::consolidation::{
    AggregationError, AggregationInput, CostAggregationEngine, CostReport,
    DeterministicCostAggregationEngine, ReportSettings,
};
use crate::errors::ApplicationError;

/// Runs the availability filter and the cost engine, recording one audit
/// event per computation.
pub struct ConsolidationRuntime<F, E, S> {
    filter: F,
    engine: E,
    audit: S,
}

impl<F, E, S> ConsolidationRuntime<F, E, S> {
    pub fn new(filter: F, engine: E, audit: S) -> Self {
        Self { filter, engine, audit }
    }

    pub fn audit_sink(&self) -> &S {
        &self.audit
    }
}

impl<S> ConsolidationRuntime<DeterministicAvailabilityFilter, DeterministicCostAggregationEngine, S> {
    pub fn deterministic(settings: ReportSettings, audit: S) -> Self {
        Self::new(
            DeterministicAvailabilityFilter,
            DeterministicCostAggregationEngine::new(settings),
            audit,
        )
    }
}

impl<F, E, S> ConsolidationRuntime<F, E, S>
where
    F: AvailabilityFilter,
    E: CostAggregationEngine,
    S: AuditSink,
{
    pub fn available(&self, context: &AuditContext, input: &AvailabilityInput) -> AvailabilityView {
        let view = self.filter.filter(input);

        self.audit.emit(
            AuditEvent::new(
                context,
                "availability.projection_computed",
                AuditCategory::Availability,
                AuditOutcome::Success,
            )
            .with_metadata("inputs_hash", inputs_hash(input))
            .with_metadata("requisitions", view.requisitions.len())
            .with_metadata("items", view.items.len())
            .with_metadata("warnings", view.warnings.len()),
        );

        view
    }

    pub fn check_draft(
        &self,
        context: &AuditContext,
        draft: &QuotationDraft,
        view: &AvailabilityView,
    ) -> DraftValidation {
        let validation = validate_draft(draft, view);
        let outcome = if validation.valid { AuditOutcome::Success } else { AuditOutcome::Rejected };
        let codes = validation
            .violations
            .iter()
            .map(|violation| format!("{:?}", violation.code))
            .collect::<Vec<_>>()
            .join(",");

        self.audit.emit(
            AuditEvent::new(context, "selection.draft_checked", AuditCategory::Selection, outcome)
                .with_metadata("items", draft.item_ids.len())
                .with_metadata("suppliers", draft.supplier_ids.len())
                .with_metadata("violations", codes),
        );

        validation
    }

    pub fn report(
        &self,
        context: &AuditContext,
        input: &AggregationInput,
    ) -> Result<CostReport, ApplicationError> {
        let hash = inputs_hash(input);

        match self.engine.aggregate(input) {
            Ok(report) => {
                self.audit.emit(
                    AuditEvent::new(
                        context,
                        "consolidation.report_computed",
                        AuditCategory::Consolidation,
                        AuditOutcome::Success,
                    )
                    .with_metadata("inputs_hash", hash)
                    .with_metadata("grand_total", report.grand_total)
                    .with_metadata("total_discount", report.total_discount)
                    .with_metadata("savings", report.savings)
                    .with_metadata("supplier_count", report.supplier_count)
                    .with_metadata("is_legacy", report.is_legacy),
                );
                Ok(report)
            }
            Err(error @ AggregationError::NotFound { .. }) => {
                self.audit.emit(
                    AuditEvent::new(
                        context,
                        "consolidation.cycle_not_found",
                        AuditCategory::Consolidation,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("inputs_hash", hash)
                    .with_metadata("cycle_id", &input.cycle_id),
                );
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::ConsolidationRuntime;
    use crate::audit::{AuditCategory, AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::availability::fixtures::{input, item, requisition};
    use crate::availability::ClaimIndex;
    use crate::consolidation::draft::QuotationDraft;
    use crate::consolidation::{AggregationInput, ReferenceNames, ReportSettings};
    use crate::domain::quotation::{
        CycleId, CycleState, OfferId, QuotationCycle, QuotationItemOffer, QuotationSupplier,
        QuotationSupplierId, SupplierId,
    };
    use crate::domain::requisition::{MaterialId, RequisitionId, RequisitionItemId, RequisitionType};
    use crate::errors::ApplicationError;

    fn context() -> AuditContext {
        AuditContext::new(Some(CycleId::from("C-1")), "req-1", "test")
    }

    fn aggregation_input(with_cycle: bool) -> AggregationInput {
        let cycle = QuotationCycle {
            id: CycleId::from("C-1"),
            requisition_id: RequisitionId::from("R1"),
            number: "COT-1".to_owned(),
            observations: None,
            workflow_state: CycleState::PendingApproval,
            created_by: None,
            freight_general: Decimal::ZERO,
            discount_percent_general: Decimal::ZERO,
            discount_value_general: Decimal::ZERO,
        };
        let supplier = QuotationSupplier {
            id: QuotationSupplierId::from("QS-A"),
            cycle_id: CycleId::from("C-1"),
            supplier_id: SupplierId::from("S-A"),
            freight: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            discount_value: Decimal::ZERO,
            status: None,
            selected: Some(true),
            observations: None,
            freight_recorded: true,
            discount_value_recorded: false,
        };
        let offer = QuotationItemOffer {
            id: OfferId::from("O-1"),
            quotation_supplier_id: QuotationSupplierId::from("QS-A"),
            requisition_item_id: RequisitionItemId::from("I1"),
            material_id: MaterialId::from("M-I1"),
            quantity_offered: Decimal::from(10),
            unit_value: Decimal::new(45, 1),
            freight: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            discount_value: Decimal::ZERO,
            is_winner: true,
        };

        AggregationInput {
            cycle_id: CycleId::from("C-1"),
            cycle: with_cycle.then_some(cycle),
            suppliers: vec![supplier],
            offers: vec![offer],
            names: ReferenceNames::default(),
            normalization_issues: Vec::new(),
        }
    }

    #[test]
    fn report_emits_consolidation_audit_event() {
        let runtime =
            ConsolidationRuntime::deterministic(ReportSettings::default(), InMemoryAuditSink::default());

        let report = runtime.report(&context(), &aggregation_input(true)).expect("report");
        assert_eq!(report.grand_total, Decimal::from(45));

        let events = runtime.audit_sink().events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, AuditCategory::Consolidation);
        assert_eq!(events[0].outcome, AuditOutcome::Success);
        assert_eq!(
            events[0].metadata.get("grand_total").and_then(|value| value.parse::<Decimal>().ok()),
            Some(Decimal::from(45))
        );
        assert_eq!(events[0].metadata.get("inputs_hash").map(String::len), Some(64));
    }

    #[test]
    fn missing_cycle_is_audited_and_surfaced_as_not_found() {
        let runtime =
            ConsolidationRuntime::deterministic(ReportSettings::default(), InMemoryAuditSink::default());

        let error = runtime.report(&context(), &aggregation_input(false)).expect_err("not found");
        assert_eq!(error, ApplicationError::QuotationNotFound { cycle_id: CycleId::from("C-1") });

        let events = runtime.audit_sink().events();
        assert_eq!(events[0].outcome, AuditOutcome::Failed);
    }

    #[test]
    fn availability_and_draft_checks_are_audited() {
        let runtime =
            ConsolidationRuntime::deterministic(ReportSettings::default(), InMemoryAuditSink::default());
        let view = runtime.available(
            &context(),
            &input(
                vec![requisition("R1", RequisitionType::Replenishment)],
                vec![item("I1", "R1", 10, 5), item("I2", "R1", 1, 100)],
                ClaimIndex::default(),
            ),
        );
        assert_eq!(view.items.len(), 2);

        let validation = runtime.check_draft(
            &context(),
            &QuotationDraft {
                item_ids: vec![RequisitionItemId::from("I1")],
                supplier_ids: vec![SupplierId::from("S-A")],
            },
            &view,
        );
        assert!(!validation.valid);

        let events = runtime.audit_sink().events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].category, AuditCategory::Availability);
        assert_eq!(events[0].metadata.get("items").map(String::as_str), Some("2"));
        assert_eq!(events[1].category, AuditCategory::Selection);
        assert_eq!(events[1].outcome, AuditOutcome::Rejected);
        assert_eq!(events[1].metadata.get("violations").map(String::as_str), Some("MinSuppliers"));
    }
}
