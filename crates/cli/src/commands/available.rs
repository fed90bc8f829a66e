use serde::Serialize;
use tender_core::audit::{AuditContext, InMemoryAuditSink};
use tender_core::availability::criteria::RequisitionCriteria;
use tender_core::availability::selection::Selection;
use tender_core::availability::{AvailabilityView, AvailabilityWarning, AvailableItem};
use tender_core::consolidation::ReportSettings;
use tender_core::domain::requisition::{RequisitionId, RequisitionType};
use tender_core::errors::DomainError;
use tender_core::runtime::ConsolidationRuntime;

use crate::commands::{
    block_on, correlation_id, gatherer, load_config, load_dataset, CommandResult, DataSource,
};

const COMMAND: &str = "available";

#[derive(Debug, Clone, Default)]
pub struct AvailableArgs {
    pub source: DataSource,
    pub criteria: RequisitionCriteria,
    /// Requisitions to select, in order. The first one fixes the anchor type.
    pub select: Vec<RequisitionId>,
}

#[derive(Debug, Serialize)]
struct RequisitionRow {
    id: RequisitionId,
    number: String,
    requisition_type: RequisitionType,
    status: String,
    available_items: usize,
    total_items: usize,
}

#[derive(Debug, Serialize)]
struct AvailableOutput {
    requisitions: Vec<RequisitionRow>,
    items: Vec<AvailableItem>,
    anchor_type: Option<RequisitionType>,
    selected: Vec<RequisitionId>,
    warnings: Vec<AvailabilityWarning>,
}

pub fn run(args: &AvailableArgs) -> CommandResult {
    let config = match load_config(COMMAND, &args.source) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let dataset = match load_dataset(COMMAND, args.source.dataset.as_deref()) {
        Ok(dataset) => dataset,
        Err(result) => return result,
    };

    let gatherer = gatherer(&config, dataset);
    let gathered = match block_on(COMMAND, gatherer.availability_input(Selection::default())) {
        Ok(Ok(gathered)) => gathered,
        Ok(Err(error)) => return CommandResult::from_application_error(COMMAND, error),
        Err(result) => return result,
    };

    let runtime = ConsolidationRuntime::deterministic(
        ReportSettings::from(&config.report),
        InMemoryAuditSink::default(),
    );
    let context = AuditContext::new(None, correlation_id(COMMAND), "cli");

    let mut input = gathered.input;
    let mut view = args.criteria.apply(&runtime.available(&context, &input), &gathered.requester_names);

    if !args.select.is_empty() {
        input.selection = match select(&view, &args.select) {
            Ok(selection) => selection,
            Err(error) => return CommandResult::from_application_error(COMMAND, error.into()),
        };
        view = args.criteria.apply(&runtime.available(&context, &input), &gathered.requester_names);
    }

    CommandResult::data(COMMAND, &render(view, &input.selection))
}

fn select(view: &AvailabilityView, ids: &[RequisitionId]) -> Result<Selection, DomainError> {
    ids.iter().try_fold(Selection::default(), |selection, id| {
        let entry = view.requisition(id).ok_or_else(|| {
            DomainError::InvariantViolation(format!("requisition `{id}` is not available"))
        })?;
        selection.toggle_requisition(id, entry.requisition.requisition_type)
    })
}

fn render(view: AvailabilityView, selection: &Selection) -> AvailableOutput {
    AvailableOutput {
        requisitions: view
            .requisitions
            .iter()
            .map(|entry| RequisitionRow {
                id: entry.requisition.id.clone(),
                number: entry.requisition.number.clone(),
                requisition_type: entry.requisition.requisition_type,
                status: entry.status.to_string(),
                available_items: entry.available_items.len(),
                total_items: entry.total_items,
            })
            .collect(),
        items: view.items,
        anchor_type: view.anchor_type,
        selected: selection.requisition_ids().cloned().collect(),
        warnings: view.warnings,
    }
}
