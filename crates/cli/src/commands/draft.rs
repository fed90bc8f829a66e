use tender_core::audit::{AuditContext, InMemoryAuditSink};
use tender_core::availability::selection::Selection;
use tender_core::consolidation::draft::QuotationDraft;
use tender_core::consolidation::ReportSettings;
use tender_core::runtime::ConsolidationRuntime;

use crate::commands::{
    block_on, correlation_id, gatherer, load_config, load_dataset, CommandResult, DataSource,
};

const COMMAND: &str = "draft";

#[derive(Debug, Clone, Default)]
pub struct DraftArgs {
    pub source: DataSource,
    pub draft: QuotationDraft,
}

/// Checks a proposed cycle (items plus invited suppliers) against the
/// current availability. A rejected draft exits with the conflict code.
pub fn run(args: &DraftArgs) -> CommandResult {
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
    let view = runtime.available(&context, &gathered.input);
    let validation = runtime.check_draft(&context, &args.draft, &view);

    if validation.valid {
        CommandResult::data(COMMAND, &validation)
    } else {
        CommandResult::rejected(COMMAND, &validation)
    }
}
