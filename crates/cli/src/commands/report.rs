use rust_decimal::Decimal;
use serde::Serialize;
use tender_core::audit::{AuditContext, InMemoryAuditSink};
use tender_core::consolidation::{CostReport, LegacySummary, ReportSettings};
use tender_core::domain::approval::{ApprovalFlowKey, ApprovalFlowSnapshot};
use tender_core::domain::quotation::CycleId;
use tender_core::errors::ApplicationError;
use tender_core::runtime::ConsolidationRuntime;

use crate::commands::{
    block_on, correlation_id, gatherer, load_config, load_dataset, CommandResult, DataSource,
};

const COMMAND: &str = "report";

#[derive(Debug, Clone)]
pub struct ReportArgs {
    pub source: DataSource,
    pub cycle_id: CycleId,
    /// Company whose approval flow should be attached to the report.
    pub company_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
enum ReportView {
    Detailed {
        report: CostReport,
        #[serde(with = "rust_decimal::serde::float")]
        savings_display: Decimal,
    },
    Legacy { summary: LegacySummary },
}

#[derive(Debug, Serialize)]
struct ApprovalProgress {
    rule: String,
    total_levels: u32,
    current_level: Option<u32>,
    pending_approver: Option<String>,
    completed: bool,
    rejected: bool,
}

impl From<&ApprovalFlowSnapshot> for ApprovalProgress {
    fn from(snapshot: &ApprovalFlowSnapshot) -> Self {
        Self {
            rule: snapshot.rule.clone(),
            total_levels: snapshot.total_levels,
            current_level: snapshot.current_level(),
            pending_approver: snapshot.pending_step().map(|step| step.approver_name.clone()),
            completed: snapshot.completed,
            rejected: snapshot.is_rejected(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportOutput {
    #[serde(flatten)]
    view: ReportView,
    approval: Option<ApprovalProgress>,
}

pub fn run(args: &ReportArgs) -> CommandResult {
    let config = match load_config(COMMAND, &args.source) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let dataset = match load_dataset(COMMAND, args.source.dataset.as_deref()) {
        Ok(dataset) => dataset,
        Err(result) => return result,
    };

    let gatherer = gatherer(&config, dataset);
    let gathered = block_on(COMMAND, async {
        let input = gatherer.aggregation_input(&args.cycle_id).await?;
        let approval = match &args.company_id {
            Some(company_id) => {
                let key = ApprovalFlowKey::quotation(args.cycle_id.as_str(), company_id.as_str());
                gatherer.approval_snapshot(&key).await?
            }
            None => None,
        };
        Ok::<_, ApplicationError>((input, approval))
    });
    let (input, approval) = match gathered {
        Ok(Ok(gathered)) => gathered,
        Ok(Err(error)) => return CommandResult::from_application_error(COMMAND, error),
        Err(result) => return result,
    };

    let runtime = ConsolidationRuntime::deterministic(
        ReportSettings::from(&config.report),
        InMemoryAuditSink::default(),
    );
    let context = AuditContext::new(Some(args.cycle_id.clone()), correlation_id(COMMAND), "cli");
    let report = match runtime.report(&context, &input) {
        Ok(report) => report,
        Err(error) => return CommandResult::from_application_error(COMMAND, error),
    };

    let view = match report.legacy_summary() {
        Some(summary) => ReportView::Legacy { summary },
        None => ReportView::Detailed { savings_display: report.savings_for_display(), report },
    };

    CommandResult::data(
        COMMAND,
        &ReportOutput { view, approval: approval.as_ref().map(ApprovalProgress::from) },
    )
}
