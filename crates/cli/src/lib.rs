pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tender_core::availability::criteria::RequisitionCriteria;
use tender_core::config::{AppConfig, ConfigOverrides, LogFormat};
use tender_core::consolidation::draft::QuotationDraft;
use tender_core::domain::quotation::{CycleId, SupplierId};
use tender_core::domain::requisition::{RequisitionId, RequisitionItemId, RequisitionType};

use commands::available::AvailableArgs;
use commands::draft::DraftArgs;
use commands::report::ReportArgs;
use commands::{CommandResult, DataSource};

#[derive(Debug, Parser)]
#[command(
    name = "tender",
    about = "Tender purchasing-quotation CLI",
    long_about = "Inspect requisitions available for quotation, check cycle drafts, and compute consolidated cost reports.",
    after_help = "Examples:\n  tender available --type replenishment\n  tender draft --item RI-001 --supplier S-ALFA --supplier S-BETA\n  tender report --cycle C-200 --company CO-01\n  tender smoke"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Config file to load instead of tender.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Dataset export (JSON) to read instead of the bundled seed")]
    dataset: Option<PathBuf>,
    #[arg(long, global = true, help = "Timeout for the data-gathering reads, in milliseconds")]
    gathering_timeout_ms: Option<u64>,
    #[arg(long, global = true, help = "Freight share (percent) above which a supplier is flagged")]
    high_freight_threshold: Option<u32>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List requisitions and items that can still be quoted")]
    Available {
        #[arg(long = "type", value_enum)]
        requisition_type: Option<TypeArg>,
        #[arg(long, help = "Match on requisition number or requester name")]
        search: Option<String>,
        #[arg(long)]
        cost_center: Option<String>,
        #[arg(long, requires = "cost_center")]
        project: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, help = "Only emergency or high-priority requisitions")]
        emergency_only: bool,
        #[arg(long = "select", help = "Select a requisition (repeatable)")]
        select: Vec<String>,
    },
    #[command(about = "Validate the items and suppliers of a new quotation cycle")]
    Draft {
        #[arg(long = "item", required = true)]
        items: Vec<String>,
        #[arg(long = "supplier")]
        suppliers: Vec<String>,
    },
    #[command(about = "Compute the consolidated cost report of a quotation cycle")]
    Report {
        #[arg(long)]
        cycle: String,
        #[arg(long, help = "Attach the approval progress for this company")]
        company: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Run the bundled seed end to end with per-check timing details")]
    Smoke,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TypeArg {
    Replenishment,
    DirectPurchase,
    Emergency,
}

impl From<TypeArg> for RequisitionType {
    fn from(value: TypeArg) -> Self {
        match value {
            TypeArg::Replenishment => Self::Replenishment,
            TypeArg::DirectPurchase => Self::DirectPurchase,
            TypeArg::Emergency => Self::Emergency,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormatArg {
    Compact,
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

impl GlobalArgs {
    fn into_source(self) -> DataSource {
        DataSource {
            config_path: self.config,
            overrides: ConfigOverrides {
                gathering_timeout_ms: self.gathering_timeout_ms,
                high_freight_threshold_pct: self.high_freight_threshold,
                log_level: self.log_level,
                log_format: self.log_format.map(LogFormat::from),
            },
            dataset: self.dataset,
        }
    }
}

/// Logs go to stderr so stdout carries only the JSON payload.
fn init_logging(config: &AppConfig) {
    use tender_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let source = cli.global.into_source();

    if let Ok(config) = AppConfig::load(source.load_options()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Available {
            requisition_type,
            search,
            cost_center,
            project,
            from,
            to,
            emergency_only,
            select,
        } => commands::available::run(&AvailableArgs {
            source,
            criteria: RequisitionCriteria {
                search,
                requisition_type: requisition_type.map(RequisitionType::from),
                cost_center_id: cost_center,
                project_id: project,
                requested_from: from,
                requested_to: to,
                emergency_only,
            },
            select: select.iter().map(|id| RequisitionId::from(id.as_str())).collect(),
        }),
        Command::Draft { items, suppliers } => commands::draft::run(&DraftArgs {
            source,
            draft: QuotationDraft {
                item_ids: items.iter().map(|id| RequisitionItemId::from(id.as_str())).collect(),
                supplier_ids: suppliers.iter().map(|id| SupplierId::from(id.as_str())).collect(),
            },
        }),
        Command::Report { cycle, company } => commands::report::run(&ReportArgs {
            source,
            cycle_id: CycleId::from(cycle.as_str()),
            company_id: company,
        }),
        Command::Config => CommandResult { exit_code: 0, output: commands::config::run(&source) },
        Command::Smoke => commands::smoke::run(&source),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn report_accepts_global_flags_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "tender",
            "report",
            "--cycle",
            "C-200",
            "--high-freight-threshold",
            "35",
        ])
        .expect("valid arguments");

        assert!(matches!(cli.command, Command::Report { ref cycle, .. } if cycle == "C-200"));
        assert_eq!(cli.global.high_freight_threshold, Some(35));
    }

    #[test]
    fn project_filter_requires_a_cost_center() {
        let error = Cli::try_parse_from(["tender", "available", "--project", "P-PLANT"]);
        assert!(error.is_err());

        let cli = Cli::try_parse_from([
            "tender",
            "available",
            "--cost-center",
            "CC-OPS",
            "--project",
            "P-PLANT",
            "--type",
            "direct-purchase",
        ])
        .expect("valid arguments");
        assert!(matches!(cli.command, Command::Available { requisition_type: Some(_), .. }));
    }
}
