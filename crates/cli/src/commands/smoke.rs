use std::time::Instant;

use serde::Serialize;
use tender_core::audit::{AuditContext, InMemoryAuditSink};
use tender_core::availability::selection::Selection;
use tender_core::config::AppConfig;
use tender_core::consolidation::ReportSettings;
use tender_core::runtime::ConsolidationRuntime;
use tender_db::Dataset;

use crate::commands::{correlation_id, gatherer, CommandResult, DataSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

/// Runs the bundled seed through gathering, availability and every cycle
/// report.
pub fn run(data_source: &DataSource) -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(data_source.load_options())) {
        Ok((elapsed_ms, config)) => {
            checks.push(pass("config_validation", elapsed_ms, "configuration loaded and validated"));
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(fail("config_validation", elapsed_ms, error.to_string()));
            checks.push(skipped("seed_decode"));
            checks.push(skipped("availability_projection"));
            checks.push(skipped("cost_reports"));
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let dataset = match timed_check(Dataset::seed) {
        Ok((elapsed_ms, dataset)) => {
            checks.push(pass(
                "seed_decode",
                elapsed_ms,
                format!(
                    "{} requisitions, {} cycles, {} offers",
                    dataset.requisitions.len(),
                    dataset.cycles.len(),
                    dataset.offers.len()
                ),
            ));
            dataset
        }
        Err((elapsed_ms, error)) => {
            checks.push(fail("seed_decode", elapsed_ms, error.to_string()));
            checks.push(skipped("availability_projection"));
            checks.push(skipped("cost_reports"));
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(fail(
                "availability_projection",
                0,
                format!("failed to initialize async runtime: {error}"),
            ));
            checks.push(skipped("cost_reports"));
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let cycle_ids: Vec<_> = dataset.cycles.iter().map(|cycle| cycle.id.clone()).collect();
    let gatherer = gatherer(&config, dataset);
    let consolidation = ConsolidationRuntime::deterministic(
        ReportSettings::from(&config.report),
        InMemoryAuditSink::default(),
    );
    let context = AuditContext::new(None, correlation_id("smoke"), "cli");

    let availability_started = Instant::now();
    match runtime.block_on(gatherer.availability_input(Selection::default())) {
        Ok(gathered) => {
            let view = consolidation.available(&context, &gathered.input);
            let status = if view.items.is_empty() { SmokeStatus::Fail } else { SmokeStatus::Pass };
            checks.push(SmokeCheck {
                name: "availability_projection",
                status,
                elapsed_ms: elapsed_since(availability_started),
                message: format!(
                    "{} requisitions and {} items available for quotation",
                    view.requisitions.len(),
                    view.items.len()
                ),
            });
        }
        Err(error) => checks.push(fail(
            "availability_projection",
            elapsed_since(availability_started),
            error.to_string(),
        )),
    }

    let reports_started = Instant::now();
    let mut failures = Vec::new();
    for cycle_id in &cycle_ids {
        let context = AuditContext::new(Some(cycle_id.clone()), correlation_id("smoke"), "cli");
        let outcome = runtime
            .block_on(gatherer.aggregation_input(cycle_id))
            .and_then(|input| consolidation.report(&context, &input));
        if let Err(error) = outcome {
            failures.push(format!("{cycle_id}: {error}"));
        }
    }
    checks.push(if failures.is_empty() {
        pass(
            "cost_reports",
            elapsed_since(reports_started),
            format!("{} cycle reports computed", cycle_ids.len()),
        )
    } else {
        fail("cost_reports", elapsed_since(reports_started), failures.join("; "))
    });

    finalize_report(checks, elapsed_since(started))
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((elapsed_since(started), value)),
        Err(error) => Err((elapsed_since(started), error)),
    }
}

fn elapsed_since(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn pass(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message: message.into() }
}

fn fail(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Fail, elapsed_ms, message: message.into() }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
