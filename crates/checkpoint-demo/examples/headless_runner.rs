//! Headless runner: loads every scenario, runs it twice, prints the session
//! summary and verifies determinism.
//!
//! Run with: `cargo run --package checkpoint-demo --example headless_runner`
//! Set `RUST_LOG=debug` to see engine events.

use std::path::Path;
use std::process::ExitCode;

use checkpoint_core::fixed::fixed64_to_f64;
use checkpoint_demo::{RunReport, ScenarioRunner};
use checkpoint_stats::Stage;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn run_once(runner: &mut ScenarioRunner, id: &str) -> Result<RunReport, checkpoint_demo::DemoError> {
    runner.load_scenario(id)?;
    runner.run_to_end()
}

fn print_report(report: &RunReport) {
    let summary = &report.summary;
    println!(
        "    {} ticks ({:.1} s simulated), game over: {}",
        report.ticks_run,
        summary.elapsed as f64 / 1000.0,
        report.game_over
    );
    println!(
        "    spawned {}, processed {}, with bags {}",
        summary.total_spawned, summary.passengers_processed, summary.passengers_with_bags
    );
    match summary.detection_ratio() {
        Some(ratio) => println!(
            "    suspicious items investigated: {:.0} %",
            fixed64_to_f64(ratio) * 100.0
        ),
        None => println!("    suspicious items investigated: n/a"),
    }
    if let Some(avg) = summary.average_time_in_system {
        println!("    average time in system: {:.1} s", avg as f64 / 1000.0);
    }
    for stage in Stage::ALL {
        if let Some(avg) = summary.stages.average(stage) {
            println!("      {:<20} {:>6.1} s", stage.label(), avg as f64 / 1000.0);
        }
    }
    println!(
        "    recent throughput: {:.1} passengers/min",
        fixed64_to_f64(report.clearances_per_minute)
    );
}

fn main() -> ExitCode {
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let scenarios_dir = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios"));
    let mut runner = match ScenarioRunner::new(scenarios_dir) {
        Ok(runner) => runner,
        Err(err) => {
            error!(%err, "failed to load manifest");
            return ExitCode::FAILURE;
        }
    };

    println!("=== {} ===\n{}\n", runner.title(), runner.description());

    let entries: Vec<(String, String, String)> = runner
        .scenarios()
        .iter()
        .map(|e| (e.id.clone(), e.title.clone(), e.summary.clone()))
        .collect();

    for (id, title, summary) in &entries {
        println!("--- {title} ---");
        println!("    {summary}");

        let first = match run_once(&mut runner, id) {
            Ok(report) => report,
            Err(err) => {
                error!(scenario = %id, %err, "scenario failed");
                return ExitCode::FAILURE;
            }
        };
        print_report(&first);

        // Run 2: determinism check
        let second = match run_once(&mut runner, id) {
            Ok(report) => report,
            Err(err) => {
                error!(scenario = %id, %err, "scenario failed on second run");
                return ExitCode::FAILURE;
            }
        };
        if first.state_hash == second.state_hash {
            println!("    Determinism: PASS (hash {:#018x})", first.state_hash);
        } else {
            println!(
                "    Determinism: FAIL! {:#018x} != {:#018x}",
                first.state_hash, second.state_hash
            );
            return ExitCode::FAILURE;
        }
        println!();
    }

    info!(scenarios = entries.len(), "all scenarios passed");
    ExitCode::SUCCESS
}
