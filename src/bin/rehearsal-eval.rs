use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use colored::Colorize;
use rehearsal::{
    eval::{EvalRunner, EvalScenario},
    logging, EventBus, HttpEventReporter, ProjectConfig, ScenarioRunner,
};

#[derive(Parser)]
#[command(name = "rehearsal-eval")]
#[command(about = "Run file-defined conversation scenarios and check their outcomes")]
struct Args {
    /// Path to a scenario file or a directory of them
    #[arg(short, long)]
    scenarios: PathBuf,

    /// Post run events to the configured events endpoint
    #[arg(long)]
    report_events: bool,

    /// Log every verdict
    #[arg(short, long)]
    verbose: bool,

    /// Print the report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    logging::init_tracing("warn,rehearsal=info");

    let args = Args::parse();
    let project = ProjectConfig::load()?;
    let scenarios = EvalScenario::load(&args.scenarios)?;

    let mut runner = ScenarioRunner::new();
    if let Some(batch_run_id) = &project.batch_run_id {
        runner = runner.with_batch_run_id(batch_run_id.clone());
    }
    if args.report_events {
        let reporter = HttpEventReporter::from_config(&project.events);
        runner = runner.with_events(EventBus::new(Arc::new(reporter)));
    }

    let report = EvalRunner::new()
        .with_runner(runner)
        .with_verbose(args.verbose)
        .run(&scenarios)
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for case in &report.cases {
            let status = if case.pass { "PASS".green().bold() } else { "FAIL".red().bold() };
            println!("{status} {}", case.name);
            for failure in &case.failures {
                println!("    - {}", failure.dimmed());
            }
        }

        let summary = format!("Total: {}, Passed: {}", report.total, report.passed);
        if report.all_passed() {
            println!("{}", summary.green());
        } else {
            println!("{}", summary.red());
        }
    }

    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}
