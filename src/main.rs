//! `firsttry` CLI entry point.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use firsttry::cli::{Cli, Commands};
use firsttry::domain::models::{OverallStatus, RequiredPassBar};
use firsttry::infrastructure::{ConfigLoader, LoggerImpl};
use firsttry::{run, RunOpts};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let app_config = ConfigLoader::load(&cli.repo_root).context("failed to load configuration")?;
    let _logger = LoggerImpl::init(&app_config.logging).context("failed to initialize logging")?;

    match cli.command {
        Commands::Run {
            changed,
            no_fast_path,
            verify_only,
            partial_ok,
        } => {
            let mut engine_config = app_config.engine;
            if partial_ok {
                engine_config.required_pass_bar = RequiredPassBar::PartialOk;
            }
            let opts = RunOpts {
                changed_only_ids: changed,
                no_fast_path,
                verify_only,
            };

            let report = run(&engine_config, &opts).await;
            match report {
                Ok(report) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    } else {
                        print_summary(&report);
                    }
                    Ok(match report.overall_status {
                        OverallStatus::Pass => ExitCode::from(0),
                        OverallStatus::Partial => ExitCode::from(0),
                        OverallStatus::Fail => ExitCode::from(1),
                    })
                }
                Err(err) => {
                    error!(%err, "run failed before any task executed");
                    eprintln!("firsttry: {err}");
                    Ok(ExitCode::from(2))
                }
            }
        }
        Commands::ClearCache { task } => {
            clear_cache(&app_config.engine.state_dir, task.as_deref())?;
            Ok(ExitCode::from(0))
        }
    }
}

fn print_summary(report: &firsttry::RunReport) {
    if report.verified_from_cache {
        info!("nothing changed since the last green run");
    }
    for result in &report.tasks {
        let verdict = if result.passed { "PASS" } else { "FAIL" };
        println!(
            "{verdict:>4}  {}  ({:?}, {}ms)",
            result.task_id, result.cache_state, result.duration_ms
        );
    }
    println!("---");
    println!("overall: {:?}", report.overall_status);
}

fn clear_cache(state_dir: &std::path::Path, task: Option<&str>) -> Result<()> {
    let target = match task {
        Some(task_id) => state_dir.join("cache").join("tasks").join(task_id),
        None => state_dir.join("cache"),
    };
    if target.exists() {
        std::fs::remove_dir_all(&target)
            .with_context(|| format!("failed to remove {}", target.display()))?;
    }
    if task.is_none() {
        let green = state_dir.join("last_green_run.json");
        if green.exists() {
            std::fs::remove_file(&green).context("failed to remove last_green_run.json")?;
        }
    }
    Ok(())
}
