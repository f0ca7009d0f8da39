//! Full-graph execution, scheduling, and run history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use tgmed_core::AppConfig;
use tgmed_pipeline::{build_scheduler, run_pipeline};

#[derive(Debug, Subcommand)]
pub(crate) enum PipelineCommands {
    /// Run the full pipeline once, now
    Run {
        /// Skip the external transform and validate commands
        #[arg(long)]
        skip_externals: bool,
    },
    /// Keep running the pipeline on the configured cron schedule until interrupted
    Schedule,
    /// List recent pipeline runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show one run with its per-stage results
    Show {
        /// Internal run id (first column of `pipeline runs`)
        id: i64,
    },
}

pub(crate) async fn run(config: &AppConfig, command: PipelineCommands) -> anyhow::Result<()> {
    match command {
        PipelineCommands::Run { skip_externals } => run_once(config, skip_externals).await,
        PipelineCommands::Schedule => run_schedule(config).await,
        PipelineCommands::Runs { limit } => run_list(config, limit).await,
        PipelineCommands::Show { id } => run_show(config, id).await,
    }
}

async fn run_once(config: &AppConfig, skip_externals: bool) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;

    let report = run_pipeline(&pool, config, "cli", skip_externals).await?;
    print!("{}", report.render());

    if !report.succeeded() {
        anyhow::bail!(
            "pipeline run failed: {}",
            report.unsuccessful_stages().join(", ")
        );
    }
    Ok(())
}

async fn run_schedule(config: &AppConfig) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    tgmed_db::run_migrations(&pool).await?;

    let config = Arc::new(config.clone());
    let _scheduler = build_scheduler(pool, Arc::clone(&config)).await?;
    println!(
        "pipeline scheduled with cron '{}' at UTC offset {:+} hours; waiting (Ctrl-C to stop)",
        config.pipeline_cron, config.pipeline_utc_offset_hours
    );

    shutdown_signal().await;
    tracing::info!("received shutdown signal, stopping scheduler");
    Ok(())
}

/// Show recent runs, newest first.
async fn run_list(config: &AppConfig, limit: i64) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    let runs = tgmed_db::list_pipeline_runs(&pool, limit).await?;

    if runs.is_empty() {
        println!("no pipeline runs recorded; run `pipeline run` first");
        return Ok(());
    }

    let header = format!(
        "{:<8}{:<11}{:<11}{:<21}{:<21}ERROR",
        "ID", "STATUS", "TRIGGER", "STARTED", "COMPLETED"
    );
    println!("{header}");
    for run in &runs {
        let error_display = run
            .error_message
            .as_deref()
            .map(truncate_display)
            .unwrap_or_default();
        println!(
            "{:<8}{:<11}{:<11}{:<21}{:<21}{}",
            run.id,
            run.status,
            run.trigger_source,
            fmt_timestamp(run.started_at),
            fmt_timestamp(run.completed_at),
            error_display
        );
    }

    Ok(())
}

/// Show one run and its stage-by-stage results.
async fn run_show(config: &AppConfig, id: i64) -> anyhow::Result<()> {
    let pool = crate::db::connect(config).await?;
    let run = tgmed_db::get_pipeline_run(&pool, id)
        .await
        .map_err(|err| match err {
            tgmed_db::DbError::NotFound => {
                anyhow::anyhow!("pipeline run {id} not found; see `pipeline runs`")
            }
            other => other.into(),
        })?;
    let stages = tgmed_db::list_run_stages(&pool, id).await?;

    println!("Run: {} ({})", run.id, run.public_id);
    println!("Status: {} (trigger: {})", run.status, run.trigger_source);
    println!("Started: {}", fmt_timestamp(run.started_at));
    println!("Completed: {}", fmt_timestamp(run.completed_at));
    if let Some(error) = &run.error_message {
        println!("Error: {error}");
    }
    println!();
    let header = format!("{:<18}{:<11}{:>8}  DETAIL", "STAGE", "STATUS", "RECORDS");
    println!("{header}");
    for stage in &stages {
        let detail = stage.detail.as_deref().unwrap_or("\u{2014}");
        println!(
            "{:<18}{:<11}{:>8}  {}",
            stage.stage, stage.status, stage.records_processed, detail
        );
    }

    Ok(())
}

fn fmt_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "\u{2014}".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

fn truncate_display(text: &str) -> String {
    if text.chars().count() > 50 {
        format!("{}...", text.chars().take(50).collect::<String>())
    } else {
        text.to_string()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
