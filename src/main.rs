use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use exec_brief::config::{BriefConfig, CliOptions};
use exec_brief::input::load_messages;
use exec_brief::llm::{LlmConfig, create_provider};
use exec_brief::BriefPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Guard must outlive the run or buffered file logs are lost
    let _log_guard = init_tracing();

    let path = std::env::args()
        .nth(1)
        .context("usage: exec-brief <messages.json>")?;

    let config = BriefConfig::from_env().context("invalid BRIEF_* configuration")?;
    let options = CliOptions::from_env().context("invalid CLI configuration")?;

    let loaded = load_messages(&path).with_context(|| format!("failed to load {path}"))?;
    if !loaded.rejected.is_empty() {
        warn!(
            rejected = loaded.rejected.len(),
            "Some input records could not be decoded"
        );
    }

    let mut pipeline = BriefPipeline::new(config);
    match LlmConfig::from_env() {
        Some(llm_config) => {
            let provider = create_provider(&llm_config).context("failed to create LLM provider")?;
            pipeline = pipeline.with_llm(provider);
        }
        None => info!("No LLM API key set, using rule-based synthesis"),
    }

    let brief = pipeline
        .run_with_cancel(
            &loaded.messages,
            Utc::now(),
            cancel_signal(options.request_timeout),
        )
        .await;

    if options.output_json {
        println!("{}", brief.to_json().context("failed to serialize brief")?);
    } else {
        print!("{}", brief.markdown);
    }

    Ok(())
}

/// Resolves on Ctrl-C or when `deadline` elapses.
async fn cancel_signal(deadline: Option<Duration>) {
    let deadline = async move {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = deadline => warn!("Request deadline reached, finishing with rule-based synthesis"),
        _ = tokio::signal::ctrl_c() => warn!("Interrupted, finishing with rule-based synthesis"),
    }
}

/// Logs go to stderr, and also to a daily-rolling file when `BRIEF_LOG_DIR`
/// is set.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match std::env::var("BRIEF_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "exec-brief.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}
