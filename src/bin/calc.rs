//! # Calc
//!
//! Runs a coordinator and a worker pool in one process, evaluates the
//! expressions given on the command line and prints their final snapshots.

use anyhow::{bail, Context};
use calc_core::auth::TokenAuthority;
use calc_core::config::CalcConfig;
use calc_core::decomposer::{Decomposer, RecordingExecutor};
use calc_core::logging::init_structured_logging;
use calc_core::models::{ExpressionListPayload, SubmitExpressionRequest, SubmitExpressionResponse};
use calc_core::orchestration::Coordinator;
use calc_core::worker::{LocalDispatchClient, WorkerPool};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "calc")]
#[command(about = "Evaluate arithmetic expressions on a pool of simulated workers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Expressions to evaluate, e.g. "(10+2)*2"
    #[arg(required = true)]
    expressions: Vec<String>,

    /// Override the configured computing power (number of workers)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Configuration file (defaults to $CALC_CONFIG, then ./calc.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the operation plan of each expression instead of dispatching it
    #[arg(long)]
    explain: bool,

    /// Give up waiting for results after this many seconds
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_structured_logging();

    if cli.explain {
        return explain(&cli.expressions).await;
    }

    let mut config = match &cli.config {
        Some(path) => CalcConfig::load_from(Some(path.as_path()), std::env::vars().collect()),
        None => CalcConfig::load(),
    }
    .context("loading configuration")?;
    if let Some(workers) = cli.workers {
        config.worker.computing_power = workers;
    }
    config.validate().context("validating configuration")?;

    let authority = Arc::new(
        TokenAuthority::new().with_account(&config.worker.login, &config.worker.password),
    );
    let coordinator = Coordinator::from_config(&config)
        .authorizer(authority.clone())
        .build()
        .await
        .context("starting coordinator")?;

    let client = LocalDispatchClient::authenticated(
        coordinator.clone(),
        authority,
        &config.worker.login,
        &config.worker.password,
    );
    let pool = WorkerPool::spawn(Arc::new(client), &config.worker);

    for text in &cli.expressions {
        let request = SubmitExpressionRequest {
            expression: text.clone(),
        };
        let response = SubmitExpressionResponse {
            id: coordinator.submit(&request.expression).await?,
        };
        info!(id = response.id, expression = %request.expression, "Submitted expression");
    }

    let waited = tokio::time::timeout(Duration::from_secs(cli.timeout_secs), async {
        let expressions = coordinator.list_expressions().await?;
        for expression in &expressions {
            coordinator.wait_for(expression.id).await?;
        }
        coordinator.list_expressions().await
    })
    .await;

    pool.shutdown().await;

    let expressions = match waited {
        Ok(result) => result?,
        Err(_) => bail!("expressions still running after {}s", cli.timeout_secs),
    };

    let payload = ExpressionListPayload { expressions };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

async fn explain(expressions: &[String]) -> anyhow::Result<()> {
    for text in expressions {
        let decomposer = Decomposer::new(RecordingExecutor::new());
        match decomposer.decompose(text).await {
            Ok(value) => {
                println!("{text}");
                for (step, op) in decomposer.executor().operations().iter().enumerate() {
                    println!("  {}. {} {} {}", step + 1, op.arg1, op.operator, op.arg2);
                }
                println!("  = {value}");
            }
            Err(error) => println!("{text}\n  error ({}): {error}", error.kind()),
        }
    }
    Ok(())
}
