//! ETH/USD price oracle daemon
//!
//! Polls the exchanges, smooths the volume-weighted price and pushes it to
//! the oracle contract.

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use oracle_core::{LogFormat, RuntimeSettings};
use oracle_daemon::{OracleContext, RunMode};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        }
        _ = terminate => {
            info!("Received termination signal");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let log_format = RuntimeSettings::load()
        .map(|s| s.log_format)
        .unwrap_or_default();
    init_tracing(log_format);

    info!("Starting ETH/USD oracle v{}", env!("CARGO_PKG_VERSION"));

    // Errors returned from here are reported once, by anyhow
    let context = OracleContext::load()?;
    info!(
        "Publishing to {} from {} via {}",
        context.config.contract_address, context.config.owner_address, context.runtime.rpc_url
    );

    let mut oracle = context.build_oracle()?;

    oracle.run(RunMode::Forever, shutdown_signal()).await?;

    info!(
        "Oracle stopped after {} cycles, {} update(s) unconfirmed",
        oracle.state().sample_count,
        oracle.pending_publishes()
    );
    Ok(())
}
