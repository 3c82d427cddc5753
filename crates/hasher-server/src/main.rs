#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use hasher::{Pipeline, TerminationMonitor};
use server::config::{CliArgs, ServerConfig};
use server::routes;
use server::telemetry::{self, init_telemetry};
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let pipeline: Pipeline = Pipeline::new(config.work_delay);
    telemetry::register_in_flight_gauge(pipeline.gate());

    // Cancelled once a requested shutdown has fully drained.
    let terminated = TerminationMonitor::new(pipeline.gate(), config.poll_interval).spawn();
    tokio::spawn(shutdown_signal(pipeline.clone()));

    let listener = TcpListener::bind(config.server_addr).await?;
    log_startup_info(&config);

    axum::serve(listener, routes::router(pipeline))
        .with_graceful_shutdown(terminated.cancelled_owned())
        .await?;

    tracing::info!("Service shut down successfully");
    providers.shutdown();
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting hash service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting hash service on {} with a {:?} work delay",
            config.server_addr,
            config.work_delay
        );
    }
}

/// Waits for Ctrl+C or SIGTERM and begins draining the pipeline. The process
/// exits once the termination monitor sees the drain complete.
async fn shutdown_signal(pipeline: Pipeline) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, draining in-flight work...");
    pipeline.request_shutdown();
}
