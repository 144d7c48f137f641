use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reading_tracker::config::ServerConfig;
use reading_tracker::db::seed::run_seed;
use reading_tracker::db::SessionManager;
use reading_tracker::web::create_axum_router;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Load the demo data set after the schema is created
    #[arg(long)]
    seed: bool,
}

fn init_logging(config: &ServerConfig) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // RUST_LOG wins over the configured level.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},sea_orm=warn,sqlx::query=warn",
            config.log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = ServerConfig::load(args.config.as_deref())?;
    init_logging(&config);
    info!(
        listen_addr = %config.listen_addr,
        debug = config.debug,
        "Starting reading tracker server."
    );

    let session = match SessionManager::connect(&config.database_config()).await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!(error = %e, "Failed to create database connection pool.");
            return Err(e.into());
        }
    };
    session.create_schema().await?;

    if args.seed || config.seed_on_startup {
        run_seed(&session).await?;
    }

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_axum_router(session.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session.shutdown().await?;
    info!("Server shutdown complete.");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown."),
        _ = terminate => info!("Received SIGTERM, starting shutdown."),
    }
}
