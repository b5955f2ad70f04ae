//! Club Session - signed session cookies for event kiosks and club members

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use clap::{Parser, Subcommand};
use club_session::api::{self, handlers::AppState};
use club_session::config::Config;
use club_session::directory::StaticDirectory;
use rand::Rng;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Club Session - stateless kiosk and member sessions
#[derive(Parser, Debug)]
#[command(name = "club_session")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Print a random signing secret for CLUB_SESSION_SECRET
    GenSecret,

    /// Print a bcrypt hash of a kiosk PIN or member password for the config file
    HashPin {
        /// The PIN or password to hash
        pin: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::GenSecret) => {
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill(&mut bytes);
            println!("{}", URL_SAFE_NO_PAD.encode(bytes));
            return Ok(());
        }
        Some(Command::HashPin { ref pin }) => {
            println!("{}", bcrypt::hash(pin, bcrypt::DEFAULT_COST)?);
            return Ok(());
        }
        Some(Command::Serve) | None => {}
    }

    // Load configuration from file if specified, otherwise use default loading
    let mut config = if let Some(ref path) = cli.config {
        let mut config = Config::from_file(path)?;
        config.apply_env_overrides();
        config
    } else {
        Config::load()
    };

    // CLI overrides
    if let Some(ref addr) = cli.listen {
        config.listen_addr = addr.parse()?;
    }

    // Initialize tracing
    let log_level = if cli.verbose {
        "club_session=trace,tower_http=trace".to_string()
    } else {
        config.log_level.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting club session server");
    info!("  Listen address: {}", config.listen_addr);
    info!(
        "  Environment: {}",
        if config.production {
            "production (Secure cookies)"
        } else {
            "development"
        }
    );
    info!(
        "  Kiosk sessions: {} ({} events)",
        config.kiosk.lifetime,
        config.kiosk.events.len()
    );
    info!(
        "  Member sessions: {} ({} accounts)",
        config.member.lifetime,
        config.member.accounts.len()
    );

    let directory = StaticDirectory::new(&config.kiosk.events, &config.member.accounts);
    if directory.is_empty() {
        warn!("  No kiosk events or member accounts configured — every login will be refused");
    }

    // A missing secret stops startup here
    let state = Arc::new(AppState::from_config(&config, Arc::new(directory))?);
    let app = api::router(state, config.max_concurrent_requests);

    // Start server with graceful shutdown
    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("Club session server listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
