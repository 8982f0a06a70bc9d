//! Main application entry point for the party server
//!
//! Parses the command line, loads the TOML configuration, installs logging
//! and runs the presence server until a shutdown signal arrives.

mod cli;
mod config;
mod logging;
mod signals;

use cli::CliArgs;
use config::AppConfig;
use logging::setup_logging;
use party_server::{PartyServer, ServerConfig};
use signals::wait_for_shutdown;
use std::sync::Arc;
use tokio::time::{interval, timeout, Duration};
use tracing::{error, info, warn};

/// Interval between health reports.
const MONITOR_INTERVAL: Duration = Duration::from_secs(60);

/// How long the accept loop gets to stop after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// The configured server and the settings it was built from.
pub struct Application {
    config: AppConfig,
    server: Arc<PartyServer>,
}

impl Application {
    /// Loads configuration, applies CLI overrides and builds the server.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        // Load configuration first (before logging setup)
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(bind_address) = args.bind_address {
            config.server.bind_address = bind_address;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {}", e).into());
        }

        setup_logging(&config.logging, args.json_logs)?;
        display_banner();

        let server_config: ServerConfig = config.to_server_config()?;
        let resolver = config.build_resolver();
        info!(
            "🔐 Auth: {} token(s), guests {}",
            resolver.token_count(),
            if config.auth.allow_guests { "allowed" } else { "disabled" }
        );
        let server = Arc::new(PartyServer::new(server_config, Arc::new(resolver)));

        info!("📂 Config: {}", args.config_path.display());

        Ok(Self { config, server })
    }

    /// Runs the server until SIGINT/SIGTERM, then shuts it down.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Party Server Application");
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  ⏱️ Connection timeout: {}s", self.config.server.connection_timeout);
        info!(
            "  📦 Outbound queue capacity: {}",
            self.config.server.outbound_queue_capacity
        );

        let coordinator = self.server.coordinator();

        let server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move {
                match server.start().await {
                    Ok(()) => info!("✅ Server completed successfully"),
                    Err(e) => {
                        error!("❌ Server error: {:?}", e);
                        std::process::exit(1);
                    }
                }
            })
        };

        let monitoring_handle = {
            let coordinator = coordinator.clone();
            let server = self.server.clone();

            tokio::spawn(async move {
                let mut ticker = interval(MONITOR_INTERVAL);
                let mut last_delivered = 0u64;

                loop {
                    ticker.tick().await;

                    let stats = coordinator.stats().await;
                    let delivered_this_period = stats.broadcast.delivered - last_delivered;
                    last_delivered = stats.broadcast.delivered;

                    info!(
                        "📊 System Health - {} identities | {} sockets | {} parties ({} members) | {} frames/min | {} dropped total",
                        stats.connections,
                        server.active_connections(),
                        stats.parties,
                        stats.memberships,
                        delivered_this_period,
                        stats.broadcast.dropped
                    );
                }
            })
        };

        info!("✅ Party Server is now running!");
        info!("🔍 Health monitoring active - stats every 60 seconds");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let received = wait_for_shutdown().await?;

        info!("🛑 Received {}, initiating graceful shutdown...", received);
        monitoring_handle.abort();
        self.server.shutdown().await?;

        if timeout(SHUTDOWN_GRACE, server_handle).await.is_err() {
            warn!("Accept loop did not stop within {:?}", SHUTDOWN_GRACE);
        }

        let final_stats = coordinator.stats().await;
        info!("📊 Final Statistics:");
        info!("  - Identities connected: {}", final_stats.connections);
        info!("  - Parties open: {}", final_stats.parties);
        info!("  - Party memberships: {}", final_stats.memberships);
        info!("  - Frames delivered: {}", final_stats.broadcast.delivered);
        info!("  - Frames dropped: {}", final_stats.broadcast.dropped);
        info!("👋 Party Server shutdown complete");

        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start application: {:?}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Display startup banner using proper logging
fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║            🎬 PARTY SERVER 🎬            ║");
    info!("║                 v{:<8}                ║", version);
    info!("║                                          ║");
    info!("║  Real-time presence for watch parties    ║");
    info!("╚══════════════════════════════════════════╝");
}
