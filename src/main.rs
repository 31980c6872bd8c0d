//! Sorted-numbers service entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sorted_numbers::api::{create_router, AppState};
use sorted_numbers::config::Config;
use sorted_numbers::metrics;
use sorted_numbers::store::{spawn_health_check, PgNumberStore};
use sorted_numbers::utils::{serve_until_shutdown, shutdown_signal, ShutdownOutcome};

/// HTTP service that stores integers and returns them sorted.
#[derive(Parser, Debug)]
#[command(name = "sorted-numbers")]
#[command(about = "Store integers in PostgreSQL and read them back in ascending order")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Listener address, overrides SERVER_ADDR.
        #[arg(long)]
        addr: Option<String>,

        /// Apply pending migrations before serving.
        #[arg(long)]
        migrate: bool,
    },

    /// Apply pending migrations and exit.
    Migrate,

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // .env may carry RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("sorted_numbers=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(args.log_json.then(|| fmt::layer().json()))
        .with((!args.log_json).then(fmt::layer))
        .with(filter)
        .init();

    match args.command {
        Some(Command::Serve { addr, migrate }) => cmd_serve(addr, migrate).await,
        Some(Command::Migrate) => cmd_migrate().await,
        Some(Command::CheckConfig) => cmd_check_config(),
        None => cmd_serve(None, false).await,
    }
}

/// Load and validate configuration, logging the failure before returning it.
fn load_config(addr_override: Option<String>) -> anyhow::Result<Config> {
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    if let Some(addr) = addr_override {
        config.server_addr = addr;
    }

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    Ok(config)
}

/// Run the HTTP server until SIGINT/SIGTERM.
async fn cmd_serve(addr_override: Option<String>, migrate: bool) -> anyhow::Result<()> {
    let config = load_config(addr_override)?;
    let addr = config.bind_addr()?;
    let pool_settings = config.pool_settings();

    let store = PgNumberStore::connect(config.dsn()?, &pool_settings)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to connect to database");
            e
        })?;
    info!("Successfully connected to database");

    if migrate {
        store.migrate().await.map_err(|e| {
            error!(error = %e, "Failed to apply migrations");
            e
        })?;
        info!("Migrations applied");
    }

    let health_check = spawn_health_check(store.clone(), pool_settings.health_check_period);

    let mut state = AppState::new(Arc::new(store.clone()));
    match metrics::install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!(error = %e, "Prometheus recorder unavailable, /metrics disabled"),
    }
    let router = create_router(state, config.request_timeout());

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!(address = %addr, error = %e, "Failed to bind listener");
        e
    })?;
    info!(address = %addr, "Starting server");

    let outcome = serve_until_shutdown(
        listener,
        router,
        shutdown_signal(),
        config.shutdown_timeout(),
    )
    .await;

    health_check.abort();

    match outcome {
        ShutdownOutcome::Graceful => {
            if tokio::time::timeout(config.shutdown_timeout(), store.close())
                .await
                .is_err()
            {
                warn!("Timed out waiting for database connections to return");
            }
            info!("Server stopped gracefully");
        }
        ShutdownOutcome::TimedOut => {
            // aborted requests may leave connections checked out; exit drops them
            warn!("Server stopped, in-flight requests were terminated");
        }
    }

    Ok(())
}

/// Apply migrations and exit.
async fn cmd_migrate() -> anyhow::Result<()> {
    let config = load_config(None)?;

    let mut pool_settings = config.pool_settings();
    pool_settings.min_connections = 0;
    pool_settings.max_connections = 1;

    let store = PgNumberStore::connect(config.dsn()?, &pool_settings)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to connect to database");
            e
        })?;

    let result = store.migrate().await;
    store.close().await;

    match result {
        Ok(()) => {
            info!("Migrations applied");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Failed to apply migrations");
            Err(e.into())
        }
    }
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SORTED NUMBERS - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    let pool = config.pool_settings();
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!(
        "  Database: {}",
        config.redacted_dsn().unwrap_or_else(|| "<unset>".to_string())
    );
    println!("  Listen Address: {}", config.server_addr);
    println!(
        "  Pool: {}..{} connections, lifetime {:?}, idle {:?}",
        pool.min_connections, pool.max_connections, pool.max_lifetime, pool.max_idle
    );
    println!("  Health Check Every: {:?}", pool.health_check_period);
    println!("  Request Timeout: {:?}", config.request_timeout());
    println!("  Shutdown Timeout: {:?}", config.shutdown_timeout());
    println!("  Log Level: {}", config.rust_log);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}
