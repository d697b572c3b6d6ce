//! interlock-admin server binary

use anyhow::{Context, Result};
use clap::Parser;
use interlock::config::AppConfig;
use interlock::core::events::{EventBus, spawn_audit_logger};
use interlock::gateway;
use interlock::server::ServerBuilder;
use interlock::storage::Stores;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "interlock-admin", version, about = "Interlock service administration backend")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "INTERLOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `server.bind`
    #[arg(short, long)]
    bind: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// PostgreSQL connection string; in-memory storage when absent
    #[cfg(feature = "postgres")]
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = cli.bind.clone() {
        config.server.bind = bind;
    }

    init_tracing(&config.logging.filter, cli.json_logs || config.logging.json);

    let stores = build_stores(&cli).await?;
    let event_bus = EventBus::default();
    let _audit = spawn_audit_logger(&event_bus);
    let gateway = gateway::from_config(&config.gateway);
    tracing::info!(gateway = gateway.name(), "payment gateway ready");

    let bind = config.server.bind.clone();
    ServerBuilder::new(config)
        .with_stores(stores)
        .with_gateway(gateway)
        .with_event_bus(event_bus)
        .serve(&bind)
        .await
}

fn init_tracing(filter: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "postgres")]
async fn build_stores(cli: &Cli) -> Result<Stores> {
    match cli.database_url.as_deref() {
        Some(url) => {
            let pool = sqlx::PgPool::connect(url)
                .await
                .context("connecting to PostgreSQL")?;
            interlock::storage::postgres::ensure_schema(&pool).await?;
            tracing::info!("using PostgreSQL storage");
            Ok(Stores::postgres(pool))
        }
        None => Ok(Stores::in_memory()),
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_stores(_cli: &Cli) -> Result<Stores> {
    tracing::info!("using in-memory storage");
    Ok(Stores::in_memory())
}
