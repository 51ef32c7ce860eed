use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrumdeck::{api, engine::SessionRegistry, store::FeatureStore};

/// Idle sessions are evicted after this long unless overridden via
/// `SCRUMDECK_SESSION_TTL_SECS`. Zero disables the sweeper.
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;

#[derive(Parser)]
#[command(name = "scrumdeck")]
#[command(about = "Planning-poker consensus server for agile feature estimation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ScrumDeck server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Path to the feature store database
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Seed the feature store with the sample backlog and exit
    Seed {
        /// Path to the feature store database
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "scrumdeck=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_store(db: Option<PathBuf>) -> anyhow::Result<FeatureStore> {
    let store = match db {
        Some(path) => FeatureStore::open(path)?,
        None => FeatureStore::open_default()?,
    };
    store.migrate()?;
    Ok(store)
}

fn session_ttl() -> Duration {
    let secs = std::env::var("SCRUMDECK_SESSION_TTL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SESSION_TTL_SECS);
    Duration::from_secs(secs)
}

async fn serve(port: u16, db: Option<PathBuf>) -> anyhow::Result<()> {
    let store = open_store(db)?;
    store.seed_if_empty()?;

    let registry = Arc::new(SessionRegistry::new());

    let ttl = session_ttl();
    if !ttl.is_zero() {
        let sweeper = registry.clone();
        tokio::spawn(async move {
            let period = Duration::from_secs((ttl.as_secs() / 4).max(1));
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let evicted = sweeper.evict_idle(ttl);
                if evicted > 0 {
                    tracing::info!("Evicted {} idle session(s)", evicted);
                }
            }
        });
    }

    let app = api::create_router(registry, store);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("ScrumDeck server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port, db }) => serve(port, db).await?,
        Some(Commands::Seed { db }) => {
            let store = open_store(db)?;
            if store.seed_if_empty()? {
                println!("Seeded feature store with the sample backlog.");
            } else {
                println!("Feature store already has features; nothing to do.");
            }
        }
        None => serve(3000, None).await?,
    }

    Ok(())
}
