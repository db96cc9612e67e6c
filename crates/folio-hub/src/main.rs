use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_hub::config::Config;
use folio_hub::store::MemoryStore;
use folio_hub::{build_router, mail, questionnaire, store_collections, AppState};

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(name = "folio-hub", version, about = "FOLIO search and mail hub")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "127.0.0.1:5007")]
    bind: String,

    /// Path to config file
    #[arg(long, default_value = "folio-hub.toml")]
    config: PathBuf,

    /// Directory of `<collection>.json` files to preload
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Built web UI to serve on unmatched paths
    #[arg(long)]
    ui_dir: Option<PathBuf>,

    /// Seed the demo books and users before serving
    #[arg(long)]
    seed: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "folio_hub=info,folio_core=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    config.apply_env();
    if args.data_dir.is_some() {
        config.server.data_dir = args.data_dir.clone();
    }
    if args.ui_dir.is_some() {
        config.server.ui_dir = args.ui_dir.clone();
    }

    let collections = store_collections(&config);
    let store = Arc::new(MemoryStore::with_collections(collections.iter().cloned()));

    if let Some(dir) = &config.server.data_dir {
        match store.load_dir(dir, &collections).await {
            Ok(n) => tracing::info!("Preloaded {} records from {:?}", n, dir),
            Err(e) => {
                tracing::error!("Failed to preload data: {}", e);
                std::process::exit(1);
            }
        }
    }
    if args.seed {
        let report = folio_hub::seed::seed_all(&store).await;
        tracing::info!("Seeded {} books and {} users", report.books, report.users);
    }

    if config.mail.from.is_none() {
        tracing::warn!("MAIL_FROM is not set; email endpoints will fail");
    }

    let transport = mail::build_transport(&config.mail);
    let state = Arc::new(AppState::new(config, store, transport));

    // Spawn background retention sweeper
    let retention = state.config.retention.clone();
    let sweep_store = state.store.clone();
    tokio::spawn(async move {
        questionnaire::retention_sweeper(
            sweep_store,
            retention.questionnaire_days,
            retention.sweep_interval_secs,
        )
        .await
    });

    let app = build_router(state.clone());

    let addr: SocketAddr = match args.bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid bind address {:?}: {}", args.bind, e);
            std::process::exit(1);
        }
    };
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    tracing::info!("  📚 FOLIO hub v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("  API:        http://{}/api/books", addr);
    tracing::info!("  Status:     http://{}/status", addr);
    tracing::info!("  Mail:       {}", state.transport.name());
    tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
