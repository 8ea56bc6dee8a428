//! Guildhall - guild membership and mastery-link distribution

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guildhall::{
    config::Args,
    engine::{DistributionEngine, MemberDirectory},
    server,
    store::{HistoryStore, ListStore, MemberStore, MemoryStore, SledStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("guildhall={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Guildhall - link distribution");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!(
        "Tenure thresholds: silver {}d, gold {}d",
        args.silver_tenure_days, args.gold_tenure_days
    );
    info!("Max absences: {}", args.max_absence_count);
    info!("======================================");

    // Open the store (sled by default; in-memory on request or as a dev
    // mode fallback)
    let (member_store, history_store, list_store, backend): (
        Arc<dyn MemberStore>,
        Arc<dyn HistoryStore>,
        Arc<dyn ListStore>,
        &'static str,
    ) = if args.memory_store {
        let store = Arc::new(MemoryStore::new());
        info!("Using in-memory store");
        (store.clone(), store.clone(), store, "memory")
    } else {
        match SledStore::open(&args.data_dir) {
            Ok(store) => {
                let store = Arc::new(store);
                (store.clone(), store.clone(), store, "sled")
            }
            Err(e) => {
                if args.dev_mode {
                    warn!("Store open failed (dev mode, using in-memory): {}", e);
                    let store = Arc::new(MemoryStore::new());
                    (store.clone(), store.clone(), store, "memory")
                } else {
                    error!("Failed to open store at {:?}: {}", args.data_dir, e);
                    std::process::exit(1);
                }
            }
        }
    };

    let rules = args.rules();

    // Build engine and member directory
    let engine = Arc::new(DistributionEngine::new(
        Arc::clone(&member_store),
        Arc::clone(&history_store),
        Arc::clone(&list_store),
        rules,
    ));
    let directory = Arc::new(MemberDirectory::new(
        Arc::clone(&member_store),
        Arc::clone(&history_store),
        rules,
    ));

    // Create distribution lists on first boot
    if let Err(e) = engine.init_lists().await {
        error!("Failed to initialize distribution lists: {}", e);
        std::process::exit(1);
    }

    // Run the server
    let state = Arc::new(server::AppState::new(args, engine, directory, backend));
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
