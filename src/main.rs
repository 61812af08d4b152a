//! Chorus - social network backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chorus::{
    assets,
    config::{Args, LogFormat, StoreBackend},
    db::MongoClient,
    server::{self, AppState},
    store::{MemoryStore, MongoStore, SocialStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("chorus={},info", args.log_level).into());
    match args.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Chorus");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Store: {:?}", args.store);
    info!("Session transport: {:?}", args.session_transport);
    info!("Session lifetime: {} days", args.session_ttl_days);
    info!("======================================");

    let store: Arc<dyn SocialStore> = match args.store {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Mongo => match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => {
                info!("MongoDB connected successfully");
                Arc::new(MongoStore::new(client).await?)
            }
            Err(e) if args.dev_mode => {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                Arc::new(MemoryStore::new())
            }
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        },
    };

    let assets = assets::from_args(&args)?;
    let state = Arc::new(AppState::new(args, store, assets)?);

    tokio::select! {
        result = server::run(state) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    Ok(())
}
