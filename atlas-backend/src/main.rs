use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod caller;
mod config;
mod controllers;
mod db;
mod error;
mod hooks;
mod links;
mod models;
mod services;

use config::Config;
use db::Database;
use hooks::{FeedHook, LogFeedHook};
use services::{AccessControl, NoteStore, RecordStore, SchemaRegistry, SearchEngine, ValueStore};

/// Shared per-process context handed to every handler.
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub registry: SchemaRegistry,
    pub access: AccessControl,
    pub values: ValueStore,
    pub search: SearchEngine,
    pub records: RecordStore,
    pub notes: NoteStore,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config, feed: Arc<dyn FeedHook>) -> Self {
        let access = AccessControl::new(Arc::clone(&db));
        Self {
            registry: SchemaRegistry::new(Arc::clone(&db)),
            values: ValueStore::new(Arc::clone(&db), access.clone(), feed),
            search: SearchEngine::new(Arc::clone(&db)),
            records: RecordStore::new(Arc::clone(&db)),
            notes: NoteStore::new(Arc::clone(&db)),
            access,
            db,
            config,
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url, config.db_pool_size)
        .map_err(|e| std::io::Error::other(format!("Failed to initialize database: {}", e)))?;
    let db = Arc::new(db);

    let state = web::Data::new(AppState::new(Arc::clone(&db), config, Arc::new(LogFeedHook)));

    log::info!("Starting atlas server on port {}", port);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::extractor_config)
            .configure(controllers::health::config_routes)
            .configure(controllers::object_types::config)
            .configure(controllers::objects::config)
            .configure(controllers::notes::config)
            .configure(controllers::public::config)
    })
    .bind(("0.0.0.0", port))?
    .run();

    // Get server handle for graceful shutdown
    let server_handle = server.handle();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        log::info!("Received Ctrl+C, shutting down...");

        let server_stop = server_handle.stop(true);
        if tokio::time::timeout(std::time::Duration::from_secs(5), server_stop)
            .await
            .is_err()
        {
            log::warn!("Timeout waiting for HTTP server to stop, forcing exit...");
        }

        log::info!("Shutdown complete");
    });

    server.await
}
