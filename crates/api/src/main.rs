use std::net::SocketAddr;
use std::sync::Arc;

use scriptbox_api::app::build_router;
use scriptbox_api::config::{ServerConfig, StoreBackend};
use scriptbox_api::scripting::orchestrator::ScriptOrchestrator;
use scriptbox_api::state::AppState;
use scriptbox_core::scripting::ScriptEngine;
use scriptbox_core::store::{InMemoryScriptStore, ScriptStore};
use scriptbox_db::PgScriptStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scriptbox_api=debug,scriptbox_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = ?config.store_backend,
        "Loaded server configuration"
    );

    // --- Script store ---
    let store: Arc<dyn ScriptStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = scriptbox_db::create_pool(&config.database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            scriptbox_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            scriptbox_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgScriptStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory script store; scripts are lost on restart");
            Arc::new(InMemoryScriptStore::new())
        }
    };

    // --- Script engine ---
    let engine =
        ScriptEngine::start(config.engine_config()).expect("Failed to start script engine");

    // --- App state ---
    let state = AppState {
        orchestrator: Arc::new(ScriptOrchestrator::new(store, engine)),
        config: Arc::new(config.clone()),
    };

    let app = build_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
