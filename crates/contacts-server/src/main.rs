//! contacts-server: REST server for the contact book.
//!
//! See `config.rs` for the environment variables it reads. A `.env` file in
//! the working directory is loaded first when present.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tokio::net::TcpListener;

use contacts_core::memory::MemoryStore;
use contacts_core::ports::ContactStore;
use contacts_core::service::{ContactService, ContactServiceImpl};
use contacts_postgres::{connect, schema, PgContactStore};
use contacts_server::config::{ServerConfig, StoreKind};
use contacts_server::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,contacts_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let (store, pool): (Arc<dyn ContactStore>, Option<PgPool>) = match &config.store {
        StoreKind::Postgres(db) => {
            let pool = connect(db).await.context("failed to connect to database")?;
            schema::migrate(&pool).await.context("schema bootstrap failed")?;
            if config.seed_phone_types {
                schema::seed_phone_types(&pool)
                    .await
                    .context("failed to seed phone types")?;
            }
            tracing::info!("Connected to database");
            (Arc::new(PgContactStore::new(pool.clone())), Some(pool))
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            let store = if config.seed_phone_types {
                MemoryStore::seeded()
            } else {
                MemoryStore::new()
            };
            (Arc::new(store), None)
        }
    };

    let service: Arc<dyn ContactService> = Arc::new(ContactServiceImpl::new(store));
    let app = build_router(service);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("contacts-server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database pool closed");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
