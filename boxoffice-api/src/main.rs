use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use boxoffice_api::{app, AppState, AuthConfig};
use boxoffice_core::{InMemoryStore, ReservationCoordinator, UserDirectory};
use boxoffice_shared::NewUser;
use boxoffice_store::app_config::{AdminAccount, Config, StorageBackend};
use boxoffice_store::{DbClient, PgCatalogRepository, PgReservationStore, PgUserDirectory, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxoffice_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting BoxOffice API on port {}", config.server.port);

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
    };

    let mut app_state = match config.storage.backend {
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;

            let coordinator = ReservationCoordinator::new(
                Arc::new(PgReservationStore::new(db.pool.clone())),
                config.reservations.clone(),
            );
            AppState::new(
                Arc::new(coordinator),
                Arc::new(PgCatalogRepository::new(db.pool.clone())),
                Arc::new(PgUserDirectory::new(db.pool)),
                auth,
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; nothing survives a restart");
            AppState::in_memory(InMemoryStore::new(), config.reservations.clone(), auth)
        }
    };

    if let Some(redis) = &config.redis {
        let redis_client = RedisClient::new(&redis.url)
            .await
            .context("Failed to connect to Redis")?;
        app_state = app_state.with_rate_limit(Arc::new(redis_client), config.rate_limit.clone());
    }

    if let Some(admin) = &config.auth.admin {
        ensure_admin(app_state.users.as_ref(), admin).await?;
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

/// Creates the configured admin account on first start.
async fn ensure_admin(users: &dyn UserDirectory, admin: &AdminAccount) -> anyhow::Result<()> {
    if users.find_credentials(&admin.username).await?.is_some() {
        return Ok(());
    }
    let user = users
        .create_user(NewUser {
            username: admin.username.clone(),
            email: None,
            password: admin.password.clone(),
            is_admin: true,
        })
        .await?;
    tracing::info!(user_id = %user.id, username = %user.username, "Admin account created");
    Ok(())
}
