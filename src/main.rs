use actix_web::{App, HttpServer, web};
use anyhow::Context;
use card_vault::application::auth_service::AuthService;
use card_vault::application::card_service::CardService;
use card_vault::application::upload::UploadStore;
use card_vault::data::card_repository::InMemoryCardRepository;
use card_vault::data::session_store::InMemorySessionStore;
use card_vault::data::sqlite::SqliteStore;
use card_vault::data::user_repository::InMemoryUserRepository;
use card_vault::domain::repository::{CardRepository, UserRepository};
use card_vault::infrastructure::config::{AppConfig, StorageConfig};
use card_vault::infrastructure::logging::init_logging;
use card_vault::presentation::handlers::AppState;
use card_vault::presentation::middleware::{RequestIdMiddleware, TimingMiddleware};
use card_vault::presentation::routes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!("Logging initialized");

    let config = AppConfig::from_env().context("failed to load configuration")?;
    info!(
        bind = %config.bind_addr(),
        upload_dir = %config.upload_dir.display(),
        "Configuration loaded"
    );

    let mut sqlite = None;
    let (user_repository, card_repository): (Arc<dyn UserRepository>, Arc<dyn CardRepository>) =
        match &config.storage {
            StorageConfig::Memory => {
                warn!("Using in-memory storage; data is lost on shutdown");
                (
                    Arc::new(InMemoryUserRepository::new()) as Arc<dyn UserRepository>,
                    Arc::new(InMemoryCardRepository::new()) as Arc<dyn CardRepository>,
                )
            }
            StorageConfig::Sqlite(url) => {
                let store = SqliteStore::connect(url).await?;
                sqlite = Some(store.clone());
                (
                    Arc::new(store.clone()) as Arc<dyn UserRepository>,
                    Arc::new(store) as Arc<dyn CardRepository>,
                )
            }
        };

    let auth_service = Arc::new(AuthService::new(
        user_repository,
        Arc::new(InMemorySessionStore::new()),
        chrono::Duration::minutes(config.session_ttl_minutes),
    ));
    let card_service = CardService::new(card_repository);

    let uploads = UploadStore::new(config.upload_dir.clone(), config.max_upload_bytes);
    uploads.ensure_dir().await?;

    let sweeper = {
        let auth_service = auth_service.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                if let Err(e) = auth_service.purge_expired_sessions().await {
                    error!(error = %e, "Failed to purge expired sessions");
                }
            }
        })
    };

    let state = web::Data::new(AppState {
        auth_service,
        card_service,
        uploads,
        cookie_secure: config.cookie_secure,
    });

    let server = HttpServer::new(move || {
        let uploads = state.uploads.clone();
        App::new()
            .app_data(state.clone())
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware)
            .configure(|cfg| routes::configure(cfg, &uploads))
    })
    .bind(config.bind_addr())
    .with_context(|| format!("failed to bind {}", config.bind_addr()))?;

    info!(address = %config.bind_addr(), "Starting HTTP server");
    let result = server.run().await;

    info!("HTTP server stopped, shutting down");
    sweeper.abort();
    if let Some(store) = sqlite {
        store.close().await;
    }

    result.context("HTTP server failed")
}
