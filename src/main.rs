use opsdesk::config::AppConfig;
use opsdesk::session::{FilePersistence, MemoryPersistence, SessionStore};
use opsdesk::{routes, state};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();

    let session = match &config.storage_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "session storage on disk");
            SessionStore::restore(FilePersistence::new(dir))
        }
        None => {
            tracing::warn!("SESSION_STORAGE_DIR not set — session will not survive restarts");
            SessionStore::restore(MemoryPersistence::new())
        }
    };

    if config.backend_url.is_none() {
        tracing::warn!("BACKEND_URL not set — auth API routes disabled");
    }

    let state = state::AppState::new(&config, session.shared()).expect("invalid guard configuration");
    let app = routes::app(state);

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "opsdesk listening");
    axum::serve(listener, app).await.expect("server failed");
}
