use blog_portal::{
    AppState,
    auth::{IdentityState, IdentityStore, SessionManager, SessionState},
    config::{AppConfig, Env},
    create_router,
    models::SessionIdentity,
    repository::{InMemoryRepository, RepositoryState},
    storage::{LocalUploadStore, UploadState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point, responsible for initializing configuration,
/// logging, the in-memory stores, the upload directory, and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes RUST_LOG, falling back to sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize logging based on environment: pretty output for local
    // debugging, JSON for ingestion by log aggregators in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. In-memory stores. Users are the fixed seed set; sessions, posts,
    // and comments start empty and do not survive a restart.
    let identity = Arc::new(IdentityStore::seeded()) as IdentityState;
    let sessions = Arc::new(SessionManager::new(config.session_ttl)) as SessionState;
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;

    // 5. Upload gate. The uploads directory is created up front so the
    // first accepted upload cannot fail on a missing path.
    let upload_store = LocalUploadStore::new(&config.uploads_dir);
    upload_store
        .ensure_root_exists()
        .await
        .expect("FATAL: failed to create the uploads directory");
    let uploads = Arc::new(upload_store) as UploadState;

    // 6. Demo content, matching the fixture the frontend expects on boot.
    seed_demo_content(&repo, &identity).await;

    // 7. Unified state assembly and server startup.
    let app_state = AppState {
        identity,
        sessions,
        repo,
        uploads,
        config: config.clone(),
    };
    let app = create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .expect("FATAL: failed to bind the HTTP listener");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on {}", config.bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("HTTP server terminated unexpectedly");
}

/// seed_demo_content
///
/// Inserts the welcome post and its first comment, authored by the seeded
/// accounts. Runs only from this binary; tests build their state empty.
async fn seed_demo_content(repo: &RepositoryState, identity: &IdentityState) {
    let welcome = repo
        .create_post(
            "Welcome to the blog".to_string(),
            "This is the first post on the blog".to_string(),
            "admin".to_string(),
        )
        .await
        .expect("FATAL: failed to seed the welcome post");

    if let Some(user) = identity.find_by_username("user") {
        let commenter = SessionIdentity::from(user);
        repo.add_comment(welcome.id, "Great post!".to_string(), Some(&commenter))
            .await
            .expect("FATAL: failed to seed the welcome comment");
    }
}
