use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;
pub mod storage;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use auth::AuthUser; // The resolved authenticated session identity.
use routes::{authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry
// point (main.rs) and to the integration tests.
pub use auth::{IdentityState, IdentityStore, SessionManager, SessionState};
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{InMemoryRepository, RepositoryState};
pub use storage::{LocalUploadStore, MockUploadStore, UploadState};

/// Request bodies above this size are refused by the framework. Kept well
/// above the upload gate's cap so an oversized file still reaches the gate
/// and receives its rejection, not a generic 413.
const REQUEST_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application from the `#[utoipa::path]` and `ToSchema` annotations.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout, handlers::current_user,
        handlers::list_posts, handlers::get_post, handlers::create_post,
        handlers::delete_post, handlers::list_comments, handlers::add_comment,
        handlers::upload
    ),
    components(
        schemas(
            models::Role, models::Post, models::Comment,
            models::LoginRequest, models::LoginResponse,
            models::CreatePostRequest, models::CreateCommentRequest,
            models::UserSummary, models::CurrentUserResponse,
            models::MessageResponse, models::UploadResponse,
            models::ErrorResponse,
        )
    ),
    tags(
        (name = "blog-portal", description = "Multi-user blog API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding every service a handler may
/// need: identity store, session manager, content store, upload gate, and
/// the immutable configuration. Shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Identity Store: the fixed user records and credential check.
    pub identity: IdentityState,
    /// Session Manager: opaque token to identity-snapshot mapping.
    pub sessions: SessionState,
    /// Content Store: posts and comments behind one mutex.
    pub repo: RepositoryState,
    /// Upload Gate: validated image intake.
    pub uploads: UploadState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These let extractors and handlers pull individual components out of the
// shared AppState instead of depending on the whole of it.

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for UploadState {
    fn from_ref(app_state: &AppState) -> UploadState {
        app_state.uploads.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the `authenticated_routes`. The `AuthUser`
/// extractor resolves the session cookie; when that fails the request is
/// rejected with 401 before the handler executes, so handlers behind this
/// layer never see an anonymous request.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated routes: protected by the session middleware.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Stored uploads are served as static content under /uploads.
        .nest_service("/uploads", ServeDir::new(state.config.uploads_dir.clone()))
        // Body limit above the gate cap; see REQUEST_BODY_LIMIT.
        .layer(DefaultBodyLimit::max(REQUEST_BODY_LIMIT))
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in
                // a span carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer (applied last).
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the `TraceLayer` span: includes the `x-request-id` header (if
/// present) alongside the HTTP method and URI so every log line for a single
/// request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
