use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Reads are open to everyone;
/// comment creation is here too because anonymous comments are allowed and
/// only the recorded author changes with authentication. `GET /api/user`
/// rejects by itself (via the extractor) rather than through the middleware,
/// matching its role as a session probe.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /api/login
        // Credential check and session creation. Rate limiting sits in the
        // surrounding layer, not here.
        .route("/api/login", post(handlers::login))
        // POST /api/logout
        // Destroys the caller's session; idempotent.
        .route("/api/logout", post(handlers::logout))
        // GET /api/user
        // Resolves the session cookie to the logged-in identity, or 401.
        .route("/api/user", get(handlers::current_user))
        // GET /api/posts
        // Lists every post in creation order.
        .route("/api/posts", get(handlers::list_posts))
        // GET /api/posts/{id}
        // Single-post detail view.
        .route("/api/posts/{id}", get(handlers::get_post))
        // GET + POST /api/posts/{id}/comments
        // Comment listing is open; comment creation takes an optional
        // session and falls back to the anonymous author label.
        .route(
            "/api/posts/{id}/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
}
