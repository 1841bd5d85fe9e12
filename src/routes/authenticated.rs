use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post},
};

/// Authenticated Router Module
///
/// Every route here is wrapped by the session middleware in `create_router`,
/// so handlers only ever run with a live session. Ownership and role checks
/// beyond mere authentication (who may delete which post) are applied deeper
/// down, by the delete policy inside the content store.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/posts
        // Submits a new post authored by the session user.
        .route("/api/posts", post(handlers::create_post))
        // DELETE /api/posts/{id}
        // Removes a post and its comment cascade. Author-or-admin only.
        .route("/api/posts/{id}", delete(handlers::delete_post))
        // POST /api/upload
        // Multipart image intake through the upload gate.
        .route("/api/upload", post(handlers::upload))
}
