use crate::{
    AppState, auth,
    auth::{AuthUser, OptionalAuthUser},
    error::ApiError,
    models::{
        Comment, CreateCommentRequest, CreatePostRequest, CurrentUserResponse, ErrorResponse,
        LoginRequest, LoginResponse, MessageResponse, Post, UploadResponse, UserSummary,
    },
    policy,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};

// --- Authentication Handlers ---

/// login
///
/// [Public Route] Validates credentials and opens a session.
///
/// The identity store collapses unknown-username and wrong-password into one
/// uniform failure, and the session token travels back only as an HttpOnly
/// cookie. Brute-force throttling is the surrounding rate limiter's job;
/// this handler stays a plain authenticate-then-create sequence.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .identity
        .authenticate(&payload.username, &payload.password)?;

    let token = state.sessions.create(user);
    let cookie = auth::session_cookie(&token, &state.config);

    let body = LoginResponse {
        message: "login successful".to_string(),
        user: UserSummary::from(user),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// logout
///
/// [Public Route] Destroys the caller's session, if any, and clears the
/// cookie. Destroying an absent or already-destroyed token is not an error,
/// so the endpoint never fails.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Session closed", body = MessageResponse))
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = auth::session_token(&headers) {
        state.sessions.destroy(&token);
    }

    let cookie = auth::clear_session_cookie(&state.config);
    let body = MessageResponse {
        message: "session closed".to_string(),
    };
    ([(header::SET_COOKIE, cookie)], Json(body))
}

/// current_user
///
/// [Authenticated Route] Returns the identity snapshot bound to the caller's
/// session. The role reported here is the one captured at login time.
#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Current identity", body = CurrentUserResponse),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
pub async fn current_user(AuthUser(identity): AuthUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        user: UserSummary::from(identity),
    })
}

// --- Post Handlers ---

/// list_posts
///
/// [Public Route] All posts in creation order.
#[utoipa::path(
    get,
    path = "/api/posts",
    responses((status = 200, description = "All posts", body = [Post]))
)]
pub async fn list_posts(State(state): State<AppState>) -> Json<Vec<Post>> {
    Json(state.repo.list_posts().await)
}

/// get_post
///
/// [Public Route] A single post by ID.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = u64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Unknown post", body = ErrorResponse)
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Post>, ApiError> {
    match state.repo.get_post(id).await {
        Some(post) => Ok(Json(post)),
        None => Err(ApiError::NotFound),
    }
}

/// create_post
///
/// [Authenticated Route] Submits a new post. The author field is the session
/// username, never client-supplied. Content is markup-escaped by the content
/// store before it is kept.
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Missing title or content", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
pub async fn create_post(
    OptionalAuthUser(identity): OptionalAuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    if !policy::can_create_post(identity.as_ref()) {
        return Err(ApiError::Unauthenticated);
    }
    let identity = identity.ok_or(ApiError::Unauthenticated)?;

    let post = state
        .repo
        .create_post(payload.title, payload.content, identity.username)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post together with all of its comments.
///
/// *Authorization*: the content store applies the delete policy (original
/// author or admin) and removes the post and its comment cascade in one
/// atomic step. Anyone else gets 403 and the post stays.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = u64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the author and not an admin", body = ErrorResponse),
        (status = 404, description = "Unknown post", body = ErrorResponse)
    )
)]
pub async fn delete_post(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repo.delete_post(id, &identity).await?;
    Ok(Json(MessageResponse {
        message: "post deleted successfully".to_string(),
    }))
}

// --- Comment Handlers ---

/// list_comments
///
/// [Public Route] Comments for one post, in creation order. An unknown post
/// ID yields an empty list rather than an error.
#[utoipa::path(
    get,
    path = "/api/posts/{id}/comments",
    params(("id" = u64, Path, description = "Post ID")),
    responses((status = 200, description = "Comments", body = [Comment]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<u64>,
) -> Json<Vec<Comment>> {
    Json(state.repo.list_comments(post_id).await)
}

/// add_comment
///
/// [Public Route, session optional] Posts a comment. Authenticated callers
/// are recorded under their session username; anonymous callers under the
/// fixed sentinel. The parent post's existence is not verified.
#[utoipa::path(
    post,
    path = "/api/posts/{id}/comments",
    params(("id" = u64, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 400, description = "Missing content", body = ErrorResponse)
    )
)]
pub async fn add_comment(
    OptionalAuthUser(identity): OptionalAuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<u64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = state
        .repo
        .add_comment(post_id, payload.content, identity.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

// --- Upload Handler ---

/// upload
///
/// [Authenticated Route] Accepts a multipart form with a `file` field, runs
/// it through the upload gate, and returns the URL path of the stored asset.
///
/// The gate enforces the 10 MiB cap and the image-only rule and generates
/// the stored name itself; any filename the client sent is ignored. A
/// persistence failure maps to 500, distinct from the gate's 400 rejections.
#[utoipa::path(
    post,
    path = "/api/upload",
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "No file, wrong type, or too large", body = ErrorResponse),
        (status = 401, description = "No valid session", body = ErrorResponse)
    )
)]
pub async fn upload(
    OptionalAuthUser(identity): OptionalAuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    if !policy::can_upload(identity.as_ref()) {
        return Err(ApiError::Unauthenticated);
    }

    let mut stored = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart body".to_string()))?
    {
        if field.name() == Some("file") {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("malformed multipart body".to_string()))?;

            stored = Some(state.uploads.store(bytes.to_vec(), &content_type).await?);
            break;
        }
    }

    let asset = stored.ok_or_else(|| ApiError::Validation("no file uploaded".to_string()))?;
    Ok(Json(UploadResponse {
        message: "file uploaded successfully".to_string(),
        url: asset.url,
    }))
}
