use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Application Schemas (In-Memory Collections) ---

/// Role
///
/// The RBAC field carried by every user record and captured into each session
/// at login time. `Admin` may delete any content; `Member` only their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Member,
}

/// User
///
/// A provisioned identity record. The seed set is fixed at startup; records
/// are never mutated or deleted while the server runs.
#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    /// Unique login name, also used as the author label on posts and comments.
    pub username: String,
    /// Stored credential, compared verbatim. No hashing is applied; the
    /// authenticate call must stay a pure lookup so the outer rate limiter
    /// can wrap it.
    pub password: String,
    pub role: Role,
}

/// SessionIdentity
///
/// The identity snapshot captured when a session is created. The role is
/// frozen at login time and never re-checked against the user record for the
/// lifetime of the session (known staleness, kept deliberately).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl From<&User> for SessionIdentity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Post
///
/// A blog entry owned by the content store. Identifiers are assigned from a
/// monotonic counter and are never reused, even after deletions.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Post {
    pub id: u64,
    pub title: String,
    /// Markup-escaped before storage; never contains a raw `<` or `>`.
    pub content: String,
    /// Username snapshot taken at creation. Never empty.
    pub author: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Comment
///
/// A comment attached to a post. Comment identifiers are unique across the
/// whole collection, not per post. Lifecycle is tied to the parent post: the
/// cascade on post deletion removes every comment referencing it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Comment {
    pub id: u64,
    /// Parent post identifier. Existence is not validated at creation time.
    pub post_id: u64,
    /// Markup-escaped before storage, same as post content.
    pub content: String,
    /// Resolved session username, or the fixed anonymous sentinel.
    pub author: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Credentials for POST /api/login. Fields default to empty strings so a
/// missing key collapses into the same uniform credential failure as a wrong
/// value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// CreatePostRequest
///
/// Input payload for submitting a new post. Missing fields deserialize as
/// empty and are rejected by the content store's validation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// CreateCommentRequest
///
/// Input payload for posting a new comment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
}

// --- Response Schemas (Output) ---

/// UserSummary
///
/// The public view of an identity: everything except the credential.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

impl From<SessionIdentity> for UserSummary {
    fn from(identity: SessionIdentity) -> Self {
        Self {
            id: identity.user_id,
            username: identity.username,
            role: identity.role,
        }
    }
}

/// LoginResponse
///
/// Body returned alongside the session cookie on successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserSummary,
}

/// CurrentUserResponse
///
/// Wrapper for GET /api/user, mirroring the `{ "user": … }` shape the
/// frontend consumes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CurrentUserResponse {
    pub user: UserSummary,
}

/// MessageResponse
///
/// Generic acknowledgement body (logout, post deletion).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// UploadResponse
///
/// Result of a successful upload: the URL path under which the stored asset
/// is served, embeddable in post content as-is.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UploadResponse {
    pub message: String,
    pub url: String,
}

/// ErrorResponse
///
/// Uniform error body produced by the error-to-response mapping.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}
