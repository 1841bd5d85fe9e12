use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};

use crate::error::ApiError;
use crate::models::{Comment, Post, SessionIdentity};
use crate::policy;

/// Author label recorded on comments created without a session.
pub const ANONYMOUS_AUTHOR: &str = "anonymous";

/// Escapes the two characters that would let stored content be interpreted
/// as markup. This is the sole XSS defense; it must be applied to every
/// stored post and comment body.
pub fn sanitize_markup(raw: &str) -> String {
    raw.replace('<', "&lt;").replace('>', "&gt;")
}

/// ContentRepository
///
/// The abstract contract for all post and comment operations. Handlers talk
/// to this trait only, so the backing store can be swapped without touching
/// them. The in-memory implementation below is the only one shipped; state
/// does not survive a restart.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// All posts in creation order. No pagination.
    async fn list_posts(&self) -> Vec<Post>;

    async fn get_post(&self, id: u64) -> Option<Post>;

    /// Validates, sanitizes, and stores a new post. The author is the
    /// caller's session username, captured verbatim.
    async fn create_post(
        &self,
        title: String,
        content: String,
        author: String,
    ) -> Result<Post, ApiError>;

    /// Deletes a post and every comment referencing it, atomically. The
    /// requester must be the post's author or an admin.
    async fn delete_post(&self, id: u64, requester: &SessionIdentity) -> Result<(), ApiError>;

    /// Comments for one post in creation order.
    async fn list_comments(&self, post_id: u64) -> Vec<Comment>;

    /// Validates, sanitizes, and stores a new comment. Anonymous callers are
    /// recorded under [`ANONYMOUS_AUTHOR`].
    async fn add_comment(
        &self,
        post_id: u64,
        content: String,
        requester: Option<&SessionIdentity>,
    ) -> Result<Comment, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the content store across the application state.
pub type RepositoryState = Arc<dyn ContentRepository>;

/// Both collections and both ID counters live behind one mutex so that the
/// delete cascade and concurrent ID assignment are single critical sections:
/// no request ever observes a post without its comments (or the reverse),
/// and no two creates are issued the same ID.
struct ContentTables {
    posts: Vec<Post>,
    comments: Vec<Comment>,
    next_post_id: u64,
    next_comment_id: u64,
}

/// InMemoryRepository
///
/// The concrete implementation of [`ContentRepository`]: owned in-memory
/// collections guarded by a single mutex. IDs are monotonic and never
/// reused, even after deleting the highest-numbered entry.
pub struct InMemoryRepository {
    tables: Mutex<ContentTables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(ContentTables {
                posts: Vec::new(),
                comments: Vec::new(),
                next_post_id: 1,
                next_comment_id: 1,
            }),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn list_posts(&self) -> Vec<Post> {
        self.tables
            .lock()
            .expect("content tables lock poisoned")
            .posts
            .clone()
    }

    async fn get_post(&self, id: u64) -> Option<Post> {
        self.tables
            .lock()
            .expect("content tables lock poisoned")
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    async fn create_post(
        &self,
        title: String,
        content: String,
        author: String,
    ) -> Result<Post, ApiError> {
        if title.trim().is_empty() || content.trim().is_empty() {
            return Err(ApiError::Validation(
                "title and content are required".to_string(),
            ));
        }

        let mut tables = self.tables.lock().expect("content tables lock poisoned");
        let id = tables.next_post_id;
        tables.next_post_id += 1;

        let post = Post {
            id,
            title,
            content: sanitize_markup(&content),
            author,
            created_at: Utc::now(),
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn delete_post(&self, id: u64, requester: &SessionIdentity) -> Result<(), ApiError> {
        let mut tables = self.tables.lock().expect("content tables lock poisoned");

        let index = tables
            .posts
            .iter()
            .position(|post| post.id == id)
            .ok_or(ApiError::NotFound)?;

        if !policy::can_delete(&tables.posts[index], requester) {
            return Err(ApiError::Forbidden);
        }

        // Post and cascade are removed inside the same critical section.
        tables.posts.remove(index);
        tables.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }

    async fn list_comments(&self, post_id: u64) -> Vec<Comment> {
        self.tables
            .lock()
            .expect("content tables lock poisoned")
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect()
    }

    async fn add_comment(
        &self,
        post_id: u64,
        content: String,
        requester: Option<&SessionIdentity>,
    ) -> Result<Comment, ApiError> {
        if content.trim().is_empty() {
            return Err(ApiError::Validation(
                "comment content is required".to_string(),
            ));
        }

        let author = match requester {
            Some(identity) => identity.username.clone(),
            None => ANONYMOUS_AUTHOR.to_string(),
        };

        // Parent existence is not checked here; a comment may reference a
        // post ID that was never assigned.
        let mut tables = self.tables.lock().expect("content tables lock poisoned");
        let id = tables.next_comment_id;
        tables.next_comment_id += 1;

        let comment = Comment {
            id,
            post_id,
            content: sanitize_markup(&content),
            author,
            created_at: Utc::now(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }
}
