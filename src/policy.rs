//! Authorization rules, stated once as pure decision functions.
//!
//! Nothing here touches state: callers resolve the identity first (session
//! layer) and apply the effect afterwards (content store, upload gate).

use crate::models::{Post, Role, SessionIdentity};

/// A post may be deleted by its original author or by any admin.
pub fn can_delete(post: &Post, requester: &SessionIdentity) -> bool {
    requester.role == Role::Admin || requester.username == post.author
}

/// Creating a post requires a session; the role is irrelevant.
pub fn can_create_post(requester: Option<&SessionIdentity>) -> bool {
    requester.is_some()
}

/// Uploading an asset follows the same rule as post creation.
pub fn can_upload(requester: Option<&SessionIdentity>) -> bool {
    can_create_post(requester)
}
