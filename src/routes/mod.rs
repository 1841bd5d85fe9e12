/// Router Module Index
///
/// Splits the route table by the access level each endpoint demands, so the
/// session requirement is applied once at the module boundary instead of
/// being re-stated handler by handler.

/// Routes open to anonymous clients: reads, the login/logout pair, and
/// comment creation (where anonymity only changes the recorded author).
pub mod public;

/// Routes behind the session middleware: post creation, post deletion, and
/// uploads. A request without a live session is rejected before the handler
/// runs.
pub mod authenticated;
