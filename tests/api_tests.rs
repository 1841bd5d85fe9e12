use blog_portal::{
    AppConfig, AppState, InMemoryRepository, create_router,
    auth::{IdentityState, IdentityStore, SessionManager, SessionState},
    models::{Comment, CurrentUserResponse, LoginResponse, Post, Role, UploadResponse},
    repository::RepositoryState,
    storage::{LocalUploadStore, UploadState},
};
use reqwest::header;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

async fn spawn_app() -> TestApp {
    // Every test server writes uploads into its own scratch directory so
    // parallel tests never collide.
    let uploads_dir = std::env::temp_dir().join(format!(
        "blog-portal-test-{}",
        Uuid::new_v4().simple()
    ));
    let upload_store = LocalUploadStore::new(&uploads_dir);
    upload_store
        .ensure_root_exists()
        .await
        .expect("Failed to create the test uploads dir");

    let config = AppConfig {
        uploads_dir,
        ..AppConfig::default()
    };

    let state = AppState {
        identity: Arc::new(IdentityStore::seeded()) as IdentityState,
        sessions: Arc::new(SessionManager::new(config.session_ttl)) as SessionState,
        repo: Arc::new(InMemoryRepository::new()) as RepositoryState,
        uploads: Arc::new(upload_store) as UploadState,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

/// Logs in and returns the `session_id=<token>` pair to send back as the
/// Cookie header on subsequent requests.
async fn login(client: &reqwest::Client, address: &str, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{address}/api/login"))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(response.status(), 200);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set a session cookie")
        .to_str()
        .unwrap()
        .to_string();
    set_cookie.split(';').next().unwrap().trim().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_login_sets_cookie_and_returns_user_summary() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/login", app.address))
        .json(&serde_json::json!({ "username": "admin", "password": "admin123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("missing session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("session_id="));
    assert!(set_cookie.contains("HttpOnly"));

    let body: LoginResponse = response.json().await.unwrap();
    assert_eq!(body.user.username, "admin");
    assert_eq!(body.user.role, Role::Admin);
}

#[tokio::test]
async fn test_login_failure_is_uniform() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Wrong password for a real user vs. a user that does not exist: both
    // must be 401 with an identical body.
    let wrong_password = client
        .post(format!("{}/api/login", app.address))
        .json(&serde_json::json!({ "username": "admin", "password": "nope" }))
        .send()
        .await
        .unwrap();
    let unknown_user = client
        .post(format!("{}/api/login", app.address))
        .json(&serde_json::json!({ "username": "ghost", "password": "nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), 401);
    assert_eq!(unknown_user.status(), 401);
    let body_a = wrong_password.text().await.unwrap();
    let body_b = unknown_user.text().await.unwrap();
    assert_eq!(body_a, body_b);
}

#[tokio::test]
async fn test_current_user_requires_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let anonymous = client
        .get(format!("{}/api/user", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), 401);

    let cookie = login(&client, &app.address, "user", "user123").await;
    let response = client
        .get(format!("{}/api/user", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: CurrentUserResponse = response.json().await.unwrap();
    assert_eq!(body.user.username, "user");
    assert_eq!(body.user.role, Role::Member);
}

#[tokio::test]
async fn test_post_lifecycle_with_comment_cascade() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &app.address, "admin", "admin123").await;

    // Create two posts.
    let created = client
        .post(format!("{}/api/posts", app.address))
        .header(header::COOKIE, &cookie)
        .json(&serde_json::json!({ "title": "First", "content": "Hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let first: Post = created.json().await.unwrap();
    let second: Post = client
        .post(format!("{}/api/posts", app.address))
        .header(header::COOKIE, &cookie)
        .json(&serde_json::json!({ "title": "Second", "content": "World" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // One comment on each.
    for post in [&first, &second] {
        let response = client
            .post(format!("{}/api/posts/{}/comments", app.address, post.id))
            .json(&serde_json::json!({ "content": "A comment" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }

    // Delete the first post; its comment must go with it.
    let response = client
        .delete(format!("{}/api/posts/{}", app.address, first.id))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let missing = client
        .get(format!("{}/api/posts/{}", app.address, first.id))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    let orphaned: Vec<Comment> = client
        .get(format!("{}/api/posts/{}/comments", app.address, first.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(orphaned.is_empty(), "cascade must remove the post's comments");

    // The second post and its comment are untouched.
    let kept: Vec<Comment> = client
        .get(format!("{}/api/posts/{}/comments", app.address, second.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(kept.len(), 1);

    let posts: Vec<Post> = client
        .get(format!("{}/api/posts", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, second.id);
}

#[tokio::test]
async fn test_create_post_requires_session_and_fields() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let anonymous = client
        .post(format!("{}/api/posts", app.address))
        .json(&serde_json::json!({ "title": "T", "content": "C" }))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), 401);

    let cookie = login(&client, &app.address, "user", "user123").await;
    let missing_content = client
        .post(format!("{}/api/posts", app.address))
        .header(header::COOKIE, &cookie)
        .json(&serde_json::json!({ "title": "T" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_content.status(), 400);
}

#[tokio::test]
async fn test_stored_markup_is_escaped() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &app.address, "user", "user123").await;

    let post: Post = client
        .post(format!("{}/api/posts", app.address))
        .header(header::COOKIE, &cookie)
        .json(&serde_json::json!({
            "title": "XSS",
            "content": "<script>alert(1)</script>"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(post.content, "&lt;script&gt;alert(1)&lt;/script&gt;");

    // Read-back carries the escaped form too.
    let fetched: Post = client
        .get(format!("{}/api/posts/{}", app.address, post.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!fetched.content.contains('<'));

    let comment: Comment = client
        .post(format!("{}/api/posts/{}/comments", app.address, post.id))
        .json(&serde_json::json!({ "content": "<img src=x>" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comment.content, "&lt;img src=x&gt;");
}

#[tokio::test]
async fn test_comment_author_resolution() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &app.address, "admin", "admin123").await;

    let post: Post = client
        .post(format!("{}/api/posts", app.address))
        .header(header::COOKIE, &cookie)
        .json(&serde_json::json!({ "title": "T", "content": "C" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let anonymous: Comment = client
        .post(format!("{}/api/posts/{}/comments", app.address, post.id))
        .json(&serde_json::json!({ "content": "drive-by" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(anonymous.author, "anonymous");

    let named: Comment = client
        .post(format!("{}/api/posts/{}/comments", app.address, post.id))
        .header(header::COOKIE, &cookie)
        .json(&serde_json::json!({ "content": "signed" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(named.author, "admin");

    let empty = client
        .post(format!("{}/api/posts/{}/comments", app.address, post.id))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), 400);
}

#[tokio::test]
async fn test_delete_is_author_or_admin_only() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin_cookie = login(&client, &app.address, "admin", "admin123").await;
    let user_cookie = login(&client, &app.address, "user", "user123").await;

    let admins_post: Post = client
        .post(format!("{}/api/posts", app.address))
        .header(header::COOKIE, &admin_cookie)
        .json(&serde_json::json!({ "title": "Mine", "content": "Admin's" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // A member who is not the author is refused; the post survives.
    let forbidden = client
        .delete(format!("{}/api/posts/{}", app.address, admins_post.id))
        .header(header::COOKIE, &user_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);
    let still_there = client
        .get(format!("{}/api/posts/{}", app.address, admins_post.id))
        .send()
        .await
        .unwrap();
    assert_eq!(still_there.status(), 200);

    // The admin can remove anyone's post.
    let users_post: Post = client
        .post(format!("{}/api/posts", app.address))
        .header(header::COOKIE, &user_cookie)
        .json(&serde_json::json!({ "title": "Theirs", "content": "User's" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let admin_delete = client
        .delete(format!("{}/api/posts/{}", app.address, users_post.id))
        .header(header::COOKIE, &admin_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(admin_delete.status(), 200);

    // Deleting a post that never existed is a 404.
    let missing = client
        .delete(format!("{}/api/posts/9999", app.address))
        .header(header::COOKIE, &admin_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_logout_invalidates_the_session() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &app.address, "user", "user123").await;

    let logout = client
        .post(format!("{}/api/logout", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(logout.status(), 200);

    // The old token must stay dead for every subsequent call.
    let whoami = client
        .get(format!("{}/api/user", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(whoami.status(), 401);

    let create = client
        .post(format!("{}/api/posts", app.address))
        .header(header::COOKIE, &cookie)
        .json(&serde_json::json!({ "title": "T", "content": "C" }))
        .send()
        .await
        .unwrap();
    assert_eq!(create.status(), 401);

    // Logging out twice is fine.
    let again = client
        .post(format!("{}/api/logout", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 200);
}

#[tokio::test]
async fn test_upload_accepts_image_and_serves_it() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &app.address, "user", "user123").await;

    let payload = vec![0u8; 2 * 1024 * 1024];
    let part = reqwest::multipart::Part::bytes(payload.clone())
        .file_name("photo.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = client
        .post(format!("{}/api/upload", app.address))
        .header(header::COOKIE, &cookie)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: UploadResponse = response.json().await.unwrap();
    assert!(body.url.starts_with("/uploads/"));
    // The stored name is server-generated; the client's filename is ignored.
    assert!(!body.url.contains("photo"));

    // The returned reference resolves through the static-file route.
    let served = client
        .get(format!("{}{}", app.address, body.url))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status(), 200);
    let bytes = served.bytes().await.unwrap();
    assert_eq!(bytes.len(), payload.len());
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let cookie = login(&client, &app.address, "user", "user123").await;

    // Not an image.
    let part = reqwest::multipart::Part::bytes(b"hello".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);
    let wrong_type = client
        .post(format!("{}/api/upload", app.address))
        .header(header::COOKIE, &cookie)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_type.status(), 400);

    // Over the 10 MiB cap.
    let part = reqwest::multipart::Part::bytes(vec![0u8; 15 * 1024 * 1024])
        .file_name("huge.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);
    let too_large = client
        .post(format!("{}/api/upload", app.address))
        .header(header::COOKIE, &cookie)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(too_large.status(), 400);

    // No file field at all.
    let form = reqwest::multipart::Form::new().text("note", "no file here");
    let no_file = client
        .post(format!("{}/api/upload", app.address))
        .header(header::COOKIE, &cookie)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(no_file.status(), 400);

    // No session.
    let part = reqwest::multipart::Part::bytes(vec![0u8; 16])
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);
    let anonymous = client
        .post(format!("{}/api/upload", app.address))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), 401);
}
