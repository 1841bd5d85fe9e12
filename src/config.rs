use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Session lifetime used when SESSION_TTL_SECS is not set: 24 hours.
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// AppConfig
///
/// The application's immutable configuration, loaded once at startup and
/// shared through the application state. Everything request handling needs
/// from the environment lives here; nothing reads `env::var` afterwards.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and cookie hardening.
    pub env: Env,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Directory accepted uploads are written into and served from.
    pub uploads_dir: PathBuf,
    // Session lifetime; expiry is checked lazily at resolve time.
    pub session_ttl: Duration,
    // Whether the session cookie carries the Secure attribute. Enabled
    // outside local mode, where the service sits behind TLS.
    pub secure_cookies: bool,
}

/// Env
///
/// Defines the runtime context, switching between development conveniences
/// (pretty logs, plain-HTTP cookies) and production behavior (JSON logs,
/// Secure cookies, fail-fast configuration).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Provides a safe, non-panicking AppConfig instance primarily used for
    /// test setup, without requiring any environment variables.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            uploads_dir: PathBuf::from("public/uploads"),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            secure_cookies: false,
        }
    }
}

impl AppConfig {
    /// The canonical function for initializing the configuration at startup.
    ///
    /// # Panics
    /// Panics if a value required for the current runtime environment is
    /// missing or malformed, so the process never starts half-configured.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let session_ttl = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .expect("FATAL: SESSION_TTL_SECS must be a whole number of seconds"),
            ),
            Err(_) => Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        };

        let uploads_dir = match env {
            // Production must say explicitly where uploaded bytes land.
            Env::Production => PathBuf::from(
                env::var("UPLOADS_DIR").expect("FATAL: UPLOADS_DIR required in production"),
            ),
            Env::Local => PathBuf::from(
                env::var("UPLOADS_DIR").unwrap_or_else(|_| "public/uploads".to_string()),
            ),
        };

        let secure_cookies = env == Env::Production;

        Self {
            env,
            bind_addr,
            uploads_dir,
            session_ttl,
            secure_cookies,
        }
    }
}
