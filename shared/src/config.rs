use std::env;
use std::path::PathBuf;

const DEFAULT_DATA_PATH: &str = "data/workbook.json";
const DEFAULT_SESSION_SECRET: &str = "dev-session-secret-change-me";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Runtime configuration, read once at cold start
#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    pub allowed_origin: String,
}

impl Config {
    pub fn from_env() -> Self {
        let data_path = env::var("DATA_PATH").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());

        let session_secret = env::var("SESSION_SECRET").unwrap_or_else(|_| {
            tracing::warn!("SESSION_SECRET not set; using development secret");
            DEFAULT_SESSION_SECRET.to_string()
        });

        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    tracing::warn!(
                        "Invalid SESSION_TTL_HOURS value {:?}, using {}",
                        raw,
                        DEFAULT_SESSION_TTL_HOURS
                    );
                    DEFAULT_SESSION_TTL_HOURS
                }
            },
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let allowed_origin = env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "*".to_string());

        Self {
            data_path: PathBuf::from(data_path),
            session_secret,
            session_ttl_hours,
            cookie_secure,
            allowed_origin,
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            cookie_secure: false,
            allowed_origin: "*".to_string(),
        }
    }
}
