use std::env;

/// Runtime configuration for the entry service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum multipart request size in bytes (default: 512 MB)
    pub max_request_size: usize,

    /// Per-user storage ceiling in bytes (default: 2 GiB)
    pub storage_quota_bytes: i64,

    /// Plan tier recorded on usage rows (default: "free")
    pub storage_plan: String,

    /// How long a submission token blocks a replay, in seconds (default: 600)
    pub submission_window_secs: i64,

    /// Cadence of the submission token sweep, in seconds (default: 600)
    pub dedup_sweep_interval_secs: u64,

    /// Window for the title/description duplicate check, in seconds (default: 30)
    pub near_duplicate_window_secs: i64,

    /// Number of recent entries inspected by the duplicate check (default: 5)
    pub near_duplicate_lookback: u64,

    /// JWT Secret Key (Required)
    pub jwt_secret: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

pub const DEFAULT_STORAGE_QUOTA: i64 = 2 * 1024 * 1024 * 1024;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_request_size: 512 * 1024 * 1024, // 512 MB
            storage_quota_bytes: DEFAULT_STORAGE_QUOTA,
            storage_plan: "free".to_string(),
            submission_window_secs: 10 * 60,
            dedup_sweep_interval_secs: 10 * 60,
            near_duplicate_window_secs: 30,
            near_duplicate_lookback: 5,
            jwt_secret: "secret".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_request_size: env::var("MAX_REQUEST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_request_size),

            storage_quota_bytes: env::var("STORAGE_QUOTA_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v > 0)
                .unwrap_or(default.storage_quota_bytes),

            storage_plan: env::var("STORAGE_PLAN").unwrap_or(default.storage_plan),

            submission_window_secs: env::var("SUBMISSION_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.submission_window_secs),

            dedup_sweep_interval_secs: env::var("DEDUP_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &u64| *v > 0)
                .unwrap_or(default.dedup_sweep_interval_secs),

            near_duplicate_window_secs: env::var("NEAR_DUPLICATE_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.near_duplicate_window_secs),

            near_duplicate_lookback: env::var("NEAR_DUPLICATE_LOOKBACK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.near_duplicate_lookback),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development and tests (small request limit, fixed secret)
    pub fn development() -> Self {
        Self {
            max_request_size: 64 * 1024 * 1024,
            jwt_secret: "development-secret".to_string(),
            ..Self::default()
        }
    }

    pub fn submission_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.submission_window_secs)
    }

    pub fn near_duplicate_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.near_duplicate_window_secs)
    }
}
