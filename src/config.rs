use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub const DEFAULT_STORAGE_LIMIT: u64 = 5 * 1024 * 1024 * 1024; // 5 GiB
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Per-file upload ceiling in megabytes
    pub max_upload_mb: u64,
    /// Quota assigned to a profile on first sight, in bytes
    pub default_storage_limit: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// Base URL prepended to object keys for public links (local backend)
    pub public_url_base: Option<String>,
    /// GCS bucket name (required when backend is gcs)
    pub gcs_bucket: Option<String>,
    /// Path to GCS service account JSON (optional, defaults to ADC)
    pub gcs_credentials_file: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./files".to_string(),
            public_url_base: None,
            gcs_bucket: None,
            gcs_credentials_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_mb = std::env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB);

        let default_storage_limit = std::env::var("DEFAULT_STORAGE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_STORAGE_LIMIT);

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "gcs" => StorageBackend::Gcs,
            _ => StorageBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./files".to_string());

        let public_url_base = std::env::var("PUBLIC_URL_BASE").ok();
        let gcs_bucket = std::env::var("GCS_BUCKET").ok();
        let gcs_credentials_file = std::env::var("GCS_CREDENTIALS_FILE").ok();

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                backend: storage_backend,
                local_storage_path,
                public_url_base,
                gcs_bucket,
                gcs_credentials_file,
            },
            test_mode,
            max_upload_mb,
            default_storage_limit,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_mb == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_MB must be greater than 0".to_string(),
            ));
        }

        if matches!(self.storage.backend, StorageBackend::Gcs) && self.storage.gcs_bucket.is_none()
        {
            return Err(ConfigError::ValidationError(
                "GCS_BUCKET is required when STORAGE_BACKEND=gcs".to_string(),
            ));
        }

        Ok(())
    }

    /// Per-file upload ceiling in bytes
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }
}
