use std::env;

/// Runtime configuration for the document pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to (default: "127.0.0.1:3000")
    pub bind_addr: String,

    /// Database URL for the status table (default: "sqlite://docindex.db?mode=rwc")
    pub database_url: String,

    /// Bucket namespace for uploaded blobs (default: "documents")
    pub blob_namespace: String,

    /// Base URL of the external processing service
    pub processing_base_url: String,

    /// Fixed bot identifier sent with every processing request
    pub processing_bot_id: String,

    /// Processor type: "pageindex" or "noop" (default: "pageindex")
    pub processor_type: String,

    /// Maximum upload size in bytes (default: 50 MB)
    pub max_file_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            database_url: "sqlite://docindex.db?mode=rwc".to_string(),
            blob_namespace: "documents".to_string(),
            processing_base_url: "http://127.0.0.1:8000".to_string(),
            processing_bot_id: "default-bot".to_string(),
            processor_type: "pageindex".to_string(),
            max_file_size: 50 * 1024 * 1024, // 50 MB
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(default.bind_addr),

            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),

            blob_namespace: env::var("BLOB_NAMESPACE").unwrap_or(default.blob_namespace),

            processing_base_url: env::var("PROCESSING_BASE_URL")
                .unwrap_or(default.processing_base_url),

            processing_bot_id: env::var("PROCESSING_BOT_ID").unwrap_or(default.processing_bot_id),

            processor_type: env::var("PROCESSOR_TYPE").unwrap_or(default.processor_type),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),
        }
    }

    /// Create config for development (no external processing service)
    pub fn development() -> Self {
        Self {
            processor_type: "noop".to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.blob_namespace, "documents");
        assert_eq!(config.processor_type, "pageindex");
        assert_eq!(config.max_file_size, 50 * 1024 * 1024);
    }

    #[test]
    fn test_development_config() {
        let config = Config::development();
        assert_eq!(config.processor_type, "noop");
        assert_eq!(config.blob_namespace, "documents");
    }
}
