use serde::{Deserialize, Deserializer, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::queue::SendOptions;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// Status server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Job queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Queue database location (`DATABASE_URL`). A plain path or a `sqlite:` URL.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Idle delay between polls of an empty queue.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// An active job older than this is handed out again.
    #[serde(default = "default_expire_in")]
    pub expire_in_secs: u64,
    /// Retry policy attached to "download ready" jobs when they are sent.
    #[serde(default = "default_confirmation_retry")]
    pub confirmation_retry: SendOptions,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            poll_interval_ms: default_poll_interval(),
            expire_in_secs: default_expire_in(),
            confirmation_retry: default_confirmation_retry(),
        }
    }
}

impl QueueConfig {
    /// Filesystem path of the queue database, with any `sqlite:` scheme stripped.
    pub fn database_path(&self) -> PathBuf {
        let url = self.database_url.as_str();
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        PathBuf::from(path)
    }
}

fn default_database_url() -> String {
    "fulfillment-queue.db".to_string()
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_expire_in() -> u64 {
    15 * 60
}

fn default_confirmation_retry() -> SendOptions {
    SendOptions {
        retry_limit: 3,
        retry_delay_secs: 30,
        retry_backoff: true,
    }
}

/// S3-compatible object storage (Cloudflare R2)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default, deserialize_with = "lenient_string")]
    pub account_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub access_key_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub secret_access_key: String,
    #[serde(default)]
    pub endpoint: String,
    /// Bucket holding the source PDFs.
    #[serde(default = "default_bucket_name")]
    pub bucket_name: String,
    /// Bucket receiving the watermarked archives.
    #[serde(default = "default_orders_bucket")]
    pub orders_bucket: String,
    /// Validity of the download link handed to the customer.
    #[serde(default = "default_url_expiry")]
    pub url_expiry_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            endpoint: String::new(),
            bucket_name: default_bucket_name(),
            orders_bucket: default_orders_bucket(),
            url_expiry_secs: default_url_expiry(),
        }
    }
}

fn default_bucket_name() -> String {
    "comics".to_string()
}

fn default_orders_bucket() -> String {
    "orders".to_string()
}

fn default_url_expiry() -> u64 {
    24 * 60 * 60
}

/// Watermarking service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatermarkConfig {
    /// Base URL (`API_URL`); requests go to `{url}/api/watermark`.
    #[serde(default = "default_watermark_url")]
    pub url: String,
    /// Request timeout in seconds (0 disables the timeout)
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            url: default_watermark_url(),
            timeout_secs: 0,
        }
    }
}

fn default_watermark_url() -> String {
    "http://localhost:1234".to_string()
}

/// Transactional email provider (Resend)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default, deserialize_with = "lenient_string")]
    pub api_key: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_email_api_url")]
    pub api_url: String,
    #[serde(default = "default_email_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from_email: default_from_email(),
            api_url: default_email_api_url(),
            timeout_secs: default_email_timeout(),
        }
    }
}

fn default_from_email() -> String {
    "hola@garagecomics.mx".to_string()
}

fn default_email_api_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_email_timeout() -> u64 {
    30
}

/// Local scratch space for in-flight files
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,
    /// Files older than this are removed by the startup sweep.
    #[serde(default = "default_max_file_age")]
    pub max_file_age_secs: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            tmp_dir: default_tmp_dir(),
            max_file_age_secs: default_max_file_age(),
        }
    }
}

fn default_tmp_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_max_file_age() -> u64 {
    60 * 60
}

/// Accepts a string or a bare number, for config files that write numeric
/// account ids unquoted.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Str(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Str(s) => s,
        Lenient::Unsigned(n) => n.to_string(),
        Lenient::Signed(n) => n.to_string(),
    })
}

/// Sanitized config for logs and the status API (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub queue: QueueConfig,
    pub storage: SanitizedStorageConfig,
    pub watermark: WatermarkConfig,
    pub email: SanitizedEmailConfig,
    pub workspace: WorkspaceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    pub endpoint: String,
    pub bucket_name: String,
    pub orders_bucket: String,
    pub url_expiry_secs: u64,
    pub credentials_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEmailConfig {
    pub from_email: String,
    pub api_url: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            queue: config.queue.clone(),
            storage: SanitizedStorageConfig {
                endpoint: config.storage.endpoint.clone(),
                bucket_name: config.storage.bucket_name.clone(),
                orders_bucket: config.storage.orders_bucket.clone(),
                url_expiry_secs: config.storage.url_expiry_secs,
                credentials_configured: !config.storage.access_key_id.is_empty()
                    && !config.storage.secret_access_key.is_empty(),
            },
            watermark: config.watermark.clone(),
            email: SanitizedEmailConfig {
                from_email: config.email.from_email.clone(),
                api_url: config.email.api_url.clone(),
                api_key_configured: !config.email.api_key.is_empty(),
            },
            workspace: config.workspace.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.bucket_name, "comics");
        assert_eq!(config.storage.orders_bucket, "orders");
        assert_eq!(config.storage.url_expiry_secs, 86_400);
        assert_eq!(config.watermark.url, "http://localhost:1234");
        assert_eq!(config.email.from_email, "hola@garagecomics.mx");
        assert_eq!(config.workspace.max_file_age_secs, 3600);
        assert_eq!(config.queue.confirmation_retry.retry_limit, 3);
        assert!(config.queue.confirmation_retry.retry_backoff);
    }

    #[test]
    fn test_deserialize_storage_section() {
        let toml = r#"
[storage]
account_id = "acc"
access_key_id = "key"
secret_access_key = "secret"
endpoint = "https://acc.r2.cloudflarestorage.com"
bucket_name = "pdfs"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.storage.account_id, "acc");
        assert_eq!(config.storage.bucket_name, "pdfs");
        assert_eq!(config.storage.orders_bucket, "orders");
    }

    #[test]
    fn test_numeric_credentials_are_accepted() {
        let toml = r#"
[storage]
account_id = 123456
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.storage.account_id, "123456");
    }

    #[test]
    fn test_database_path_strips_sqlite_scheme() {
        let mut queue = QueueConfig::default();
        assert_eq!(queue.database_path(), PathBuf::from("fulfillment-queue.db"));

        queue.database_url = "sqlite:///var/lib/worker/queue.db".to_string();
        assert_eq!(queue.database_path(), PathBuf::from("/var/lib/worker/queue.db"));

        queue.database_url = "sqlite:queue.db".to_string();
        assert_eq!(queue.database_path(), PathBuf::from("queue.db"));
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let mut config = Config::default();
        config.storage.access_key_id = "AKIA".to_string();
        config.storage.secret_access_key = "very-secret".to_string();
        config.email.api_key = "re_123".to_string();

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.storage.credentials_configured);
        assert!(sanitized.email.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("very-secret"));
        assert!(!json.contains("re_123"));
    }
}
