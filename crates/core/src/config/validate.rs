use super::{types::Config, ConfigError};

/// Longest validity S3-compatible stores accept for a presigned URL.
const MAX_URL_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// Validate configuration
///
/// Required deployment variables are checked first, in a fixed order, so the
/// first missing one is reported by name.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let required = [
        ("R2_ACCOUNT_ID", &config.storage.account_id),
        ("R2_ACCESS_KEY_ID", &config.storage.access_key_id),
        ("R2_SECRET_ACCESS_KEY", &config.storage.secret_access_key),
        ("R2_ENDPOINT", &config.storage.endpoint),
        ("RESEND_API_KEY", &config.email.api_key),
    ];
    for (var, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingVariable(var));
        }
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let database_url = config.queue.database_url.trim();
    if database_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "queue.database_url cannot be empty".to_string(),
        ));
    }
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        return Err(ConfigError::ValidationError(
            "DATABASE_URL must point to a SQLite database file".to_string(),
        ));
    }

    if config.queue.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "queue.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    if config.storage.url_expiry_secs == 0 || config.storage.url_expiry_secs > MAX_URL_EXPIRY_SECS
    {
        return Err(ConfigError::ValidationError(format!(
            "storage.url_expiry_secs must be between 1 and {}",
            MAX_URL_EXPIRY_SECS
        )));
    }

    reqwest::Url::parse(&config.watermark.url).map_err(|e| {
        ConfigError::ValidationError(format!("watermark.url is not a valid URL: {}", e))
    })?;

    reqwest::Url::parse(&config.storage.endpoint).map_err(|e| {
        ConfigError::ValidationError(format!("R2_ENDPOINT is not a valid URL: {}", e))
    })?;

    Ok(())
}
