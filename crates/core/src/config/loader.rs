use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "FULFILLMENT_CONFIG";

/// Prefix for overriding any other key, nested with `__`
/// (e.g. `FULFILLMENT_SERVER__PORT=9000`).
const ENV_PREFIX: &str = "FULFILLMENT_";

/// Deployment variables shared with the storefront, mapped onto config keys.
const DEPLOYMENT_ENV: &[(&str, &str)] = &[
    ("R2_ACCOUNT_ID", "storage.account_id"),
    ("R2_ACCESS_KEY_ID", "storage.access_key_id"),
    ("R2_SECRET_ACCESS_KEY", "storage.secret_access_key"),
    ("R2_ENDPOINT", "storage.endpoint"),
    ("R2_BUCKET_NAME", "storage.bucket_name"),
    ("API_URL", "watermark.url"),
    ("DATABASE_URL", "queue.database_url"),
    ("RESEND_API_KEY", "email.api_key"),
    ("FROM_EMAIL", "email.from_email"),
];

/// Deployment variables are taken verbatim. Credentials such as `007` or
/// `true` must not be reinterpreted as numbers or booleans.
fn deployment_env(figment: Figment) -> Figment {
    DEPLOYMENT_ENV
        .iter()
        .filter_map(|(var, path)| std::env::var(var).ok().map(|value| (*path, value)))
        .fold(figment, |figment, (path, value)| {
            figment.merge(Serialized::default(path, value))
        })
}

fn with_env(figment: Figment) -> Figment {
    deployment_env(figment).merge(Env::prefixed(ENV_PREFIX).ignore(&["CONFIG"]).split("__"))
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    with_env(Figment::new().merge(Toml::file(path)))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from the environment alone
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    with_env(Figment::new())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000

[watermark]
url = "http://watermark:8000"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.watermark.url, "http://watermark:8000");
    }

    #[test]
    fn test_load_config_from_str_invalid() {
        let result = load_config_from_str("[server]\nport = \"not-a-number\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/fulfillment.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_deployment_variables_are_mapped() {
        Jail::expect_with(|jail| {
            jail.set_env("R2_ACCOUNT_ID", "acc");
            jail.set_env("R2_ACCESS_KEY_ID", "key");
            jail.set_env("R2_SECRET_ACCESS_KEY", "secret");
            jail.set_env("R2_ENDPOINT", "https://acc.r2.cloudflarestorage.com");
            jail.set_env("API_URL", "http://watermark:8000");
            jail.set_env("RESEND_API_KEY", "re_test");
            jail.set_env("DATABASE_URL", "sqlite:queue.db");

            let config = load_config_from_env().unwrap();
            assert_eq!(config.storage.account_id, "acc");
            assert_eq!(config.storage.access_key_id, "key");
            assert_eq!(config.storage.secret_access_key, "secret");
            assert_eq!(config.storage.endpoint, "https://acc.r2.cloudflarestorage.com");
            assert_eq!(config.storage.bucket_name, "comics");
            assert_eq!(config.watermark.url, "http://watermark:8000");
            assert_eq!(config.email.api_key, "re_test");
            assert_eq!(config.queue.database_url, "sqlite:queue.db");
            Ok(())
        });
    }

    #[test]
    fn test_credentials_are_read_verbatim() {
        Jail::expect_with(|jail| {
            jail.set_env("R2_ACCOUNT_ID", "0042");
            jail.set_env("R2_ACCESS_KEY_ID", "007");
            jail.set_env("R2_SECRET_ACCESS_KEY", "true");
            jail.set_env("RESEND_API_KEY", "1e5");

            let config = load_config_from_env().unwrap();
            assert_eq!(config.storage.account_id, "0042");
            assert_eq!(config.storage.access_key_id, "007");
            assert_eq!(config.storage.secret_access_key, "true");
            assert_eq!(config.email.api_key, "1e5");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "fulfillment.toml",
                r#"
[server]
port = 3000

[storage]
bucket_name = "from-file"
"#,
            )?;
            jail.set_env("R2_BUCKET_NAME", "from-env");
            jail.set_env("FULFILLMENT_SERVER__PORT", "4000");

            let config = load_config(Path::new("fulfillment.toml")).unwrap();
            assert_eq!(config.storage.bucket_name, "from-env");
            assert_eq!(config.server.port, 4000);
            Ok(())
        });
    }
}
