//! Process configuration, loaded once from the environment.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default maximum accepted file size: 50 MiB.
const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default webhook listen port.
const DEFAULT_PORT: u16 = 8000;

/// Runtime configuration.
///
/// `BOT_TOKEN` and `PUBLIC_URL` are mandatory; everything else has a default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token.
    pub bot_token: SecretString,
    /// Public HTTPS base URL the webhook is registered under.
    pub public_url: String,
    /// Local port the webhook server listens on.
    pub port: u16,
    /// Maximum accepted upload size in bytes, enforced before download.
    pub max_file_size: u64,
    /// Directory for in-flight files and conversion outputs.
    pub temp_dir: PathBuf,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = lookup("BOT_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing { name: "BOT_TOKEN" })?;

        let public_url = lookup("PUBLIC_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing { name: "PUBLIC_URL" })?
            .trim_end_matches('/')
            .to_string();

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let max_file_size = match lookup("MAX_FILE_SIZE") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                name: "MAX_FILE_SIZE",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_MAX_FILE_SIZE,
        };

        let temp_dir = match lookup("TEMP_DIR") {
            Some(raw) => PathBuf::from(raw),
            None => std::env::temp_dir().join("filewright"),
        };

        Ok(Self {
            bot_token: bot_token.into(),
            public_url,
            port,
            max_file_size,
            temp_dir,
        })
    }

    /// Size limit in whole mebibytes, for user-facing prompts.
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / 1024 / 1024
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn loads_with_defaults() {
        let env = vars(&[("BOT_TOKEN", "123:abc"), ("PUBLIC_URL", "https://bot.example")]);
        let config = Config::from_vars(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.public_url, "https://bot.example");
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.max_file_size_mb(), 50);
    }

    #[test]
    fn missing_token_is_fatal() {
        let env = vars(&[("PUBLIC_URL", "https://bot.example")]);
        let err = Config::from_vars(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: "BOT_TOKEN" }));
    }

    #[test]
    fn missing_public_url_is_fatal() {
        let env = vars(&[("BOT_TOKEN", "123:abc")]);
        let err = Config::from_vars(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: "PUBLIC_URL" }));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let env = vars(&[("BOT_TOKEN", "t"), ("PUBLIC_URL", "https://bot.example/")]);
        let config = Config::from_vars(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.public_url, "https://bot.example");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let env = vars(&[
            ("BOT_TOKEN", "t"),
            ("PUBLIC_URL", "https://bot.example"),
            ("PORT", "not-a-port"),
        ]);
        let err = Config::from_vars(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}
