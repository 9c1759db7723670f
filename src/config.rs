use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use crate::error::ConfigError;

/// Default location of the YAML configuration file
pub const DEFAULT_CONFIG_FILE: &str = "config/ban_pruner.yaml";
/// Environment variable that points at an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "BAN_PRUNER_CONFIG";

const USERNAME_ENV: &str = "BAN_PRUNER_USERNAME";
const PASSWORD_ENV: &str = "BAN_PRUNER_PASSWORD";
const CLIENT_ID_ENV: &str = "BAN_PRUNER_CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "BAN_PRUNER_CLIENT_SECRET";

/// Bot configuration.
///
/// Every field has a default so a partial YAML file is enough.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    // Account the bot logs in as
    pub username: String,
    pub password: String,
    // OAuth "script" application credentials
    pub client_id: String,
    pub client_secret: String,
    // Overrides the derived `/u/<username> running ban_pruner` user agent
    pub user_agent: Option<String>,
    // Root for summary files written to disk
    pub base_dir: PathBuf,
    // JSON cache of usernames confirmed gone; defaults to `<base_dir>/cache.file`
    pub cache_file: Option<PathBuf>,
    // Delay before every existence probe, in seconds
    pub sleep_base_secs: u64,
    // Added to the delay after each connection failure
    pub sleep_step_secs: u64,
    // Upper bound on the probe delay
    pub max_sleep_secs: u64,
    // Above this many pruned users the summary goes to a wiki page
    pub summary_threshold: usize,
    pub api_base: String,
    pub auth_url: String,
    // Must contain `{username}`
    pub probe_url_template: String,
    pub log_dir: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            username: "someuser".to_string(),
            password: "somepass".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            user_agent: None,
            base_dir: PathBuf::from("/some/path/"),
            cache_file: None,
            sleep_base_secs: 2,
            sleep_step_secs: 2,
            max_sleep_secs: 60,
            summary_threshold: 200,
            api_base: "https://oauth.reddit.com".to_string(),
            auth_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            probe_url_template: "https://www.reddit.com/user/{username}/?limit=1".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl BotConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// A missing file falls back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file exists but cannot be read or
    /// parsed, or if the resulting configuration fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => {
                serde_yaml::from_str::<Self>(&content).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Config file named by `BAN_PRUNER_CONFIG`, or the default path
    #[must_use]
    pub fn config_path() -> PathBuf {
        env::var(CONFIG_PATH_ENV)
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(username) = env::var(USERNAME_ENV) {
            self.username = username;
        }
        if let Ok(password) = env::var(PASSWORD_ENV) {
            self.password = password;
        }
        if let Ok(client_id) = env::var(CLIENT_ID_ENV) {
            self.client_id = client_id;
        }
        if let Ok(client_secret) = env::var(CLIENT_SECRET_ENV) {
            self.client_secret = client_secret;
        }
    }

    /// Check the configuration for values the bot cannot run with
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.trim().is_empty() {
            return Err(ConfigError::Invalid("username is empty".to_string()));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Invalid("password is empty".to_string()));
        }
        if self.summary_threshold == 0 {
            return Err(ConfigError::Invalid(
                "summary_threshold must be greater than zero".to_string(),
            ));
        }
        if !self.probe_url_template.contains("{username}") {
            return Err(ConfigError::Invalid(
                "probe_url_template must contain {username}".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("/u/{} running ban_pruner", self.username))
    }

    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.cache_file
            .clone()
            .unwrap_or_else(|| self.base_dir.join("cache.file"))
    }

    #[must_use]
    pub fn sleep_base(&self) -> Duration {
        Duration::from_secs(self.sleep_base_secs)
    }

    #[must_use]
    pub fn sleep_step(&self) -> Duration {
        Duration::from_secs(self.sleep_step_secs)
    }

    #[must_use]
    pub fn max_sleep(&self) -> Duration {
        Duration::from_secs(self.max_sleep_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = BotConfig::default();
        assert_eq!(config.username, "someuser");
        assert_eq!(config.summary_threshold, 200);
        assert_eq!(config.sleep_base(), Duration::from_secs(2));
        assert_eq!(config.cache_path(), PathBuf::from("/some/path/cache.file"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_user_agent() {
        let config = BotConfig {
            username: "prunebot".to_string(),
            ..Default::default()
        };
        assert_eq!(config.user_agent(), "/u/prunebot running ban_pruner");

        let config = BotConfig {
            user_agent: Some("custom agent".to_string()),
            ..Default::default()
        };
        assert_eq!(config.user_agent(), "custom agent");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "username: prunebot\npassword: hunter2\nsummary_threshold: 50\n";
        let config: BotConfig = serde_yaml::from_str(yaml).expect("Failed to deserialize");
        assert_eq!(config.username, "prunebot");
        assert_eq!(config.summary_threshold, 50);
        assert_eq!(config.sleep_base_secs, 2);
        assert_eq!(config.api_base, "https://oauth.reddit.com");
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "cache_file: /tmp/pruner-cache.json\nmax_sleep_secs: 30")
            .expect("Failed to write config");

        let config = BotConfig::load(file.path()).expect("Failed to load config");
        assert_eq!(config.cache_path(), PathBuf::from("/tmp/pruner-cache.json"));
        assert_eq!(config.max_sleep(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "summary_threshold: [not, a, number]").expect("Failed to write config");

        let result = BotConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate() {
        let config = BotConfig {
            username: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = BotConfig {
            summary_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BotConfig {
            probe_url_template: "https://example.com/user".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
