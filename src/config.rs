//! Configuration types, read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot name for identification in logs.
    pub name: String,
    /// Port for the HTTP activity endpoint.
    pub http_port: u16,
    /// How long an HTTP request waits for the bot's reply.
    pub reply_timeout: Duration,
    /// Whether the stdin REPL channel is enabled.
    pub cli_enabled: bool,
    /// Directory for daily-rolling log files (stderr only when unset).
    pub log_dir: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "order-bot".to_string(),
            http_port: 3978,
            reply_timeout: Duration::from_secs(15),
            cli_enabled: true,
            log_dir: None,
        }
    }
}

impl BotConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Unset keys take their defaults; set but invalid values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let http_port = match lookup("ORDER_BOT_HTTP_PORT") {
            Some(v) => parse_value("ORDER_BOT_HTTP_PORT", &v)?,
            None => defaults.http_port,
        };

        let reply_timeout = match lookup("ORDER_BOT_REPLY_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_value("ORDER_BOT_REPLY_TIMEOUT_SECS", &v)?),
            None => defaults.reply_timeout,
        };

        let cli_enabled = match lookup("ORDER_BOT_CLI") {
            Some(v) => parse_flag("ORDER_BOT_CLI", &v)?,
            None => defaults.cli_enabled,
        };

        let log_dir = lookup("ORDER_BOT_LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            http_port,
            reply_timeout,
            cli_enabled,
            log_dir,
            ..defaults
        })
    }
}

/// Telegram channel configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    /// Usernames or numeric ids allowed to talk to the bot; `*` allows everyone.
    pub allowed_users: Vec<String>,
}

impl TelegramConfig {
    /// `None` when `TELEGRAM_BOT_TOKEN` is not set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty())?;

        let allowed_users: Vec<String> = lookup("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Some(Self {
            bot_token: SecretString::from(token),
            allowed_users,
        })
    }

    /// Human-readable allow-list for startup output.
    pub fn allowed_summary(&self) -> String {
        if self.allowed_users.iter().any(|u| u == "*") {
            "everyone".to_string()
        } else if self.allowed_users.is_empty() {
            "none (deny all)".to_string()
        } else {
            self.allowed_users.join(", ")
        }
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value:?}: {e}"),
        })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}
