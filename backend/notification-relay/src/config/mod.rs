use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub websocket: WebSocketConfig,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
}

/// Session transport tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    /// How often the server pings each socket
    pub heartbeat_interval_secs: u64,
    /// Silence after which a socket is considered dead
    pub client_timeout_secs: u64,
    /// Largest accepted inbound frame
    pub max_frame_bytes: usize,
}

impl WebSocketConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 5,
            client_timeout_secs: 30,
            max_frame_bytes: 256_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!("unknown LOG_FORMAT: {other}"))),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        // .env is optional
        let _ = dotenvy::dotenv();

        let defaults = WebSocketConfig::default();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                host: env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("APP_PORT", 8000)?,
            },
            websocket: WebSocketConfig {
                heartbeat_interval_secs: parse_var(
                    "WS_HEARTBEAT_INTERVAL_SECS",
                    defaults.heartbeat_interval_secs,
                )?,
                client_timeout_secs: parse_var(
                    "WS_CLIENT_TIMEOUT_SECS",
                    defaults.client_timeout_secs,
                )?,
                max_frame_bytes: parse_var("WS_MAX_FRAME_BYTES", defaults.max_frame_bytes)?,
            },
            log_format: match env::var("LOG_FORMAT") {
                Ok(v) => v.parse()?,
                Err(_) => LogFormat::Text,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.websocket.heartbeat_interval_secs == 0 {
            return Err(AppError::Config(
                "WS_HEARTBEAT_INTERVAL_SECS must be positive".to_string(),
            ));
        }
        if self.websocket.client_timeout_secs <= self.websocket.heartbeat_interval_secs {
            return Err(AppError::Config(
                "WS_CLIENT_TIMEOUT_SECS must exceed the heartbeat interval".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                env: "development".to_string(),
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            websocket: WebSocketConfig::default(),
            log_format: LogFormat::Text,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.websocket.heartbeat_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_must_exceed_heartbeat() {
        let mut config = Config::default();
        config.websocket.client_timeout_secs = 5;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
