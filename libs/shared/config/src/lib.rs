use std::env;
use tracing::warn;

pub const DEFAULT_MESSAGE_DELAY_MS: u64 = 600;
pub const DEFAULT_AUTO_CLOSE_SECS: u64 = 5;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub booking_api_url: String,
    pub message_delay_ms: u64,
    pub auto_close_secs: u64,
    pub clinic_utc_offset_minutes: i32,
    /// Idle time after which an abandoned booking session is evicted.
    pub session_ttl_secs: u64,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            booking_api_url: String::new(),
            message_delay_ms: DEFAULT_MESSAGE_DELAY_MS,
            auto_close_secs: DEFAULT_AUTO_CLOSE_SECS,
            clinic_utc_offset_minutes: 0,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            booking_api_url: env::var("BOOKING_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("BOOKING_API_URL not set, using empty value");
                    String::new()
                }),
            message_delay_ms: parse_or_default("BOOKING_MESSAGE_DELAY_MS", DEFAULT_MESSAGE_DELAY_MS),
            auto_close_secs: parse_or_default("BOOKING_AUTO_CLOSE_SECS", DEFAULT_AUTO_CLOSE_SECS),
            clinic_utc_offset_minutes: parse_or_default("CLINIC_UTC_OFFSET_MINUTES", 0),
            session_ttl_secs: parse_or_default("BOOKING_SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS),
            port: parse_or_default("PORT", DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.booking_api_url.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_not_configured() {
        let config = AppConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.message_delay_ms, 600);
        assert_eq!(config.auto_close_secs, 5);
        assert_eq!(config.session_ttl_secs, 1800);
    }

    #[test]
    fn test_configured_with_api_url() {
        let config = AppConfig {
            booking_api_url: "http://localhost:8000".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_configured());
    }
}
