use std::env;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the admin REST backend
    pub api_url: String,
    /// Pre-issued bearer token; takes precedence over the login pair
    pub admin_token: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// How often the polling change feed re-lists a kind
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Buffered change events per subscription before the feed waits
    pub feed_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            api_url: env::var("ADMIN_API_URL").map_err(|_| ConfigError::Missing("ADMIN_API_URL"))?,
            admin_token: non_empty(env::var("ADMIN_TOKEN").ok()),
            admin_email: non_empty(env::var("ADMIN_EMAIL").ok()),
            admin_password: non_empty(env::var("ADMIN_PASSWORD").ok()),
            poll_interval: parse_secs("ADMIN_POLL_INTERVAL_SECS", 5)?,
            request_timeout: parse_secs("ADMIN_REQUEST_TIMEOUT_SECS", 30)?,
            feed_capacity: parse_var("ADMIN_FEED_CAPACITY", 256)?,
        })
    }

    /// Check if a login pair is configured
    pub fn login_enabled(&self) -> bool {
        self.admin_email.is_some() && self.admin_password.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Whole seconds, at least one
fn parse_secs(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match parse_var(name, default)? {
        0 => Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_uses_default_when_unset() {
        let value: u64 = parse_var("FOODDASH_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_var_rejects_garbage() {
        env::set_var("FOODDASH_TEST_BAD_NUMBER", "five");
        let result: Result<u64, _> = parse_var("FOODDASH_TEST_BAD_NUMBER", 5);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "FOODDASH_TEST_BAD_NUMBER", .. })
        ));
    }

    #[test]
    fn non_empty_drops_blank_values() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some("tok".to_string())), Some("tok".to_string()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn parse_secs_rejects_zero() {
        env::set_var("FOODDASH_TEST_ZERO_SECS", "0");
        assert!(matches!(
            parse_secs("FOODDASH_TEST_ZERO_SECS", 5),
            Err(ConfigError::Invalid { name: "FOODDASH_TEST_ZERO_SECS", .. })
        ));
    }

    #[test]
    fn parse_secs_reads_whole_seconds() {
        env::set_var("FOODDASH_TEST_SOME_SECS", " 7 ");
        assert_eq!(
            parse_secs("FOODDASH_TEST_SOME_SECS", 5).unwrap(),
            Duration::from_secs(7)
        );
        assert_eq!(
            parse_secs("FOODDASH_TEST_UNSET_SECS", 5).unwrap(),
            Duration::from_secs(5)
        );
    }
}
