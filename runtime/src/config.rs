//! Engine configuration.
//!
//! Built once at startup and shared read-only with the components that need it.
//! Settings come from code (`with_*` methods) or from the environment
//! ([`EngineConfig::from_env`]).

use chrono::Duration;
use strata_core::error::{ConfigError, ConfigResult};

/// Environment variable holding the engine name.
pub const ENV_NAME: &str = "STRATA_NAME";
/// Environment variable that turns the authorization gate off (`true`/`false`).
pub const ENV_AUTH_OFF: &str = "STRATA_AUTH_OFF";
/// Environment variable holding the session validity (for example `5m` or `1h30m`).
pub const ENV_SESSION_VALIDITY: &str = "STRATA_SESSION_VALIDITY";

/// Longest session validity accepted from a duration string.
pub const MAX_SESSION_VALIDITY_DAYS: i64 = 366;

/// Process-wide engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name of this engine instance, used in logs.
    pub name: String,

    /// Skip the authorization gate for every submission.
    ///
    /// Default: `false`
    pub auth_off: bool,

    /// Maximum age of a session, counted from its issue time.
    ///
    /// Default: 5 minutes
    pub session_validity: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "strata".to_string(),
            auth_off: false,
            session_validity: Duration::minutes(5),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Turn the authorization gate on or off.
    #[must_use]
    pub const fn with_auth_off(mut self, auth_off: bool) -> Self {
        self.auth_off = auth_off;
        self
    }

    /// Set the session validity.
    #[must_use]
    pub const fn with_session_validity(mut self, validity: Duration) -> Self {
        self.session_validity = validity;
        self
    }

    /// Set the session validity from a duration string such as `"90s"` or `"1h30m"`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDuration`] if the string does not parse, is
    /// not positive or exceeds [`MAX_SESSION_VALIDITY_DAYS`].
    pub fn with_session_ttl(mut self, ttl: &str) -> ConfigResult<Self> {
        self.session_validity = parse_session_validity(ttl)?;
        Ok(self)
    }

    /// Load settings from the environment, reading a `.env` file first if present.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable is set to a value that cannot be
    /// interpreted.
    pub fn from_env() -> ConfigResult<Self> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through a lookup function instead of the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a setting cannot be interpreted.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_NAME).filter(|n| !n.trim().is_empty()) {
            config.name = name;
        }

        if let Some(raw) = lookup(ENV_AUTH_OFF) {
            config.auth_off = parse_flag(ENV_AUTH_OFF, &raw)?;
        }

        if let Some(raw) = lookup(ENV_SESSION_VALIDITY) {
            config.session_validity = parse_session_validity(&raw)?;
        }

        Ok(config)
    }
}

fn parse_flag(key: &str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidSetting {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_session_validity(raw: &str) -> ConfigResult<Duration> {
    let validity = parse_duration(raw)?;
    if validity <= Duration::zero() || validity > Duration::days(MAX_SESSION_VALIDITY_DAYS) {
        return Err(ConfigError::InvalidDuration(raw.to_string()));
    }
    Ok(validity)
}

/// Parse a duration written as a sequence of `<integer><unit>` parts.
///
/// Units are `ms`, `s`, `m` and `h`; parts add up, so `"1h30m"` is ninety minutes.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDuration`] on an empty string, a missing or unknown
/// unit, or overflow.
///
/// # Examples
///
/// ```
/// use strata_runtime::config::parse_duration;
/// use chrono::Duration;
///
/// assert_eq!(parse_duration("5m").unwrap(), Duration::minutes(5));
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::minutes(90));
/// assert!(parse_duration("5").is_err());
/// ```
pub fn parse_duration(input: &str) -> ConfigResult<Duration> {
    let invalid = || ConfigError::InvalidDuration(input.to_string());

    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::zero();
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(invalid());
        }
        let amount: i64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let part = match unit {
            "ms" => Duration::try_milliseconds(amount),
            "s" => Duration::try_seconds(amount),
            "m" => Duration::try_minutes(amount),
            "h" => Duration::try_hours(amount),
            _ => None,
        }
        .ok_or_else(invalid)?;

        total = total.checked_add(&part).ok_or_else(invalid)?;
    }

    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Panics: Test will fail if parsing fails
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.name, "strata");
        assert!(!config.auth_off);
        assert_eq!(config.session_validity, Duration::minutes(5));
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::milliseconds(250));
        assert_eq!(parse_duration("90s").unwrap(), Duration::seconds(90));
        assert_eq!(parse_duration("2h").unwrap(), Duration::hours(2));
        assert_eq!(
            parse_duration("1h2m3s").unwrap(),
            Duration::seconds(3600 + 120 + 3)
        );
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        for input in ["", "m", "5", "5x", "1.5h", "-5m", "5m-"] {
            assert_eq!(
                parse_duration(input),
                Err(ConfigError::InvalidDuration(input.to_string())),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn from_lookup_reads_every_setting() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            (ENV_NAME, "orders"),
            (ENV_AUTH_OFF, "true"),
            (ENV_SESSION_VALIDITY, "1h"),
        ]))
        .unwrap();

        assert_eq!(config.name, "orders");
        assert!(config.auth_off);
        assert_eq!(config.session_validity, Duration::hours(1));
    }

    #[test]
    fn from_lookup_keeps_defaults_for_unset_values() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn invalid_settings_are_configuration_errors() {
        let result = EngineConfig::from_lookup(lookup_from(&[(ENV_AUTH_OFF, "maybe")]));
        assert!(matches!(result, Err(ConfigError::InvalidSetting { .. })));

        let result = EngineConfig::from_lookup(lookup_from(&[(ENV_SESSION_VALIDITY, "0s")]));
        assert_eq!(result, Err(ConfigError::InvalidDuration("0s".to_string())));

        assert!(EngineConfig::default().with_session_ttl("soon").is_err());
    }

    #[test]
    fn session_validity_is_bounded() {
        assert!(parse_duration("2400000000h").is_ok());
        assert_eq!(
            EngineConfig::default().with_session_ttl("2400000000h"),
            Err(ConfigError::InvalidDuration("2400000000h".to_string()))
        );

        let config = EngineConfig::default().with_session_ttl("8784h").unwrap();
        assert_eq!(config.session_validity, Duration::days(MAX_SESSION_VALIDITY_DAYS));
    }
}
