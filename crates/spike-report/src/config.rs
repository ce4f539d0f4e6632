//! Configuration for Spike reporting.
//!
//! Everything comes from environment variables (optionally seeded from a
//! `.env` file by the binary):
//!
//! - `SPIKE_API_KEY`: Spike API key (required)
//! - `SPIKE_API_URL`: API base URL (default `https://api.spike.sh`)
//! - `SPIKE_TIMEZONE`: display zone, IANA name or `+HH:MM` (default `Asia/Kolkata`)
//! - `SPIKE_LOOKUP_PAUSE_MS`: pause after each live user lookup (default 100)
//! - `SPIKE_HTTP_TIMEOUT_SECS`: HTTP request timeout (default 30)
//! - `TEAM_<NAME>=<team id>`: one entry per team to report on

use std::time::Duration;

use crate::error::{Result, SpikeError};
use crate::time::{DisplayZone, DEFAULT_ZONE};

/// Default Spike API base URL.
pub const DEFAULT_API_URL: &str = "https://api.spike.sh";

/// Default pause after a live user lookup.
pub const DEFAULT_LOOKUP_PAUSE_MS: u64 = 100;

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Prefix of per-team environment variables.
pub const TEAM_PREFIX: &str = "TEAM_";

const ENV_API_KEY: &str = "SPIKE_API_KEY";
const ENV_API_URL: &str = "SPIKE_API_URL";
const ENV_TIMEZONE: &str = "SPIKE_TIMEZONE";
const ENV_LOOKUP_PAUSE_MS: &str = "SPIKE_LOOKUP_PAUSE_MS";
const ENV_HTTP_TIMEOUT_SECS: &str = "SPIKE_HTTP_TIMEOUT_SECS";

/// A team to report on: display label plus the `x-team-id` credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamContext {
    /// Label shown in the report.
    pub name: String,
    /// Spike team id.
    pub id: String,
}

impl TeamContext {
    /// Create a team context.
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Spike API key.
    pub api_key: String,
    /// API base URL without trailing slash.
    pub api_url: String,
    /// Teams in report order.
    pub teams: Vec<TeamContext>,
    /// Zone used for every displayed timestamp.
    pub zone: DisplayZone,
    /// Pause after each live user lookup.
    pub lookup_pause: Duration,
    /// HTTP request timeout.
    pub http_timeout: Duration,
}

impl ReportConfig {
    /// Build the configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`SpikeError::Config`] when the API key or teams are missing,
    /// or a value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Build the configuration from an explicit set of variables.
    ///
    /// # Errors
    /// Same as [`ReportConfig::from_env`].
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::parse_vars(vars, true)
    }

    /// Build the configuration for account-level calls such as listing teams.
    ///
    /// Same as [`ReportConfig::from_vars`] except that `TEAM_*` variables are
    /// optional; `teams` may come back empty.
    ///
    /// # Errors
    /// Returns [`SpikeError::Config`] when the API key is missing or a value
    /// cannot be parsed.
    pub fn account_from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::parse_vars(vars, false)
    }

    fn parse_vars<I, K, V>(vars: I, require_teams: bool) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut api_key = None;
        let mut api_url = None;
        let mut zone = None;
        let mut pause_ms = None;
        let mut timeout_secs = None;
        let mut teams = Vec::new();

        for (key, value) in vars {
            let key: String = key.into();
            let value: String = value.into();
            let value = value.trim().to_string();

            match key.as_str() {
                ENV_API_KEY => api_key = Some(value),
                ENV_API_URL => api_url = Some(value),
                ENV_TIMEZONE => zone = Some(value),
                ENV_LOOKUP_PAUSE_MS => pause_ms = Some(parse_number(ENV_LOOKUP_PAUSE_MS, &value)?),
                ENV_HTTP_TIMEOUT_SECS => {
                    timeout_secs = Some(parse_number(ENV_HTTP_TIMEOUT_SECS, &value)?);
                }
                _ => {
                    if let Some(name) = key.strip_prefix(TEAM_PREFIX) {
                        if !name.is_empty() && !value.is_empty() {
                            teams.push(TeamContext::new(name, value));
                        }
                    }
                }
            }
        }

        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SpikeError::Config(format!("{ENV_API_KEY} not set")))?;

        if require_teams && teams.is_empty() {
            return Err(SpikeError::Config(format!(
                "no {TEAM_PREFIX}* variables found"
            )));
        }
        teams.sort_by(|a, b| a.name.cmp(&b.name));

        let zone: DisplayZone = zone
            .filter(|z| !z.is_empty())
            .as_deref()
            .unwrap_or(DEFAULT_ZONE)
            .parse()?;

        Ok(Self {
            api_key,
            api_url: normalize_url(api_url.as_deref().unwrap_or(DEFAULT_API_URL)),
            teams,
            zone,
            lookup_pause: Duration::from_millis(pause_ms.unwrap_or(DEFAULT_LOOKUP_PAUSE_MS)),
            http_timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)),
        })
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| SpikeError::Config(format!("{key} must be a whole number, got '{value}'")))
}

fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        DEFAULT_API_URL.to_string()
    } else {
        url.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SPIKE_API_KEY", "key-123"),
            ("TEAM_ZETA", "team-z"),
            ("TEAM_ALPHA", "team-a"),
            ("PATH", "/usr/bin"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = ReportConfig::from_vars(base_vars()).unwrap();

        assert_eq!(config.api_key, "key-123");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.zone, DisplayZone::default());
        assert_eq!(config.lookup_pause, Duration::from_millis(100));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_teams_sorted_by_name() {
        let config = ReportConfig::from_vars(base_vars()).unwrap();
        assert_eq!(
            config.teams,
            vec![
                TeamContext::new("ALPHA", "team-a"),
                TeamContext::new("ZETA", "team-z"),
            ]
        );
    }

    #[test]
    fn test_empty_team_values_ignored() {
        let mut vars = base_vars();
        vars.push(("TEAM_EMPTY", "  "));
        vars.push(("TEAM_", "orphan"));
        let config = ReportConfig::from_vars(vars).unwrap();
        assert_eq!(config.teams.len(), 2);
    }

    #[test]
    fn test_missing_api_key() {
        let err = ReportConfig::from_vars(vec![("TEAM_A", "a")]).unwrap_err();
        assert!(err.to_string().contains("SPIKE_API_KEY"));
    }

    #[test]
    fn test_missing_teams() {
        let err = ReportConfig::from_vars(vec![("SPIKE_API_KEY", "k")]).unwrap_err();
        assert!(err.to_string().contains("TEAM_"));
    }

    #[test]
    fn test_overrides() {
        let mut vars = base_vars();
        vars.push(("SPIKE_API_URL", "http://localhost:9000/"));
        vars.push(("SPIKE_TIMEZONE", "+05:30"));
        vars.push(("SPIKE_LOOKUP_PAUSE_MS", "0"));
        vars.push(("SPIKE_HTTP_TIMEOUT_SECS", "5"));
        let config = ReportConfig::from_vars(vars).unwrap();

        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.zone.to_string(), "+05:30");
        assert_eq!(config.lookup_pause, Duration::ZERO);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_numbers_and_zone() {
        let mut vars = base_vars();
        vars.push(("SPIKE_LOOKUP_PAUSE_MS", "soon"));
        assert!(ReportConfig::from_vars(vars).is_err());

        let mut vars = base_vars();
        vars.push(("SPIKE_TIMEZONE", "Nowhere/City"));
        assert!(ReportConfig::from_vars(vars).is_err());
    }

    #[test]
    fn test_later_values_win() {
        let mut vars = base_vars();
        vars.push(("SPIKE_API_KEY", "other"));
        vars.push(("SPIKE_API_URL", "https://example.test/"));
        let config = ReportConfig::from_vars(vars).unwrap();
        assert_eq!(config.api_key, "other");
        assert_eq!(config.api_url, "https://example.test");
    }

    #[test]
    fn test_account_config_without_teams() {
        let config = ReportConfig::account_from_vars(vec![
            ("SPIKE_API_KEY", "k"),
            ("SPIKE_API_URL", "  "),
            ("SPIKE_HTTP_TIMEOUT_SECS", "7"),
        ])
        .unwrap();

        assert!(config.teams.is_empty());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.http_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_account_config_still_needs_api_key() {
        let err = ReportConfig::account_from_vars(vec![("TEAM_A", "a")]).unwrap_err();
        assert!(err.to_string().contains("SPIKE_API_KEY"));
    }
}
