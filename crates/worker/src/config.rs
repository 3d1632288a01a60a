use std::time::Duration;

use aurora_pipeline::source::RetryPolicy;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Seconds between batch runs (default: `3600`).
    pub analysis_interval_secs: u64,
    /// Satellite source attempts per run (default: `3`).
    pub source_max_retries: u32,
    /// Per-attempt satellite source timeout (default: `300`).
    pub source_timeout_secs: u64,
    /// History window for the reports logged after each batch (default: `90`).
    pub report_window_days: u32,
    /// Fixed seed for detection jitter and synthetic history.
    pub synthetic_seed: Option<u64>,
    /// `json` switches the log formatter.
    pub json_logs: bool,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                  | Default   |
    /// |--------------------------|-----------|
    /// | `DATABASE_URL`           | required  |
    /// | `ANALYSIS_INTERVAL_SECS` | `3600`    |
    /// | `SOURCE_MAX_RETRIES`     | `3`       |
    /// | `SOURCE_TIMEOUT_SECS`    | `300`     |
    /// | `REPORT_WINDOW_DAYS`     | `90`      |
    /// | `SYNTHETIC_SEED`         | unset     |
    /// | `LOG_FORMAT`             | `text`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            analysis_interval_secs: parse_or(&lookup, "ANALYSIS_INTERVAL_SECS", "u64", 3600)?,
            source_max_retries: parse_or(&lookup, "SOURCE_MAX_RETRIES", "u32", 3)?,
            source_timeout_secs: parse_or(&lookup, "SOURCE_TIMEOUT_SECS", "u64", 300)?,
            report_window_days: parse_or(&lookup, "REPORT_WINDOW_DAYS", "u32", 90)?,
            synthetic_seed: match lookup("SYNTHETIC_SEED") {
                Some(v) => Some(parse(&v, "SYNTHETIC_SEED", "u64")?),
                None => None,
            },
            json_logs: lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    pub fn analysis_interval(&self) -> Duration {
        Duration::from_secs(self.analysis_interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.source_max_retries,
            timeout: Duration::from_secs(self.source_timeout_secs),
            ..RetryPolicy::default()
        }
    }
}

fn parse<T: std::str::FromStr>(
    value: &str,
    name: &'static str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    })
}

fn parse_or<T, F>(lookup: &F, name: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) => parse(&v, name, expected),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/aurora")]).unwrap();
        assert_eq!(config.analysis_interval_secs, 3600);
        assert_eq!(config.source_max_retries, 3);
        assert_eq!(config.source_timeout_secs, 300);
        assert_eq!(config.report_window_days, 90);
        assert_eq!(config.synthetic_seed, None);
        assert!(!config.json_logs);

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.timeout, Duration::from_secs(300));
        assert!(policy.synthetic_fallback);
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(load(&[]), Err(ConfigError::Missing("DATABASE_URL")));
        assert_eq!(
            load(&[("DATABASE_URL", "  ")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/aurora"),
            ("ANALYSIS_INTERVAL_SECS", "60"),
            ("SOURCE_MAX_RETRIES", "5"),
            ("SYNTHETIC_SEED", "42"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(config.analysis_interval(), Duration::from_secs(60));
        assert_eq!(config.source_max_retries, 5);
        assert_eq!(config.synthetic_seed, Some(42));
        assert!(config.json_logs);
    }

    #[test]
    fn invalid_number_is_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgres://db/aurora"),
            ("SOURCE_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "SOURCE_TIMEOUT_SECS must be a valid u64, got \"soon\""
        );
    }
}
