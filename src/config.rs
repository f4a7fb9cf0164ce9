use std::env;

use crate::domain::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "EXPENSE_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "EXPENSE_HTTP_TIMEOUT_SECS";
pub const ENV_STRICT_TOTALS: &str = "EXPENSE_STRICT_TOTALS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub timeout_secs: u64,
    pub strict_totals: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            strict_totals: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.api_url = normalize_url(&url)?;
        }

        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = match timeout.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(Error::Config(format!(
                        "{} must be a positive number of seconds, got {:?}",
                        ENV_TIMEOUT_SECS, timeout
                    )));
                }
            };
        }

        if let Some(flag) = lookup(ENV_STRICT_TOTALS) {
            config.strict_totals = parse_flag(&flag).ok_or_else(|| {
                Error::Config(format!("{} must be true or false, got {:?}", ENV_STRICT_TOTALS, flag))
            })?;
        }

        Ok(config)
    }

    /// Absolute URL of an API path such as `/users/by-username/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}

/// Strips trailing slashes and requires an http(s) scheme.
pub fn normalize_url(url: &str) -> Result<String, Error> {
    let url = url.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "API URL must start with http:// or https://, got {:?}",
            url
        )));
    }
    Ok(url.to_string())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(Config::from_lookup(lookup(&[])).unwrap(), Config::default());
    }

    #[test]
    fn reads_all_settings() {
        let config = Config::from_lookup(lookup(&[
            (ENV_API_URL, "https://split.example.com/api/"),
            (ENV_TIMEOUT_SECS, "5"),
            (ENV_STRICT_TOTALS, "yes"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://split.example.com/api");
        assert_eq!(config.timeout_secs, 5);
        assert!(config.strict_totals);
        assert_eq!(
            config.endpoint("/expenses/add/"),
            "https://split.example.com/api/expenses/add/"
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[(ENV_API_URL, "ftp://x")])).is_err());
        assert!(Config::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[(ENV_STRICT_TOTALS, "maybe")])).is_err());
    }
}
