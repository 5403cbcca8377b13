//! Runtime configuration
//!
//! Defaults describe the public BGPView deployment. Environment variables
//! override individual fields so the service can be pointed at a mirror
//! or tuned without a rebuild.

use crate::{CoreError, Result};
use std::env;
use std::time::Duration;

/// Upstream API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.bgpview.io";

pub const ENV_BASE_URL: &str = "V6REQ_API_BASE";
pub const ENV_TIMEOUT_SECS: &str = "V6REQ_TIMEOUT_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "V6REQ_MAX_ATTEMPTS";
pub const ENV_RPS: &str = "V6REQ_RPS";

/// Settings for the lookup client and its caches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    /// Base URL of the routing-data API, without trailing slash
    pub base_url: String,
    /// Per-attempt HTTP timeout
    pub timeout: Duration,
    /// Total attempts per upstream call, including the first
    pub max_attempts: u32,
    /// TTL of IP → ASN resolutions
    pub ip_ttl: Duration,
    /// TTL of ASN → IPv6 prefix lists
    pub prefixes_ttl: Duration,
    /// TTL of ASN organization records
    pub details_ttl: Duration,
    /// Outbound request pacing; 0 disables it
    pub requests_per_second: u32,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(8),
            max_attempts: 3,
            ip_ttl: Duration::from_secs(30 * 60),
            prefixes_ttl: Duration::from_secs(60 * 60),
            details_ttl: Duration::from_secs(2 * 60 * 60),
            requests_per_second: 10,
        }
    }
}

impl LookupConfig {
    /// Build a config from the process environment
    ///
    /// Reads `V6REQ_API_BASE`, `V6REQ_TIMEOUT_SECS`, `V6REQ_MAX_ATTEMPTS`
    /// and `V6REQ_RPS`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base) = lookup(ENV_BASE_URL) {
            let base = base.trim().trim_end_matches('/');
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(CoreError::Config {
                    name: ENV_BASE_URL.to_string(),
                    reason: format!("expected an http(s) URL, got {:?}", base),
                });
            }
            config.base_url = base.to_string();
        }

        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout = Duration::from_secs(parse_number(ENV_TIMEOUT_SECS, &secs)?);
        }

        if let Some(attempts) = lookup(ENV_MAX_ATTEMPTS) {
            let attempts = parse_number(ENV_MAX_ATTEMPTS, &attempts)?;
            if attempts == 0 {
                return Err(CoreError::Config {
                    name: ENV_MAX_ATTEMPTS.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.max_attempts = attempts;
        }

        if let Some(rps) = lookup(ENV_RPS) {
            config.requests_per_second = parse_number(ENV_RPS, &rps)?;
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| CoreError::Config {
        name: name.to_string(),
        reason: format!("{:?} is not a valid number", value),
    })
}

/// Settings for the HTTP front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Bind the IPv6 loopback only (daemon mode) instead of every interface
    pub loopback_only: bool,
    /// How long in-flight requests may run after shutdown is requested
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            loopback_only: false,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LookupConfig::default();
        assert_eq!(config.base_url, "https://api.bgpview.io");
        assert_eq!(config.timeout, Duration::from_secs(8));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.ip_ttl, Duration::from_secs(1800));
        assert_eq!(config.prefixes_ttl, Duration::from_secs(3600));
        assert_eq!(config.details_ttl, Duration::from_secs(7200));
    }

    #[test]
    fn test_no_vars_keeps_defaults() {
        let config = LookupConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, LookupConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = LookupConfig::from_vars(vars(&[
            (ENV_BASE_URL, "http://127.0.0.1:9000/"),
            (ENV_TIMEOUT_SECS, "2"),
            (ENV_MAX_ATTEMPTS, "5"),
            (ENV_RPS, "0"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.requests_per_second, 0);
    }

    #[test]
    fn test_bad_values_name_the_variable() {
        let err = LookupConfig::from_vars(vars(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(matches!(err, CoreError::Config { ref name, .. } if name == ENV_TIMEOUT_SECS));

        let err = LookupConfig::from_vars(vars(&[(ENV_MAX_ATTEMPTS, "0")])).unwrap_err();
        assert!(matches!(err, CoreError::Config { ref name, .. } if name == ENV_MAX_ATTEMPTS));

        let err = LookupConfig::from_vars(vars(&[(ENV_BASE_URL, "ftp://x")])).unwrap_err();
        assert!(matches!(err, CoreError::Config { ref name, .. } if name == ENV_BASE_URL));
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert!(!config.loopback_only);
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
    }
}
