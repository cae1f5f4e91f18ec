//! Controller configuration from environment variables.

use crate::error::ControllerError;
use crate::reconciler::poller::{PollConfig, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.websa.com";
/// Default interval between full reconciliations of a Service
pub const DEFAULT_RESYNC: Duration = Duration::from_secs(300);

/// Settings of one controller process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub api_token: String,
    pub datacenter: String,
    pub private_network_number: String,
    /// `None` watches all namespaces
    pub namespace: Option<String>,
    pub poll: PollConfig,
    pub resync: Duration,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &str| {
            optional(name).ok_or_else(|| {
                ControllerError::InvalidConfig(format!("{} environment variable is required", name))
            })
        };
        let seconds = |name: &str, default: Duration| -> Result<Duration, ControllerError> {
            match optional(name) {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                    _ => Err(ControllerError::InvalidConfig(format!(
                        "{} must be a positive number of seconds, got '{}'",
                        name, raw
                    ))),
                },
            }
        };

        Ok(Self {
            api_url: optional("AH_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_token: required("AH_API_TOKEN")?,
            datacenter: required("AH_CLUSTER_DATACENTER")?,
            private_network_number: required("AH_CLUSTER_PRIVATE_NETWORK_NUMBER")?,
            namespace: optional("WATCH_NAMESPACE"),
            poll: PollConfig::new(
                seconds("AH_POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL)?,
                seconds("AH_POLL_TIMEOUT_SECONDS", DEFAULT_POLL_TIMEOUT)?,
            ),
            resync: seconds("AH_RESYNC_SECONDS", DEFAULT_RESYNC)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("AH_API_TOKEN", "secret"),
        ("AH_CLUSTER_DATACENTER", "ams1"),
        ("AH_CLUSTER_PRIVATE_NETWORK_NUMBER", "42"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.api_url, "https://api.websa.com");
        assert_eq!(config.api_token, "secret");
        assert_eq!(config.datacenter, "ams1");
        assert_eq!(config.private_network_number, "42");
        assert_eq!(config.namespace, None);
        assert_eq!(config.poll, PollConfig::default());
        assert_eq!(config.resync, Duration::from_secs(300));
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("AH_API_URL", "https://api.example.com"),
            ("WATCH_NAMESPACE", "ingress"),
            ("AH_POLL_INTERVAL_SECONDS", "2"),
            ("AH_POLL_TIMEOUT_SECONDS", "60"),
            ("AH_RESYNC_SECONDS", "120"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.namespace.as_deref(), Some("ingress"));
        assert_eq!(config.poll, PollConfig::new(Duration::from_secs(2), Duration::from_secs(60)));
        assert_eq!(config.resync, Duration::from_secs(120));
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let err = Config::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("AH_API_TOKEN"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[1] = ("AH_CLUSTER_DATACENTER", "  ");
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("AH_CLUSTER_DATACENTER"));
    }

    #[test]
    fn test_invalid_seconds_are_rejected() {
        for bad in ["0", "-5", "soon"] {
            let mut vars = REQUIRED.to_vec();
            vars.push(("AH_POLL_TIMEOUT_SECONDS", bad));
            assert!(matches!(
                Config::from_lookup(lookup(&vars)),
                Err(ControllerError::InvalidConfig(_))
            ));
        }
    }
}
