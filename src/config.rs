use log::{debug, info};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::session::{SessionConfig, WatchdogConfig};

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub session: SessionConfig,
    /// BlueZ adapter name such as `hci1`; the default adapter when unset
    pub adapter: Option<String>,
    /// How often the store summary is logged; `None` disables it
    pub summary_interval: Option<Duration>,
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Box<dyn std::error::Error>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("{} must be a boolean, got '{}'", key, other).into()),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, Box<dyn std::error::Error>> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| format!("{} must be a non-negative integer, got '{}'", key, value).into())
}

impl ReaderConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SessionConfig::default();

        let use_checksum = match lookup("ASSET_TAG_USE_CRC32") {
            Some(value) => parse_bool("ASSET_TAG_USE_CRC32", &value)?,
            None => defaults.use_checksum,
        };
        let strict_decode = match lookup("ASSET_TAG_STRICT_DECODE") {
            Some(value) => parse_bool("ASSET_TAG_STRICT_DECODE", &value)?,
            None => defaults.strict_decode,
        };

        let millis = |key: &str, default: Duration| -> Result<Duration, Box<dyn std::error::Error>> {
            match lookup(key) {
                Some(value) => Ok(Duration::from_millis(parse_number::<u64>(key, &value)?)),
                None => Ok(default),
            }
        };

        let poll_interval = millis("ASSET_TAG_POLL_INTERVAL_MS", defaults.poll_interval)?;
        if poll_interval.is_zero() {
            return Err("ASSET_TAG_POLL_INTERVAL_MS must be greater than zero".into());
        }

        let watchdog = WatchdogConfig {
            grace: millis("ASSET_TAG_WATCHDOG_GRACE_MS", defaults.watchdog.grace)?,
            max_resets: match lookup("ASSET_TAG_WATCHDOG_RESETS") {
                Some(value) => parse_number::<u32>("ASSET_TAG_WATCHDOG_RESETS", &value)?,
                None => defaults.watchdog.max_resets,
            },
            retry_wait: millis(
                "ASSET_TAG_WATCHDOG_RETRY_WAIT_MS",
                defaults.watchdog.retry_wait,
            )?,
        };

        let expected_stack_version = lookup("ASSET_TAG_EXPECTED_STACK_VERSION")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let adapter = lookup("ASSET_TAG_ADAPTER")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let summary_secs = match lookup("ASSET_TAG_SUMMARY_INTERVAL_SECS") {
            Some(value) => parse_number::<u64>("ASSET_TAG_SUMMARY_INTERVAL_SECS", &value)?,
            None => 30,
        };
        let summary_interval = (summary_secs > 0).then(|| Duration::from_secs(summary_secs));

        let config = ReaderConfig {
            session: SessionConfig {
                use_checksum,
                poll_interval,
                watchdog,
                strict_decode,
                expected_stack_version,
            },
            adapter,
            summary_interval,
        };

        info!(
            "Frame checksum {}, strict decoding {}",
            if config.session.use_checksum { "enabled" } else { "disabled" },
            if config.session.strict_decode { "enabled" } else { "disabled" }
        );
        debug!("Loaded configuration: {:?}", config);

        Ok(config)
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
    fn test_defaults() {
        let config = ReaderConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.session.use_checksum);
        assert!(config.session.strict_decode);
        assert_eq!(config.session.poll_interval, Duration::from_millis(100));
        assert_eq!(config.session.watchdog.grace, Duration::from_secs(1));
        assert_eq!(config.session.watchdog.max_resets, 3);
        assert_eq!(config.session.watchdog.retry_wait, Duration::from_secs(10));
        assert_eq!(config.session.expected_stack_version, None);
        assert_eq!(config.adapter, None);
        assert_eq!(config.summary_interval, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_overrides() {
        let config = ReaderConfig::from_lookup(lookup(&[
            ("ASSET_TAG_USE_CRC32", "0"),
            ("ASSET_TAG_STRICT_DECODE", "false"),
            ("ASSET_TAG_POLL_INTERVAL_MS", "20"),
            ("ASSET_TAG_WATCHDOG_GRACE_MS", "500"),
            ("ASSET_TAG_WATCHDOG_RESETS", "5"),
            ("ASSET_TAG_WATCHDOG_RETRY_WAIT_MS", "2000"),
            ("ASSET_TAG_EXPECTED_STACK_VERSION", " 5.66.0 "),
            ("ASSET_TAG_ADAPTER", "hci1"),
            ("ASSET_TAG_SUMMARY_INTERVAL_SECS", "0"),
        ]))
        .unwrap();
        assert!(!config.session.use_checksum);
        assert!(!config.session.strict_decode);
        assert_eq!(config.session.poll_interval, Duration::from_millis(20));
        assert_eq!(config.session.watchdog.grace, Duration::from_millis(500));
        assert_eq!(config.session.watchdog.max_resets, 5);
        assert_eq!(config.session.watchdog.retry_wait, Duration::from_secs(2));
        assert_eq!(
            config.session.expected_stack_version.as_deref(),
            Some("5.66.0")
        );
        assert_eq!(config.adapter.as_deref(), Some("hci1"));
        assert_eq!(config.summary_interval, None);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = ReaderConfig::from_lookup(lookup(&[("ASSET_TAG_USE_CRC32", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("ASSET_TAG_USE_CRC32"));

        let err = ReaderConfig::from_lookup(lookup(&[("ASSET_TAG_WATCHDOG_RESETS", "-1")]))
            .unwrap_err();
        assert!(err.to_string().contains("ASSET_TAG_WATCHDOG_RESETS"));

        let err = ReaderConfig::from_lookup(lookup(&[("ASSET_TAG_POLL_INTERVAL_MS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("ASSET_TAG_POLL_INTERVAL_MS"));
    }
}
