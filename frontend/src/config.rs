use std::time::Duration;
use tracing::warn;

/// Timing and paging settings of the check-in workflow
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInConfig {
    pub api_base_url: String,
    /// Input inactivity required before a name lookup is issued
    pub debounce: Duration,
    /// Minimum trimmed length of both names before a lookup is attempted
    pub min_name_length: usize,
    pub roster_poll_interval: Duration,
    pub roster_page_size: usize,
    /// How long a notification stays visible unless dismissed (3 to 5 seconds)
    pub notification_duration: Duration,
    /// Page size used to fill the optional ministry selector
    pub ministry_page_size: u32,
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            debounce: Duration::from_millis(500),
            min_name_length: shared::MIN_NAME_LENGTH,
            roster_poll_interval: Duration::from_secs(30),
            roster_page_size: 6,
            notification_duration: Duration::from_secs(4),
            ministry_page_size: 100,
        }
    }
}

impl CheckInConfig {
    const MIN_NOTIFICATION: Duration = Duration::from_secs(3);
    const MAX_NOTIFICATION: Duration = Duration::from_secs(5);

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let millis = |key: &str, default: Duration| -> Duration {
            match lookup(key) {
                Some(value) => match value.trim().parse::<u64>() {
                    Ok(ms) if ms > 0 => Duration::from_millis(ms),
                    _ => {
                        warn!("Invalid {} value {:?}; using {:?}", key, value, default);
                        default
                    }
                },
                None => default,
            }
        };

        let notification_duration = millis("CHECKIN_NOTIFICATION_MS", defaults.notification_duration)
            .clamp(Self::MIN_NOTIFICATION, Self::MAX_NOTIFICATION);

        Self {
            api_base_url: lookup("CHECKIN_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            debounce: millis("CHECKIN_DEBOUNCE_MS", defaults.debounce),
            roster_poll_interval: millis("CHECKIN_ROSTER_POLL_MS", defaults.roster_poll_interval),
            notification_duration,
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = CheckInConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.min_name_length, 2);
        assert_eq!(config.roster_poll_interval, Duration::from_secs(30));
        assert_eq!(config.roster_page_size, 6);
        assert_eq!(config.notification_duration, Duration::from_secs(4));
    }

    #[test]
    fn test_env_overrides() {
        let config = CheckInConfig::from_lookup(lookup_from(&[
            ("CHECKIN_API_URL", "http://church.local:9000/"),
            ("CHECKIN_DEBOUNCE_MS", "250"),
            ("CHECKIN_ROSTER_POLL_MS", "10000"),
        ]));
        assert_eq!(config.api_base_url, "http://church.local:9000");
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.roster_poll_interval, Duration::from_secs(10));
        assert_eq!(config.roster_page_size, 6);
    }

    #[test]
    fn test_invalid_values_fall_back_and_notification_is_clamped() {
        let config = CheckInConfig::from_lookup(lookup_from(&[
            ("CHECKIN_DEBOUNCE_MS", "soon"),
            ("CHECKIN_NOTIFICATION_MS", "60000"),
        ]));
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.notification_duration, Duration::from_secs(5));

        let short = CheckInConfig::from_lookup(lookup_from(&[("CHECKIN_NOTIFICATION_MS", "100")]));
        assert_eq!(short.notification_duration, Duration::from_secs(3));
    }
}
