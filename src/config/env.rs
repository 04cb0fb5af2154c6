// Environment variable configuration support

use super::{
    cooldown_from_minutes, parse_interval, Config, MemoryAlertConfig, DEFAULT_INTERVAL,
    DEFAULT_LIMIT,
};
use crate::policy::CleanupPolicy;
use std::env;
use std::str::FromStr;

/// Apply `OOM_SAVER_*` environment variable overrides to configuration
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| env::var(key).ok())
}

/// `OOM_SAVER_DEBUG`, read before logging is set up
pub fn debug_from_env() -> bool {
    env::var("OOM_SAVER_DEBUG")
        .ok()
        .and_then(|val| parse_bool(&val))
        .unwrap_or(false)
}

/// Parse an override, falling back to `default` when it is malformed
fn parse_or<T: FromStr>(key: &str, val: &str, default: T) -> T {
    val.trim().parse().unwrap_or_else(|_| {
        log::warn!("Invalid value {val:?} for {key}, using default");
        default
    })
}

fn parse_bool_or(key: &str, val: &str, default: bool) -> bool {
    parse_bool(val).unwrap_or_else(|| {
        log::warn!("Invalid boolean {val:?} for {key}, using default");
        default
    })
}

fn apply_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    // Monitoring
    if let Some(val) = lookup("OOM_SAVER_INTERVAL") {
        config.interval = parse_interval(&val).unwrap_or_else(|e| {
            log::warn!("Invalid value {val:?} for OOM_SAVER_INTERVAL ({e}), using default");
            DEFAULT_INTERVAL
        });
    }
    if let Some(val) = lookup("OOM_SAVER_LIMIT") {
        config.limit = parse_or("OOM_SAVER_LIMIT", &val, DEFAULT_LIMIT);
    }

    // Behavior flags
    if let Some(val) = lookup("OOM_SAVER_DRY_RUN") {
        config.dry_run = parse_bool_or("OOM_SAVER_DRY_RUN", &val, defaults.dry_run);
    }
    if let Some(val) = lookup("OOM_SAVER_DEBUG") {
        config.debug = parse_bool_or("OOM_SAVER_DEBUG", &val, defaults.debug);
    }

    // Structured cleanup policy
    if let CleanupPolicy::Structured(policy) = &mut config.policy {
        if let Some(val) = lookup("OOM_SAVER_MIN_OOM_SCORE") {
            policy.min_oom_score = parse_or("OOM_SAVER_MIN_OOM_SCORE", &val, 0);
        }
        if let Some(val) = lookup("OOM_SAVER_ZOMBIES_ONLY") {
            policy.zombies_only = parse_bool_or("OOM_SAVER_ZOMBIES_ONLY", &val, false);
        }
    }

    // Memory alerts
    if let Some(alert) = &mut config.memory_alert {
        let alert_defaults = MemoryAlertConfig::default();
        if let Some(val) = lookup("OOM_SAVER_MEMORY_THRESHOLD") {
            alert.threshold_gb =
                parse_or("OOM_SAVER_MEMORY_THRESHOLD", &val, alert_defaults.threshold_gb);
        }
        if let Some(val) = lookup("OOM_SAVER_MEMORY_COOLDOWN") {
            let minutes = parse_or(
                "OOM_SAVER_MEMORY_COOLDOWN",
                &val,
                alert_defaults.cooldown.as_secs() / 60,
            );
            alert.cooldown = cooldown_from_minutes(minutes).unwrap_or_else(|| {
                log::warn!(
                    "OOM_SAVER_MEMORY_COOLDOWN of {minutes} minutes is too large, using default"
                );
                alert_defaults.cooldown
            });
        }
    }

    config
}

/// Parse boolean value from string
/// Accepts: true/false, 1/0, yes/no, on/off (case-insensitive)
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::StructuredPolicy;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));

        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));

        assert_eq!(parse_bool("invalid"), None);
    }

    #[test]
    fn test_overrides_applied() {
        let config = Config {
            policy: CleanupPolicy::Structured(StructuredPolicy::default()),
            memory_alert: Some(MemoryAlertConfig::default()),
            ..Config::default()
        };
        let config = apply_overrides(
            config,
            lookup(&[
                ("OOM_SAVER_INTERVAL", "30"),
                ("OOM_SAVER_DRY_RUN", "yes"),
                ("OOM_SAVER_MIN_OOM_SCORE", "800"),
                ("OOM_SAVER_ZOMBIES_ONLY", "on"),
                ("OOM_SAVER_MEMORY_COOLDOWN", "5"),
            ]),
        );

        assert_eq!(config.interval, Duration::from_secs(30));
        assert!(config.dry_run);
        assert_eq!(
            config.policy,
            CleanupPolicy::Structured(StructuredPolicy {
                min_oom_score: 800,
                zombies_only: true,
                ..StructuredPolicy::default()
            })
        );
        assert_eq!(
            config.memory_alert.map(|a| a.cooldown),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_malformed_overrides_revert_to_defaults() {
        let config = Config {
            interval: Duration::from_secs(60),
            limit: 10,
            dry_run: true,
            ..Config::default()
        };
        let config = apply_overrides(
            config,
            lookup(&[
                ("OOM_SAVER_INTERVAL", "soon"),
                ("OOM_SAVER_LIMIT", "-3"),
                ("OOM_SAVER_DRY_RUN", "maybe"),
            ]),
        );

        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.limit, DEFAULT_LIMIT);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_interval_override_accepts_units() {
        let config = apply_overrides(
            Config::default(),
            lookup(&[("OOM_SAVER_INTERVAL", "750ms")]),
        );
        assert_eq!(config.interval, Duration::from_millis(750));
    }

    #[test]
    fn test_overflowing_cooldown_override_reverts_to_default() {
        let config = Config {
            memory_alert: Some(MemoryAlertConfig {
                cooldown: Duration::from_secs(60),
                ..MemoryAlertConfig::default()
            }),
            ..Config::default()
        };
        let huge = (u64::MAX / 2).to_string();
        let config = apply_overrides(
            config,
            lookup(&[("OOM_SAVER_MEMORY_COOLDOWN", huge.as_str())]),
        );
        assert_eq!(
            config.memory_alert.map(|a| a.cooldown),
            Some(MemoryAlertConfig::default().cooldown)
        );
    }

    #[test]
    fn test_policy_overrides_ignored_in_legacy_mode() {
        let config = apply_overrides(
            Config::default(),
            lookup(&[("OOM_SAVER_MIN_OOM_SCORE", "800")]),
        );
        assert_eq!(config.policy, CleanupPolicy::default());
    }
}
