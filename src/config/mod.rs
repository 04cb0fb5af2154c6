// Configuration module

mod args;
mod env;

pub use args::{parse_interval, Args, Command, KillArgs, ListArgs, MonitorArgs};
pub use env::{apply_env_overrides, debug_from_env};

use crate::monitor::KIB_PER_GIB;
use crate::policy::{CleanupPolicy, StructuredPolicy};
use anyhow::{bail, Context, Result};
use regex::{Regex, RegexBuilder};
use std::time::Duration;

/// Maximum allowed length for regex patterns to prevent ReDoS attacks
const MAX_REGEX_PATTERN_LENGTH: usize = 256;

/// Maximum compiled regex size in bytes (10MB) to prevent memory exhaustion
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
/// Longest accepted monitoring interval
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_LIMIT: usize = 200;
pub const DEFAULT_MEMORY_THRESHOLD_GB: u64 = 3;
pub const DEFAULT_MEMORY_COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Compile a regex pattern with safety limits to prevent ReDoS attacks.
fn compile_safe_regex(pattern: &str) -> Result<Regex> {
    if pattern.len() > MAX_REGEX_PATTERN_LENGTH {
        bail!(
            "Regex pattern too long (max {} chars): {}...",
            MAX_REGEX_PATTERN_LENGTH,
            pattern.chars().take(50).collect::<String>()
        );
    }

    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .with_context(|| format!("Invalid regex pattern: {pattern}"))
}

/// Cooldown given in minutes; `None` when it does not fit a `Duration` of seconds
fn cooldown_from_minutes(minutes: u64) -> Option<Duration> {
    minutes.checked_mul(60).map(Duration::from_secs)
}

/// Low-memory alert settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAlertConfig {
    pub threshold_gb: u64,
    pub cooldown: Duration,
}

impl Default for MemoryAlertConfig {
    fn default() -> Self {
        Self {
            threshold_gb: DEFAULT_MEMORY_THRESHOLD_GB,
            cooldown: DEFAULT_MEMORY_COOLDOWN,
        }
    }
}

/// Monitor configuration. Built once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub interval: Duration,
    /// Rows shown in the per-cycle process table
    pub limit: usize,

    /// When false the monitor only reports
    pub auto_kill: bool,
    pub policy: CleanupPolicy,
    pub ignore: Vec<Regex>,
    /// Extra names for the critical set
    pub protect: Vec<String>,
    pub dry_run: bool,

    pub memory_alert: Option<MemoryAlertConfig>,

    pub debug: bool,
}

impl Config {
    /// Build the monitor configuration from command-line arguments
    pub fn from_monitor_args(args: MonitorArgs, debug: bool) -> Result<Self> {
        let mut config = Self {
            debug,
            ..Self::default()
        };

        if let Some(interval) = args.interval {
            config.interval = interval;
        }
        if let Some(limit) = args.limit {
            config.limit = limit;
        }

        config.auto_kill = !args.no_auto_kill;
        config.policy = if args.use_config {
            CleanupPolicy::Structured(StructuredPolicy {
                kill_user_processes: args.kill_user_processes,
                kill_browsers: args.kill_browsers,
                kill_safe_tier: args.kill_safe,
                kill_important_tier: args.kill_important,
                min_oom_score: args.min_oom_score.unwrap_or(0),
                zombies_only: args.zombies_only,
            })
        } else {
            if args.kill_user_processes
                || args.kill_browsers
                || args.kill_safe
                || args.kill_important
                || args.min_oom_score.is_some()
                || args.zombies_only
            {
                log::warn!(
                    "--kill-*, --min-oom-score and --zombies-only need --use-config, ignoring them"
                );
            }
            CleanupPolicy::LegacyZombie {
                kill_all: args.auto_kill_all_zombies,
            }
        };

        // Compile regex patterns with safety limits (ReDoS protection)
        for pattern in &args.ignore {
            config.ignore.push(compile_safe_regex(pattern)?);
        }
        config.protect = args.protect;
        config.dry_run = args.dry_run;

        if args.memory_alert {
            let mut alert = MemoryAlertConfig::default();
            if let Some(gb) = args.memory_threshold {
                alert.threshold_gb = gb;
            }
            if let Some(minutes) = args.memory_cooldown {
                match cooldown_from_minutes(minutes) {
                    Some(cooldown) => alert.cooldown = cooldown,
                    None => log::warn!(
                        "Memory cooldown of {minutes} minutes is too large, using default {} min",
                        DEFAULT_MEMORY_COOLDOWN.as_secs() / 60
                    ),
                }
            }
            config.memory_alert = Some(alert);
        }

        // Apply environment variable overrides
        config = apply_env_overrides(config);

        config.validate();

        Ok(config)
    }

    /// Replace out-of-range values with their defaults.
    ///
    /// Bad settings never abort startup; they are reported and defaulted.
    fn validate(&mut self) {
        if self.interval.is_zero() {
            log::warn!(
                "Monitoring interval must be positive, using default {:?}",
                DEFAULT_INTERVAL
            );
            self.interval = DEFAULT_INTERVAL;
        } else if self.interval > MAX_INTERVAL {
            log::warn!(
                "Monitoring interval {:?} exceeds {:?}, using default {:?}",
                self.interval,
                MAX_INTERVAL,
                DEFAULT_INTERVAL
            );
            self.interval = DEFAULT_INTERVAL;
        }

        if self.limit == 0 {
            log::warn!("Display limit must be positive, using default {DEFAULT_LIMIT}");
            self.limit = DEFAULT_LIMIT;
        }

        if let CleanupPolicy::Structured(policy) = &mut self.policy {
            if policy.min_oom_score < 0 {
                log::warn!(
                    "min-oom-score must not be negative (got {}), disabling it",
                    policy.min_oom_score
                );
                policy.min_oom_score = 0;
            }
        }

        if let Some(alert) = &mut self.memory_alert {
            if alert.threshold_gb == 0 || alert.threshold_gb.checked_mul(KIB_PER_GIB).is_none() {
                log::warn!(
                    "Memory threshold {} GB is out of range, using default {} GB",
                    alert.threshold_gb,
                    DEFAULT_MEMORY_THRESHOLD_GB
                );
                alert.threshold_gb = DEFAULT_MEMORY_THRESHOLD_GB;
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            limit: DEFAULT_LIMIT,
            auto_kill: true,
            policy: CleanupPolicy::default(),
            ignore: Vec::new(),
            protect: Vec::new(),
            dry_run: false,
            memory_alert: None,
            debug: false,
        }
    }
}
