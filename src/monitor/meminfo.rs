// Memory information parsing from /proc/meminfo and low-memory alerting

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

/// KiB in one GiB; /proc/meminfo reports KiB
pub const KIB_PER_GIB: u64 = 1024 * 1024;

/// Memory information structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    /// Total physical memory in KiB
    pub mem_total: u64,
    /// Free memory in KiB
    pub mem_free: u64,
    /// Available memory in KiB (more accurate than free)
    pub mem_available: u64,
}

impl MemInfo {
    /// Read memory information from /proc/meminfo
    pub fn read() -> Result<Self> {
        Self::read_from_path("/proc/meminfo")
    }

    /// Read memory information from a specific path (for testing)
    fn read_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut info = Self::default();

        for line in reader.lines() {
            let line = line.with_context(|| format!("Error reading {}", path.display()))?;
            let parts: Vec<&str> = line.split_whitespace().collect();

            if parts.len() < 2 {
                continue;
            }

            let key = parts[0].trim_end_matches(':');
            let Ok(value) = parts[1].parse::<u64>() else {
                continue;
            };

            match key {
                "MemTotal" => info.mem_total = value,
                "MemFree" => info.mem_free = value,
                "MemAvailable" => info.mem_available = value,
                _ => {}
            }
        }

        if info.mem_total == 0 {
            anyhow::bail!("Failed to read MemTotal from {}", path.display());
        }

        Ok(info)
    }

    pub const fn mem_used(&self) -> u64 {
        self.mem_total.saturating_sub(self.mem_available)
    }

    /// Calculate percentage of available memory
    pub fn mem_available_percent(&self) -> f64 {
        if self.mem_total == 0 {
            return 0.0;
        }
        (self.mem_available as f64 / self.mem_total as f64) * 100.0
    }

    /// Calculate percentage of used memory
    pub fn mem_used_percent(&self) -> f64 {
        if self.mem_total == 0 {
            return 0.0;
        }
        100.0 - self.mem_available_percent()
    }

    /// Format memory size in human-readable format
    pub fn format_size(kb: u64) -> String {
        const MB: u64 = 1024;
        const GB: u64 = MB * 1024;

        if kb >= GB {
            format!("{:.2} GiB", kb as f64 / GB as f64)
        } else if kb >= MB {
            format!("{:.2} MiB", kb as f64 / MB as f64)
        } else {
            format!("{kb} KiB")
        }
    }
}

impl std::fmt::Display for MemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Memory: {}/{} used ({:.1}%), {} available, {} free",
            Self::format_size(self.mem_used()),
            Self::format_size(self.mem_total),
            self.mem_used_percent(),
            Self::format_size(self.mem_available),
            Self::format_size(self.mem_free),
        )
    }
}

/// Outcome of one low-memory check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertState {
    /// Available memory is above the threshold
    Normal,
    /// Memory is low but an alert went out within the cooldown
    LowSuppressed,
    /// Memory is low and a notification should be sent now
    LowNotify(String),
}

impl AlertState {
    pub const fn is_low(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Low-memory alert with a cooldown between notifications.
///
/// Owned by the scan loop; nothing in the kill policy reads it.
#[derive(Debug, Clone)]
pub struct MemoryAlert {
    threshold_kb: u64,
    cooldown: Duration,
    last_alert: Option<Instant>,
    notification_sent: bool,
}

impl MemoryAlert {
    pub const fn new(threshold_gb: u64, cooldown: Duration) -> Self {
        Self {
            threshold_kb: threshold_gb.saturating_mul(KIB_PER_GIB),
            cooldown,
            last_alert: None,
            notification_sent: false,
        }
    }

    /// Available memory is at or below the threshold
    pub const fn is_low(&self, meminfo: &MemInfo) -> bool {
        meminfo.mem_available <= self.threshold_kb
    }

    /// Enough time has passed since the last delivered alert
    pub fn should_send_alert(&self, now: Instant) -> bool {
        match self.last_alert {
            Some(last) if self.notification_sent => {
                now.saturating_duration_since(last) >= self.cooldown
            }
            _ => true,
        }
    }

    /// Remember that a notification was delivered at `now`
    pub fn record_sent(&mut self, now: Instant) {
        self.last_alert = Some(now);
        self.notification_sent = true;
    }

    /// Forget the last alert so the next low reading notifies immediately
    pub fn reset(&mut self) {
        self.notification_sent = false;
    }

    /// Evaluate the current memory figures.
    ///
    /// The cooldown is cleared as soon as memory recovers, so the next dip
    /// alerts immediately.
    pub fn check(&mut self, meminfo: &MemInfo, now: Instant) -> AlertState {
        if !self.is_low(meminfo) {
            self.reset();
            return AlertState::Normal;
        }

        if !self.should_send_alert(now) {
            return AlertState::LowSuppressed;
        }

        AlertState::LowNotify(format!(
            "Low memory! Only {} MB ({:.1}%) available out of {} MB total",
            meminfo.mem_available / 1024,
            meminfo.mem_available_percent(),
            meminfo.mem_total / 1024
        ))
    }
}
