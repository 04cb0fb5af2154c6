// Desktop notifications for low-memory alerts

use anyhow::{bail, Context, Result};
use std::process::Command;

#[cfg(feature = "dbus-notify")]
use notify_rust::{Notification, Timeout, Urgency};

const SUMMARY: &str = "OOM-Saver";

/// Sanitize a string before handing it to an external notifier
fn sanitize_message(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() && c != '\n' { ' ' } else { c })
        .take(512)
        .collect()
}

pub struct NotificationManager {
    enable_dbus: bool,
}

impl NotificationManager {
    pub const fn new(enable_dbus: bool) -> Self {
        Self { enable_dbus }
    }

    /// Deliver a critical-urgency desktop notification.
    ///
    /// Uses D-Bus when built with `dbus-notify`, otherwise `notify-send`.
    pub fn send_low_memory_alert(&self, message: &str) -> Result<()> {
        let message = sanitize_message(message);

        #[cfg(feature = "dbus-notify")]
        if self.enable_dbus {
            return self.send_dbus_notification(&message);
        }

        #[cfg(not(feature = "dbus-notify"))]
        if self.enable_dbus {
            log::debug!("D-Bus notifications requested but feature 'dbus-notify' not compiled in");
        }

        Self::send_with_notify_send(&message)
    }

    fn send_with_notify_send(message: &str) -> Result<()> {
        let output = Command::new("notify-send")
            .args(["-u", "critical", "-i", "dialog-warning", SUMMARY, message])
            .output()
            .context("notify-send not found. Install libnotify-bin")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "notify-send failed with status {}: {}",
                output.status,
                stderr.trim()
            );
        }

        log::info!("Low memory notification sent");
        Ok(())
    }

    #[cfg(feature = "dbus-notify")]
    fn send_dbus_notification(&self, message: &str) -> Result<()> {
        Notification::new()
            .summary(SUMMARY)
            .body(message)
            .icon("dialog-warning")
            .urgency(Urgency::Critical)
            .timeout(Timeout::Milliseconds(6000))
            .show()
            .context("Failed to send D-Bus notification")?;

        log::info!("D-Bus low memory notification sent");
        Ok(())
    }
}
