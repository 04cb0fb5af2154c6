// Signal delivery for process termination

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::str::FromStr;

/// Which termination signal to send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignalKind {
    /// SIGTERM, lets the process clean up
    #[default]
    Term,
    /// SIGKILL, cannot be caught
    Kill,
}

impl SignalKind {
    pub const fn as_signal(self) -> Signal {
        match self {
            Self::Term => Signal::SIGTERM,
            Self::Kill => Signal::SIGKILL,
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Term => f.write_str("SIGTERM"),
            Self::Kill => f.write_str("SIGKILL"),
        }
    }
}

/// Error for signal names other than TERM and KILL
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported signal: {0} (use SIGTERM or SIGKILL)")]
pub struct UnsupportedSignal(pub String);

impl FromStr for SignalKind {
    type Err = UnsupportedSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SIGTERM" | "TERM" => Ok(Self::Term),
            "SIGKILL" | "KILL" => Ok(Self::Kill),
            _ => Err(UnsupportedSignal(s.to_string())),
        }
    }
}

/// Result of a kill operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillResult {
    /// Signal was delivered
    Success,
    /// Process does not exist (it exited after the scan)
    NotFound,
    /// Permission denied (typically need root)
    PermissionDenied,
    /// Other error occurred
    Error(String),
}

impl KillResult {
    /// Check if the kill operation was successful
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get a human-readable description
    pub fn description(&self) -> &str {
        match self {
            Self::Success => "signal delivered",
            Self::NotFound => "process not found",
            Self::PermissionDenied => "permission denied",
            Self::Error(msg) => msg,
        }
    }
}

/// Delivers a termination signal to a PID
pub trait SignalSender {
    fn send(&self, pid: i32, signal: SignalKind) -> KillResult;
}

/// Signal sender using kill(2)
#[derive(Debug, Clone, Copy, Default)]
pub struct NixSignalSender;

impl SignalSender for NixSignalSender {
    fn send(&self, pid: i32, signal: SignalKind) -> KillResult {
        // kill(2) treats 0 and negative PIDs as process groups
        if pid <= 0 {
            return KillResult::Error(format!("refusing to signal non-positive PID {pid}"));
        }

        log::debug!("Sending {} to process {}", signal, pid);

        match signal::kill(Pid::from_raw(pid), signal.as_signal()) {
            Ok(()) => KillResult::Success,
            Err(nix::errno::Errno::ESRCH) => KillResult::NotFound,
            Err(nix::errno::Errno::EPERM) => KillResult::PermissionDenied,
            Err(e) => KillResult::Error(format!("signal error: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_kind_parsing() {
        assert_eq!("SIGTERM".parse::<SignalKind>().unwrap(), SignalKind::Term);
        assert_eq!("term".parse::<SignalKind>().unwrap(), SignalKind::Term);
        assert_eq!("SIGKILL".parse::<SignalKind>().unwrap(), SignalKind::Kill);
        assert_eq!("Kill".parse::<SignalKind>().unwrap(), SignalKind::Kill);

        let err = "SIGHUP".parse::<SignalKind>().unwrap_err();
        assert!(err.to_string().contains("unsupported signal: SIGHUP"));
    }

    #[test]
    fn test_signal_kind_default_is_term() {
        assert_eq!(SignalKind::default(), SignalKind::Term);
        assert_eq!(SignalKind::Term.as_signal(), Signal::SIGTERM);
        assert_eq!(SignalKind::Kill.to_string(), "SIGKILL");
    }

    #[test]
    fn test_kill_result_is_success() {
        assert!(KillResult::Success.is_success());
        assert!(!KillResult::PermissionDenied.is_success());
        assert!(!KillResult::NotFound.is_success());
        assert!(!KillResult::Error("boom".to_string()).is_success());
    }

    #[test]
    fn test_kill_result_description() {
        assert_eq!(KillResult::Success.description(), "signal delivered");
        assert_eq!(KillResult::NotFound.description(), "process not found");
        assert_eq!(
            KillResult::PermissionDenied.description(),
            "permission denied"
        );
        assert_eq!(KillResult::Error("boom".to_string()).description(), "boom");
    }

    #[test]
    fn test_kill_nonexistent_process() {
        // Process ID 999999 should not exist
        let result = NixSignalSender.send(999_999, SignalKind::Term);
        assert_eq!(result, KillResult::NotFound);
    }

    #[test]
    fn test_refuses_process_groups() {
        assert!(matches!(
            NixSignalSender.send(0, SignalKind::Kill),
            KillResult::Error(_)
        ));
        assert!(matches!(
            NixSignalSender.send(-1, SignalKind::Kill),
            KillResult::Error(_)
        ));
    }
}
