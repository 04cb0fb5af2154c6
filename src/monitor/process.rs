// Process records and the procfs-backed process source

use anyhow::{Context, Result};
use procfs::process::Process;
use std::fs;

/// Parent PID reported when it cannot be read
pub const UNKNOWN_PPID: i32 = -1;
/// UID reported when the owner cannot be read
pub const UNKNOWN_UID: i64 = -1;
/// OOM score reported when it cannot be read
pub const UNKNOWN_OOM_SCORE: i32 = 0;

/// Scheduling state of a process as reported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStatus {
    Running,
    Sleeping,
    DiskSleep,
    Zombie,
    Stopped,
    TracingStop,
    Paging,
    Dead,
    Wakekill,
    Parked,
    Idle,
    Unknown,
}

impl ProcessStatus {
    /// Parse the one-letter state field of /proc/<pid>/stat
    pub const fn from_char(c: char) -> Self {
        match c {
            'R' => Self::Running,
            'S' => Self::Sleeping,
            'D' => Self::DiskSleep,
            'Z' => Self::Zombie,
            'T' => Self::Stopped,
            't' => Self::TracingStop,
            'W' => Self::Paging,
            'X' | 'x' => Self::Dead,
            'K' => Self::Wakekill,
            'P' => Self::Parked,
            'I' => Self::Idle,
            _ => Self::Unknown,
        }
    }

    /// Parse the human-readable name used on the command line (`--status zombie`)
    pub fn from_name(name: &str) -> Option<Self> {
        let status = match name.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "sleeping" => Self::Sleeping,
            "disk-sleep" => Self::DiskSleep,
            "zombie" => Self::Zombie,
            "stopped" => Self::Stopped,
            "tracing-stop" => Self::TracingStop,
            "paging" => Self::Paging,
            "dead" => Self::Dead,
            "wakekill" => Self::Wakekill,
            "parked" => Self::Parked,
            "idle" => Self::Idle,
            "unknown" => Self::Unknown,
            _ => return None,
        };
        Some(status)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::DiskSleep => "disk-sleep",
            Self::Zombie => "zombie",
            Self::Stopped => "stopped",
            Self::TracingStop => "tracing-stop",
            Self::Paging => "paging",
            Self::Dead => "dead",
            Self::Wakekill => "wakekill",
            Self::Parked => "parked",
            Self::Idle => "idle",
            Self::Unknown => "unknown",
        }
    }

    pub const fn is_zombie(self) -> bool {
        matches!(self, Self::Zombie)
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Snapshot of one process taken during a single scan.
///
/// Records are never mutated once built; the safety tier lives on
/// [`ClassifiedProcess`](crate::classifier::ClassifiedProcess).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: i32,
    pub ppid: i32,
    pub name: String,
    pub status: ProcessStatus,
    pub uid: i64,
    pub oom_score: i32,
}

impl ProcessRecord {
    /// Record with every optional attribute at its sentinel value
    pub fn new(pid: i32, name: impl Into<String>, status: ProcessStatus) -> Self {
        Self {
            pid,
            ppid: UNKNOWN_PPID,
            name: name.into(),
            status,
            uid: UNKNOWN_UID,
            oom_score: UNKNOWN_OOM_SCORE,
        }
    }

    pub const fn with_ppid(mut self, ppid: i32) -> Self {
        self.ppid = ppid;
        self
    }

    pub const fn with_uid(mut self, uid: i64) -> Self {
        self.uid = uid;
        self
    }

    pub const fn with_oom_score(mut self, oom_score: i32) -> Self {
        self.oom_score = oom_score;
        self
    }

    pub const fn is_zombie(&self) -> bool {
        self.status.is_zombie()
    }
}

impl std::fmt::Display for ProcessRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PID {} ({}): {}, uid {}, ppid {}, OOM score {}",
            self.pid,
            crate::sanitize_for_log(&self.name),
            self.status,
            self.uid,
            self.ppid,
            self.oom_score
        )
    }
}

/// Something that can list the processes alive right now
pub trait ProcessSource {
    /// Enumerate every live process. Failing here aborts the current cycle only.
    fn snapshot(&self) -> Result<Vec<ProcessRecord>>;
}

/// Process source backed by /proc
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsSource;

impl ProcfsSource {
    /// Read a single process.
    ///
    /// Fails only when the stat file is gone, i.e. the process exited while
    /// we were looking at it. Everything else falls back to its sentinel.
    pub fn read(pid: i32) -> Result<ProcessRecord> {
        let process = Process::new(pid)?;
        let stat = process.stat()?;
        let status = ProcessStatus::from_char(stat.state);

        let uid = process
            .status()
            .map_or(UNKNOWN_UID, |s| i64::from(s.ruid));

        let oom_score = process
            .oom_score()
            .map_or(UNKNOWN_OOM_SCORE, |score| score as i32);

        // Kernel threads have no command line; name them [comm]
        let has_cmdline = process
            .cmdline()
            .map_or(true, |args| !args.is_empty());
        let name = if !has_cmdline && !status.is_zombie() {
            format!("[{}]", stat.comm)
        } else {
            stat.comm
        };

        Ok(ProcessRecord {
            pid,
            ppid: stat.ppid,
            name,
            status,
            uid,
            oom_score,
        })
    }
}

impl ProcessSource for ProcfsSource {
    fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        let mut processes = Vec::new();

        for entry in fs::read_dir("/proc").context("Failed to read /proc directory")? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();

            // Check if directory name is a number (PID)
            if let Ok(pid) = name.parse::<i32>() {
                match Self::read(pid) {
                    Ok(record) => processes.push(record),
                    Err(e) => log::trace!("Skipping PID {}: {}", pid, e),
                }
            }
        }

        Ok(processes)
    }
}

/// Error returned when a PID is absent from a fresh snapshot
#[derive(Debug, thiserror::Error)]
#[error("process {pid} not found")]
pub struct ProcessNotFound {
    pub pid: i32,
}

/// Take a full snapshot and pick out one PID
pub fn find_process<S: ProcessSource + ?Sized>(source: &S, pid: i32) -> Result<ProcessRecord> {
    let processes = source
        .snapshot()
        .context("Failed to get process info")?;

    processes
        .into_iter()
        .find(|p| p.pid == pid)
        .ok_or_else(|| ProcessNotFound { pid }.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Vec<ProcessRecord>);

    impl ProcessSource for FixedSource {
        fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_status_from_char() {
        assert_eq!(ProcessStatus::from_char('R'), ProcessStatus::Running);
        assert_eq!(ProcessStatus::from_char('Z'), ProcessStatus::Zombie);
        assert_eq!(ProcessStatus::from_char('t'), ProcessStatus::TracingStop);
        assert_eq!(ProcessStatus::from_char('T'), ProcessStatus::Stopped);
        assert_eq!(ProcessStatus::from_char('x'), ProcessStatus::Dead);
        assert_eq!(ProcessStatus::from_char('I'), ProcessStatus::Idle);
        assert_eq!(ProcessStatus::from_char('?'), ProcessStatus::Unknown);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(ProcessStatus::DiskSleep.to_string(), "disk-sleep");
        assert_eq!(ProcessStatus::from_name("Zombie"), Some(ProcessStatus::Zombie));
        assert_eq!(
            ProcessStatus::from_name("tracing-stop"),
            Some(ProcessStatus::TracingStop)
        );
        assert_eq!(ProcessStatus::from_name("asleep"), None);
    }

    #[test]
    fn test_record_sentinels() {
        let record = ProcessRecord::new(42, "", ProcessStatus::Unknown);
        assert_eq!(record.ppid, UNKNOWN_PPID);
        assert_eq!(record.uid, UNKNOWN_UID);
        assert_eq!(record.oom_score, UNKNOWN_OOM_SCORE);
    }

    #[test]
    fn test_find_process() {
        let source = FixedSource(vec![
            ProcessRecord::new(1, "systemd", ProcessStatus::Sleeping),
            ProcessRecord::new(77, "bash", ProcessStatus::Running),
        ]);

        assert_eq!(find_process(&source, 77).unwrap().name, "bash");

        let err = find_process(&source, 78).unwrap_err();
        assert!(err.downcast_ref::<ProcessNotFound>().is_some());
        assert!(err.to_string().contains("78 not found"));
    }

    #[test]
    fn test_procfs_snapshot_contains_self() {
        let own_pid = std::process::id() as i32;
        let processes = ProcfsSource.snapshot().unwrap();
        let me = processes.iter().find(|p| p.pid == own_pid);
        assert!(me.is_some());
        assert!(!me.unwrap().is_zombie());
    }
}
