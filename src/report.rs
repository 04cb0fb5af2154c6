// Plain-text rendering of scans, statistics and cycle outcomes

use crate::classifier::{ClassificationRule, ClassifiedProcess, SafetyTier};
use crate::killer::TerminationOutcome;
use crate::monitor::{MemInfo, ProcessStatus};
use crate::sanitize_for_log;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const NAME_WIDTH: usize = 24;

fn truncate(name: &str, width: usize) -> String {
    let clean = sanitize_for_log(name);
    if clean.chars().count() <= width {
        clean
    } else {
        let mut short: String = clean.chars().take(width - 1).collect();
        short.push('~');
        short
    }
}

/// Process table with at most `limit` rows
pub fn process_table(processes: &[ClassifiedProcess], limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>7} {:>7} {:<width$} {:<12} {:>6} {:>6} {:<9}",
        "PID",
        "PPID",
        "NAME",
        "STATUS",
        "UID",
        "OOM",
        "SAFETY",
        width = NAME_WIDTH
    );

    for process in processes.iter().take(limit) {
        let r = &process.record;
        let _ = writeln!(
            out,
            "{:>7} {:>7} {:<width$} {:<12} {:>6} {:>6} {:<9}",
            r.pid,
            r.ppid,
            truncate(&r.name, NAME_WIDTH),
            r.status,
            r.uid,
            r.oom_score,
            process.tier,
            width = NAME_WIDTH
        );
    }

    if processes.len() > limit {
        let _ = writeln!(out, "... and {} more processes", processes.len() - limit);
    }
    let _ = write!(out, "Total: {} processes", processes.len());
    out
}

/// Counts per status and per safety tier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessStatistics {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_tier: BTreeMap<&'static str, usize>,
}

impl ProcessStatistics {
    pub fn collect(processes: &[ClassifiedProcess]) -> Self {
        let mut stats = Self {
            total: processes.len(),
            ..Self::default()
        };
        for process in processes {
            *stats.by_status.entry(process.record.status.as_str()).or_default() += 1;
            *stats.by_tier.entry(process.tier.as_str()).or_default() += 1;
        }
        stats
    }

    pub fn zombies(&self) -> usize {
        self.by_status
            .get(ProcessStatus::Zombie.as_str())
            .copied()
            .unwrap_or(0)
    }
}

impl std::fmt::Display for ProcessStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total processes: {}", self.total)?;
        writeln!(f, "By status:")?;
        for (status, count) in &self.by_status {
            writeln!(f, "  {status:<14} {count:>6}")?;
        }
        writeln!(f, "By safety level:")?;
        for tier in SafetyTier::ALL {
            let count = self.by_tier.get(tier.as_str()).copied().unwrap_or(0);
            writeln!(f, "  {:<14} {:>6}", tier.as_str(), count)?;
        }
        write!(f, "Zombies: {}", self.zombies())
    }
}

/// Detailed explanation of one process's classification
pub fn classification_details(process: &ClassifiedProcess, rule: ClassificationRule) -> String {
    let r = &process.record;
    let mut out = String::new();
    let _ = writeln!(out, "Basic Information");
    let _ = writeln!(out, "  PID:             {}", r.pid);
    let _ = writeln!(out, "  Name:            {}", sanitize_for_log(&r.name));
    let _ = writeln!(out, "  Status:          {}", r.status);
    let _ = writeln!(out, "  Owner (UID):     {}", r.uid);
    let _ = writeln!(out, "  Parent PID:      {}", r.ppid);
    let _ = writeln!(out, "  OOM Score:       {}", r.oom_score);
    let _ = writeln!(out);
    let _ = writeln!(out, "Safety Classification");
    let _ = writeln!(out, "  Safety Level:    {}", process.tier);
    let _ = writeln!(out, "  Reason:          {rule}");

    let advice = match process.tier {
        SafetyTier::Critical => {
            "CRITICAL PROCESS - DO NOT KILL. Killing it may crash the system, \
             cause data loss or require a reboot."
        }
        SafetyTier::Important => {
            "IMPORTANT PROCESS - kill with caution. Killing it may disrupt system \
             services and require a service restart."
        }
        SafetyTier::Safe => "SAFE TO KILL - likely a user application, non-critical to the system.",
        SafetyTier::Unknown => {
            "UNKNOWN - does not clearly fit other categories. Investigate before killing."
        }
    };
    let _ = write!(out, "  {advice}");
    out
}

/// One line per termination attempt plus a summary
pub fn outcomes_summary(outcomes: &[TerminationOutcome]) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        let _ = writeln!(out, "  {outcome}");
    }
    let sent = outcomes.iter().filter(|o| o.succeeded).count();
    let failed = outcomes.iter().filter(|o| o.requested && !o.succeeded).count();
    let _ = write!(
        out,
        "Terminated {} of {} candidates ({} failed)",
        sent,
        outcomes.len(),
        failed
    );
    out
}

/// Memory status line shown in monitor mode
pub fn memory_line(meminfo: &MemInfo, low: bool) -> String {
    if low {
        format!("LOW MEMORY - {meminfo}")
    } else {
        meminfo.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::ProcessRecord;

    fn sample() -> Vec<ClassifiedProcess> {
        vec![
            ClassifiedProcess::new(
                ProcessRecord::new(1, "systemd", ProcessStatus::Sleeping),
                SafetyTier::Critical,
            ),
            ClassifiedProcess::new(
                ProcessRecord::new(50, "defunct", ProcessStatus::Zombie),
                SafetyTier::Safe,
            ),
            ClassifiedProcess::new(
                ProcessRecord::new(
                    51,
                    "a-very-long-process-name-that-overflows",
                    ProcessStatus::Zombie,
                ),
                SafetyTier::Safe,
            ),
        ]
    }

    #[test]
    fn test_process_table_limit() {
        let table = process_table(&sample(), 2);
        assert!(table.contains("systemd"));
        assert!(table.contains("defunct"));
        assert!(!table.contains("a-very-long"));
        assert!(table.contains("... and 1 more processes"));
        assert!(table.ends_with("Total: 3 processes"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijk", 5), "abcd~");
    }

    #[test]
    fn test_statistics() {
        let stats = ProcessStatistics::collect(&sample());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.zombies(), 2);
        assert_eq!(stats.by_tier.get("critical"), Some(&1));
        assert_eq!(stats.by_tier.get("safe"), Some(&2));

        let text = stats.to_string();
        assert!(text.contains("unknown"));
        assert!(text.ends_with("Zombies: 2"));
    }

    #[test]
    fn test_classification_details() {
        let processes = sample();
        let text = classification_details(&processes[0], ClassificationRule::InitProcess);
        assert!(text.contains("Safety Level:    critical"));
        assert!(text.contains("PID 1 (init/systemd)"));
        assert!(text.contains("DO NOT KILL"));
    }
}
