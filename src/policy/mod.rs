// Cleanup policy: decides which classified processes may be terminated

use crate::classifier::{ClassifiedProcess, Classifier, SafetyTier, FIRST_USER_UID};
use regex::Regex;

/// Operator-selected cleanup rules.
///
/// The two variants are mutually exclusive ways of deciding what to kill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Only zombies are killed: every zombie with `kill_all`, otherwise only
    /// `safe` ones.
    LegacyZombie { kill_all: bool },
    /// Rule-based cleanup, see [`StructuredPolicy`]
    Structured(StructuredPolicy),
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self::LegacyZombie { kill_all: false }
    }
}

impl std::fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LegacyZombie { kill_all: true } => {
                write!(f, "kill ALL zombies (including critical/important)")
            }
            Self::LegacyZombie { kill_all: false } => write!(f, "kill only SAFE zombies"),
            Self::Structured(policy) => write!(f, "custom cleanup: {policy}"),
        }
    }
}

/// Rule-based cleanup configuration.
///
/// A process is a candidate when any enabled rule matches it. Critical
/// processes are never candidates, and with `zombies_only` nothing alive is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredPolicy {
    pub kill_user_processes: bool,
    pub kill_browsers: bool,
    pub kill_safe_tier: bool,
    pub kill_important_tier: bool,
    /// 0 disables the OOM score rule
    pub min_oom_score: i32,
    pub zombies_only: bool,
}

impl StructuredPolicy {
    /// The first enabled rule matching the process, if any
    fn matching_reason(
        &self,
        process: &ClassifiedProcess,
        classifier: &Classifier,
    ) -> Option<KillReason> {
        let record = &process.record;

        if self.kill_user_processes && record.uid >= FIRST_USER_UID {
            return Some(KillReason::UserProcess);
        }
        if self.kill_browsers && classifier.is_browser(&record.name) {
            return Some(KillReason::Browser);
        }
        if self.kill_safe_tier && process.tier == SafetyTier::Safe {
            return Some(KillReason::SafeTier);
        }
        if self.kill_important_tier && process.tier == SafetyTier::Important {
            return Some(KillReason::ImportantTier);
        }
        if self.min_oom_score > 0 && record.oom_score >= self.min_oom_score {
            return Some(KillReason::OomScore);
        }
        None
    }
}

impl std::fmt::Display for StructuredPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut rules = Vec::new();
        if self.kill_user_processes {
            rules.push("user processes (UID >= 1000)".to_string());
        }
        if self.kill_browsers {
            rules.push("browser processes".to_string());
        }
        if self.kill_safe_tier {
            rules.push("safe level processes".to_string());
        }
        if self.kill_important_tier {
            rules.push("important level processes".to_string());
        }
        if self.min_oom_score > 0 {
            rules.push(format!("OOM score >= {}", self.min_oom_score));
        }
        if rules.is_empty() {
            rules.push("no kill rules enabled".to_string());
        }
        write!(f, "{}", rules.join(", "))?;
        if self.zombies_only {
            write!(f, " [zombies only]")?;
        }
        Ok(())
    }
}

/// Why a process was selected for termination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KillReason {
    Zombie,
    UserProcess,
    Browser,
    SafeTier,
    ImportantTier,
    OomScore,
}

impl std::fmt::Display for KillReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Zombie => "zombie",
            Self::UserProcess => "user process",
            Self::Browser => "browser",
            Self::SafeTier => "safe tier",
            Self::ImportantTier => "important tier",
            Self::OomScore => "OOM score threshold",
        };
        f.write_str(s)
    }
}

/// A process selected for termination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub process: ClassifiedProcess,
    pub reason: KillReason,
}

/// Partition of one scan into kill candidates and retained processes.
/// Both lists keep scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub candidates: Vec<Candidate>,
    pub retained: Vec<ClassifiedProcess>,
}

impl Evaluation {
    pub fn candidate_pids(&self) -> Vec<i32> {
        self.candidates.iter().map(|c| c.process.record.pid).collect()
    }

    pub fn retained_pids(&self) -> Vec<i32> {
        self.retained.iter().map(|p| p.record.pid).collect()
    }
}

/// Applies a [`CleanupPolicy`] to a classified scan
#[derive(Debug, Clone)]
pub struct CleanupEvaluator {
    policy: CleanupPolicy,
    classifier: Classifier,
    ignore: Vec<Regex>,
    protected_pids: Vec<i32>,
}

impl CleanupEvaluator {
    pub const fn new(policy: CleanupPolicy, classifier: Classifier) -> Self {
        Self {
            policy,
            classifier,
            ignore: Vec::new(),
            protected_pids: Vec::new(),
        }
    }

    /// Never select processes whose name matches one of these patterns
    #[must_use]
    pub fn with_ignore_patterns(mut self, ignore: Vec<Regex>) -> Self {
        self.ignore = ignore;
        self
    }

    /// Never select these PIDs (the monitor itself, typically)
    #[must_use]
    pub fn with_protected_pids(mut self, pids: impl IntoIterator<Item = i32>) -> Self {
        self.protected_pids.extend(pids);
        self
    }

    pub const fn policy(&self) -> &CleanupPolicy {
        &self.policy
    }

    /// Split a classified scan into candidates and retained processes.
    ///
    /// Pure: nothing is signalled here.
    pub fn evaluate(&self, processes: Vec<ClassifiedProcess>) -> Evaluation {
        let mut evaluation = Evaluation::default();

        for process in processes {
            match self.decide(&process) {
                Some(reason) => {
                    log::debug!(
                        "Selected PID {} ({}) [{}]: {}",
                        process.record.pid,
                        crate::sanitize_for_log(&process.record.name),
                        process.tier,
                        reason
                    );
                    evaluation.candidates.push(Candidate { process, reason });
                }
                None => evaluation.retained.push(process),
            }
        }

        evaluation
    }

    /// Per-process decision: `Some(reason)` to kill, `None` to keep
    pub fn decide(&self, process: &ClassifiedProcess) -> Option<KillReason> {
        let record = &process.record;

        if self.protected_pids.contains(&record.pid) {
            return None;
        }
        if self.is_ignored(&record.name) {
            log::trace!("PID {} matches ignore pattern", record.pid);
            return None;
        }

        match &self.policy {
            CleanupPolicy::LegacyZombie { kill_all } => {
                let selected =
                    record.is_zombie() && (*kill_all || process.tier == SafetyTier::Safe);
                if record.is_zombie() && !selected {
                    log::info!(
                        "Skipping {} zombie: PID {} ({}) - use --auto-kill-all-zombies to kill",
                        process.tier,
                        record.pid,
                        crate::sanitize_for_log(&record.name)
                    );
                }
                selected.then_some(KillReason::Zombie)
            }
            CleanupPolicy::Structured(policy) => {
                if process.tier == SafetyTier::Critical {
                    return None;
                }
                if policy.zombies_only && !record.is_zombie() {
                    return None;
                }
                policy.matching_reason(process, &self.classifier)
            }
        }
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|pattern| pattern.is_match(name))
    }
}
