// Process safety classification
//
// Turns a raw process record into a safety tier. The rule table is walked
// top to bottom and the first match wins, so the order below is part of the
// contract.

mod names;

pub use names::{
    NameTables, BROWSER_PROCESS_NAMES, CRITICAL_PROCESS_NAMES, IMPORTANT_PROCESS_NAMES,
};

use crate::monitor::ProcessRecord;
use std::cmp::Ordering;

/// First UID of the conventional non-system user range
pub const FIRST_USER_UID: i64 = 1000;
/// Scores below this mean the kernel has explicitly protected the process
pub const PROTECTED_OOM_SCORE: i32 = -500;
/// Scores above this mean the kernel would happily kill the process
pub const PREFERRED_VICTIM_OOM_SCORE: i32 = 300;

/// Safety classification of a process.
///
/// Ordered by caution: `Critical > Important > Safe`, `Important > Unknown`.
/// `Safe` and `Unknown` are deliberately incomparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyTier {
    Critical,
    Important,
    Safe,
    Unknown,
}

impl SafetyTier {
    pub const ALL: [Self; 4] = [Self::Critical, Self::Important, Self::Safe, Self::Unknown];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Important => "important",
            Self::Safe => "safe",
            Self::Unknown => "unknown",
        }
    }

    const fn caution(self) -> u8 {
        match self {
            Self::Critical => 2,
            Self::Important => 1,
            Self::Safe | Self::Unknown => 0,
        }
    }
}

impl PartialOrd for SafetyTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        match self.caution().cmp(&other.caution()) {
            Ordering::Equal => None,
            ord => Some(ord),
        }
    }
}

impl std::fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// The classification rules, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationRule {
    Zombie,
    InitProcess,
    KernelThread,
    ProtectedOomScore,
    CriticalName,
    ImportantName,
    UserOwned,
    HighOomScore,
    RootServiceOfInit,
    Unclassified,
}

impl ClassificationRule {
    pub const fn tier(self) -> SafetyTier {
        match self {
            Self::Zombie | Self::UserOwned | Self::HighOomScore => SafetyTier::Safe,
            Self::InitProcess
            | Self::KernelThread
            | Self::ProtectedOomScore
            | Self::CriticalName => SafetyTier::Critical,
            Self::ImportantName | Self::RootServiceOfInit => SafetyTier::Important,
            Self::Unclassified => SafetyTier::Unknown,
        }
    }

    fn matches(self, tables: &NameTables, p: &ProcessRecord) -> bool {
        match self {
            Self::Zombie => p.is_zombie(),
            Self::InitProcess => p.pid == 1,
            Self::KernelThread => is_kernel_thread(&p.name),
            Self::ProtectedOomScore => p.oom_score < PROTECTED_OOM_SCORE,
            Self::CriticalName => tables.is_critical_name(&p.name),
            Self::ImportantName => tables.is_important_name(&p.name),
            Self::UserOwned => p.uid >= FIRST_USER_UID,
            Self::HighOomScore => p.oom_score > PREFERRED_VICTIM_OOM_SCORE,
            Self::RootServiceOfInit => p.uid == 0 && p.ppid == 1,
            Self::Unclassified => true,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Zombie => "zombie process (already exited, only holds a process-table slot)",
            Self::InitProcess => "PID 1 (init/systemd) - system manager",
            Self::KernelThread => "kernel thread",
            Self::ProtectedOomScore => "very negative OOM score - kernel protected",
            Self::CriticalName => "essential system service",
            Self::ImportantName => "system daemon or important service",
            Self::UserOwned => "owned by a regular (non-system) user",
            Self::HighOomScore => "high OOM score - kernel considers it killable",
            Self::RootServiceOfInit => "root-owned direct child of init",
            Self::Unclassified => "does not clearly fit any category, investigate manually",
        }
    }
}

impl std::fmt::Display for ClassificationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Rules in evaluation order; `Unclassified` is the fallback
const RULES: [ClassificationRule; 9] = [
    ClassificationRule::Zombie,
    ClassificationRule::InitProcess,
    ClassificationRule::KernelThread,
    ClassificationRule::ProtectedOomScore,
    ClassificationRule::CriticalName,
    ClassificationRule::ImportantName,
    ClassificationRule::UserOwned,
    ClassificationRule::HighOomScore,
    ClassificationRule::RootServiceOfInit,
];

/// Kernel threads are shown as `[name]`
fn is_kernel_thread(name: &str) -> bool {
    name.len() >= 2 && name.starts_with('[') && name.ends_with(']')
}

/// A process record together with the tier the classifier gave it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedProcess {
    pub record: ProcessRecord,
    pub tier: SafetyTier,
}

impl ClassifiedProcess {
    pub const fn new(record: ProcessRecord, tier: SafetyTier) -> Self {
        Self { record, tier }
    }
}

/// Pure classifier over a fixed set of name tables
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    tables: NameTables,
}

impl Classifier {
    pub const fn new(tables: NameTables) -> Self {
        Self { tables }
    }

    /// The first rule that matches this record
    pub fn explain(&self, record: &ProcessRecord) -> ClassificationRule {
        RULES
            .into_iter()
            .find(|rule| rule.matches(&self.tables, record))
            .unwrap_or(ClassificationRule::Unclassified)
    }

    /// Assign a safety tier. Total and deterministic.
    pub fn classify(&self, record: &ProcessRecord) -> SafetyTier {
        self.explain(record).tier()
    }

    /// Classify a whole scan, preserving order
    pub fn classify_all(&self, records: Vec<ProcessRecord>) -> Vec<ClassifiedProcess> {
        records
            .into_iter()
            .map(|record| {
                let tier = self.classify(&record);
                log::trace!("{} -> {}", record, tier);
                ClassifiedProcess::new(record, tier)
            })
            .collect()
    }

    /// Whether the name looks like a web browser. Independent of the tier.
    pub fn is_browser(&self, name: &str) -> bool {
        self.tables.is_browser_name(name)
    }
}
