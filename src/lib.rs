// OOM Saver - process safety classification and policy-based cleanup

pub mod classifier;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod killer;
pub mod monitor;
pub mod notify;
pub mod policy;
pub mod report;

// Re-export commonly used types
pub use classifier::{ClassifiedProcess, Classifier, SafetyTier};
pub use config::Config;
pub use monitor::{MemInfo, ProcessRecord, ProcessStatus};
pub use policy::{CleanupEvaluator, CleanupPolicy, StructuredPolicy};

/// Longest process name written to logs and tables
const MAX_LOGGED_NAME: usize = 128;

/// Make a process name safe to log.
///
/// Names come from /proc and are controlled by whoever started the process,
/// so control characters (newlines, escape sequences) are replaced and the
/// length is capped.
pub fn sanitize_for_log(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { '?' } else { c })
        .take(MAX_LOGGED_NAME)
        .collect()
}
