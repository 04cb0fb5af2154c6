// Batch termination of policy candidates

use super::signals::{KillResult, SignalKind, SignalSender};
use crate::classifier::SafetyTier;
use crate::policy::{Candidate, KillReason};
use crate::sanitize_for_log;

/// What happened to one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationOutcome {
    pub pid: i32,
    pub name: String,
    pub tier: SafetyTier,
    pub reason: KillReason,
    pub signal: SignalKind,
    /// A signal was actually sent (false in dry-run mode)
    pub requested: bool,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl std::fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PID {} ({}) [{}, {}]: ",
            self.pid,
            sanitize_for_log(&self.name),
            self.tier,
            self.reason
        )?;
        match (&self.error, self.requested) {
            (_, false) => write!(f, "would send {} (dry run)", self.signal),
            (None, true) => write!(f, "sent {}", self.signal),
            (Some(err), true) => write!(f, "failed to send {}: {}", self.signal, err),
        }
    }
}

/// Sends the termination signal to every candidate of a cycle
#[derive(Debug, Clone)]
pub struct TerminationExecutor<K> {
    sender: K,
    signal: SignalKind,
    dry_run: bool,
}

impl<K: SignalSender> TerminationExecutor<K> {
    pub const fn new(sender: K, signal: SignalKind, dry_run: bool) -> Self {
        Self {
            sender,
            signal,
            dry_run,
        }
    }

    pub const fn sender(&self) -> &K {
        &self.sender
    }

    /// Signal every candidate in order.
    ///
    /// A failure for one PID is recorded in its outcome and does not stop
    /// the rest of the batch.
    pub fn execute(&self, candidates: &[Candidate]) -> Vec<TerminationOutcome> {
        candidates.iter().map(|c| self.terminate(c)).collect()
    }

    fn terminate(&self, candidate: &Candidate) -> TerminationOutcome {
        let record = &candidate.process.record;
        let mut outcome = TerminationOutcome {
            pid: record.pid,
            name: record.name.clone(),
            tier: candidate.process.tier,
            reason: candidate.reason,
            signal: self.signal,
            requested: false,
            succeeded: false,
            error: None,
        };

        if self.dry_run {
            log::info!(
                "DRY RUN: Would send {} to process {} ({})",
                self.signal,
                record.pid,
                sanitize_for_log(&record.name)
            );
            return outcome;
        }

        log::warn!(
            "Sending {} to {} process {} ({}) [{}]",
            self.signal,
            record.status,
            record.pid,
            sanitize_for_log(&record.name),
            candidate.process.tier
        );

        outcome.requested = true;
        match self.sender.send(record.pid, self.signal) {
            KillResult::Success => outcome.succeeded = true,
            failure => {
                // The process may simply have exited since the scan
                log::warn!(
                    "Failed to send {} to PID {}: {}",
                    self.signal,
                    record.pid,
                    failure.description()
                );
                outcome.error = Some(failure.description().to_string());
            }
        }

        outcome
    }
}
