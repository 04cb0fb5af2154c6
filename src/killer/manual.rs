// Operator-invoked termination of a single PID

use super::signals::{KillResult, SignalKind, SignalSender};
use crate::classifier::{Classifier, SafetyTier};
use crate::monitor::{find_process, ProcessRecord, ProcessSource};
use std::io::{BufRead, Write};

/// Phrase that must be typed to kill a critical process with --force
pub const CRITICAL_ACKNOWLEDGMENT: &str = "I UNDERSTAND THE RISK";

/// Asks the operator before a manual kill
pub trait Confirm {
    /// Yes/no question; anything but an explicit yes is a no
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool>;

    /// The operator must type `phrase` exactly
    fn acknowledge(&mut self, prompt: &str, phrase: &str) -> anyhow::Result<bool>;
}

/// Line-oriented prompt over any reader/writer pair (stdin/stdout in the CLI)
pub struct LineConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConfirm<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> anyhow::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Confirm for LineConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool> {
        let answer = self.ask(&format!("{prompt} (y/N): "))?.to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    fn acknowledge(&mut self, prompt: &str, phrase: &str) -> anyhow::Result<bool> {
        let answer = self.ask(&format!("{prompt}\nType '{phrase}' to continue: "))?;
        Ok(answer == phrase)
    }
}

/// A manual kill request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualKillRequest {
    pub pid: i32,
    pub signal: SignalKind,
    pub force: bool,
}

/// Result of a manual kill that got past the safety checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualKillOutcome {
    /// The signal was sent; the result says whether it was delivered
    Sent {
        process: ProcessRecord,
        tier: SafetyTier,
        result: KillResult,
    },
    /// The operator declined at the prompt
    Cancelled {
        process: ProcessRecord,
        tier: SafetyTier,
    },
}

/// Reasons a manual kill is refused outright
#[derive(Debug, thiserror::Error)]
pub enum ManualKillError {
    #[error("process {pid} not found")]
    NotFound { pid: i32 },

    #[error("cannot kill critical process (PID {pid}, {name}) without --force flag")]
    CriticalRefused { pid: i32, name: String },

    #[error("{0:#}")]
    Source(anyhow::Error),

    #[error("failed to read confirmation: {0:#}")]
    Prompt(anyhow::Error),
}

/// Kill one PID after the tier-appropriate confirmation.
///
/// The process list is fetched fresh and searched for the PID, so the tier is
/// based on what is running right now. Critical processes are refused unless
/// `force` is set, and then need the typed acknowledgment phrase.
pub fn manual_kill<S, K, C>(
    source: &S,
    classifier: &Classifier,
    sender: &K,
    confirm: &mut C,
    request: ManualKillRequest,
) -> Result<ManualKillOutcome, ManualKillError>
where
    S: ProcessSource + ?Sized,
    K: SignalSender + ?Sized,
    C: Confirm + ?Sized,
{
    let process = find_process(source, request.pid).map_err(|e| {
        if e.downcast_ref::<crate::monitor::ProcessNotFound>().is_some() {
            ManualKillError::NotFound { pid: request.pid }
        } else {
            ManualKillError::Source(e)
        }
    })?;
    let tier = classifier.classify(&process);

    let approved = match tier {
        SafetyTier::Critical if !request.force => {
            log::warn!(
                "Refusing to kill critical process {} without --force",
                request.pid
            );
            return Err(ManualKillError::CriticalRefused {
                pid: request.pid,
                name: crate::sanitize_for_log(&process.name),
            });
        }
        SafetyTier::Critical => confirm
            .acknowledge(
                &format!(
                    "WARNING: KILLING CRITICAL PROCESS {} ({})! \
                     This may CRASH your system or cause data loss!",
                    request.pid,
                    crate::sanitize_for_log(&process.name)
                ),
                CRITICAL_ACKNOWLEDGMENT,
            )
            .map_err(ManualKillError::Prompt)?,
        SafetyTier::Important => confirm
            .confirm(&format!(
                "About to send {} to IMPORTANT process (PID {}). \
                 This may affect system services or running applications. Continue?",
                request.signal, request.pid
            ))
            .map_err(ManualKillError::Prompt)?,
        SafetyTier::Safe | SafetyTier::Unknown => confirm
            .confirm(&format!(
                "About to send {} to PID {}. Continue?",
                request.signal, request.pid
            ))
            .map_err(ManualKillError::Prompt)?,
    };

    if !approved {
        log::info!("Manual kill of PID {} cancelled", request.pid);
        return Ok(ManualKillOutcome::Cancelled { process, tier });
    }

    let result = sender.send(request.pid, request.signal);
    log::info!(
        "Manual {} to PID {} ({}): {}",
        request.signal,
        request.pid,
        crate::sanitize_for_log(&process.name),
        result.description()
    );

    Ok(ManualKillOutcome::Sent {
        process,
        tier,
        result,
    })
}
