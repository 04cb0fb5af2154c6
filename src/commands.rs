// One-shot subcommands: list, stats, classify, kill

use crate::classifier::Classifier;
use crate::config::{KillArgs, ListArgs};
use crate::killer::{
    manual_kill, Confirm, KillResult, ManualKillOutcome, ManualKillRequest, SignalKind,
    SignalSender,
};
use crate::monitor::{find_process, ProcessSource, ProcessStatus};
use crate::report::{self, ProcessStatistics};
use anyhow::{anyhow, bail, Result};

/// Classified process table, optionally filtered by status
pub fn list<S: ProcessSource + ?Sized>(
    source: &S,
    classifier: &Classifier,
    args: &ListArgs,
) -> Result<String> {
    let wanted = match args.status.as_deref() {
        Some(name) => Some(
            ProcessStatus::from_name(name)
                .ok_or_else(|| anyhow!("Unknown process status: {name}"))?,
        ),
        None => None,
    };

    let mut processes = classifier.classify_all(source.snapshot()?);
    if let Some(status) = wanted {
        processes.retain(|p| p.record.status == status);
    }

    Ok(report::process_table(&processes, args.limit))
}

pub fn stats<S: ProcessSource + ?Sized>(source: &S, classifier: &Classifier) -> Result<String> {
    let processes = classifier.classify_all(source.snapshot()?);
    Ok(ProcessStatistics::collect(&processes).to_string())
}

/// Classification details for one PID
pub fn classify<S: ProcessSource + ?Sized>(
    source: &S,
    classifier: &Classifier,
    pid: i32,
) -> Result<String> {
    let record = find_process(source, pid)?;
    let rule = classifier.explain(&record);
    let process = crate::classifier::ClassifiedProcess::new(record, rule.tier());
    Ok(report::classification_details(&process, rule))
}

/// Interactive kill of one PID. Fails unless the signal was delivered or the
/// operator cancelled.
pub fn kill<S, K, C>(
    source: &S,
    classifier: &Classifier,
    sender: &K,
    confirm: &mut C,
    args: &KillArgs,
) -> Result<String>
where
    S: ProcessSource + ?Sized,
    K: SignalSender + ?Sized,
    C: Confirm + ?Sized,
{
    let signal: SignalKind = args.signal.parse()?;
    let request = ManualKillRequest {
        pid: args.pid,
        signal,
        force: args.force,
    };

    match manual_kill(source, classifier, sender, confirm, request)? {
        ManualKillOutcome::Cancelled { .. } => Ok("Cancelled.".to_string()),
        ManualKillOutcome::Sent {
            result: KillResult::Success,
            process,
            tier,
        } => Ok(format!(
            "Sent {} to process {} ({}) [{}]",
            signal,
            process.pid,
            crate::sanitize_for_log(&process.name),
            tier
        )),
        ManualKillOutcome::Sent { result, .. } => {
            bail!("Failed to kill process {}: {}", args.pid, result.description())
        }
    }
}
