// Process termination: the per-cycle executor and the manual kill path

mod executor;
pub mod manual;
pub mod signals;

pub use executor::{TerminationExecutor, TerminationOutcome};
pub use manual::{
    manual_kill, Confirm, LineConfirm, ManualKillError, ManualKillOutcome, ManualKillRequest,
    CRITICAL_ACKNOWLEDGMENT,
};
pub use signals::{KillResult, NixSignalSender, SignalKind, SignalSender, UnsupportedSignal};
