// Process enumeration and memory monitoring

mod meminfo;
mod process;

pub use meminfo::{AlertState, MemInfo, MemoryAlert, KIB_PER_GIB};
pub use process::{
    find_process, ProcessNotFound, ProcessRecord, ProcessSource, ProcessStatus, ProcfsSource,
    UNKNOWN_OOM_SCORE, UNKNOWN_PPID, UNKNOWN_UID,
};
