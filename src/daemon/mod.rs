// Daemon module - periodic scan-and-cleanup loop

mod service;

pub use service::{CycleReport, MemoryStatus, ScanLoop};

use crate::config::Config;
use crate::killer::NixSignalSender;
use crate::monitor::ProcfsSource;
use anyhow::Result;

/// Run the monitor against the live process table until SIGINT/SIGTERM
pub fn run(config: Config) -> Result<()> {
    let mut scan = ScanLoop::new(config, ProcfsSource, NixSignalSender);
    scan.run()
}
