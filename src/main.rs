// OOM Saver - Main entry point

use nix::sys::mman::{mlockall, MlockAllFlags};
use oom_saver::classifier::Classifier;
use oom_saver::config::{debug_from_env, Args, Command, Config};
use oom_saver::killer::{LineConfirm, NixSignalSender};
use oom_saver::monitor::ProcfsSource;
use oom_saver::{commands, daemon};
use std::io;
use std::process;

/// Setup logging based on configuration
fn setup_logging(debug: bool, use_syslog: bool) {
    let log_level = if debug { "debug" } else { "info" };

    if use_syslog {
        #[cfg(feature = "syslog")]
        {
            use syslog::{BasicLogger, Facility, Formatter3164};
            let formatter = Formatter3164 {
                facility: Facility::LOG_DAEMON,
                hostname: None,
                process: "oom_saver".into(),
                pid: std::process::id(),
            };

            match syslog::unix(formatter) {
                Ok(logger) => {
                    let level = if debug {
                        log::LevelFilter::Debug
                    } else {
                        log::LevelFilter::Info
                    };
                    if log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
                        .map(|()| log::set_max_level(level))
                        .is_ok()
                    {
                        return;
                    }
                }
                Err(e) => eprintln!("Failed to connect to syslog: {e}"),
            }
        }

        #[cfg(not(feature = "syslog"))]
        eprintln!("Warning: --syslog requires the 'syslog' feature to be enabled");
    }

    // Fallback to env_logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();
}

/// Lock memory so the monitor stays responsive under memory pressure
fn lock_memory() {
    match mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
        Ok(()) => log::info!("Memory locked successfully - monitor will not be swapped"),
        Err(e) => {
            log::warn!("Failed to lock memory: {e}. Monitor may be slow under memory pressure.");
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let classifier = Classifier::default();

    match args.command {
        Command::Monitor(monitor_args) => {
            let config = match Config::from_monitor_args(monitor_args, args.debug) {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("Configuration error: {e:#}");
                    eprintln!("Use --help for usage information");
                    process::exit(1);
                }
            };
            lock_memory();
            daemon::run(config)
        }
        Command::List(list_args) => {
            println!("{}", commands::list(&ProcfsSource, &classifier, &list_args)?);
            Ok(())
        }
        Command::Stats => {
            println!("{}", commands::stats(&ProcfsSource, &classifier)?);
            Ok(())
        }
        Command::Classify { pid } => {
            println!("{}", commands::classify(&ProcfsSource, &classifier, pid)?);
            Ok(())
        }
        Command::Kill(kill_args) => {
            let mut confirm = LineConfirm::new(io::stdin().lock(), io::stdout());
            let message = commands::kill(
                &ProcfsSource,
                &classifier,
                &NixSignalSender,
                &mut confirm,
                &kill_args,
            )?;
            println!("{message}");
            Ok(())
        }
    }
}

fn main() {
    // Parse command-line arguments
    let mut args = Args::parse_args();
    args.debug |= debug_from_env();

    // Initialize logging based on debug flag and syslog option
    setup_logging(args.debug, args.syslog);

    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
