// Command-line argument parsing

use clap::{Parser, Subcommand};
use std::time::Duration;

/// Parse a monitoring interval: bare seconds (`5`) or a number with a
/// `ms`, `s`, `m` or `h` suffix (`500ms`, `2m`).
pub fn parse_interval(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: u64 = digits
        .parse()
        .map_err(|_| format!("invalid interval {value:?}, expected e.g. 5, 500ms, 10s, 2m"))?;

    let secs_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(amount)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => return Err(format!("unknown interval unit {unit:?} (use ms, s, m or h)")),
    };

    amount
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("interval {value:?} is too large"))
}

/// OOM Saver - process monitor and zombie reaper
///
/// Classifies every process by how safe it is to kill and, in monitor mode,
/// terminates zombies and runaway consumers according to a cleanup policy.
#[derive(Parser, Debug)]
#[command(name = "oom-saver")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Process monitor with safety classification and policy-based cleanup")]
#[command(long_about = None)]
pub struct Args {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    /// Use syslog instead of stdout/stderr for logging
    #[arg(long = "syslog", global = true)]
    pub syslog: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Monitor processes continuously and clean up according to policy
    Monitor(MonitorArgs),

    /// List all running processes
    List(ListArgs),

    /// Show process statistics grouped by status and safety level
    Stats,

    /// Show detailed classification info for a process
    Classify {
        /// Process ID to inspect
        pid: i32,
    },

    /// Kill a specific process by PID (critical processes need --force)
    Kill(KillArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct MonitorArgs {
    /// Monitoring interval, e.g. 5, 500ms, 10s, 2m (default: 5s)
    #[arg(short = 'i', long = "interval", value_name = "DURATION", value_parser = parse_interval)]
    pub interval: Option<Duration>,

    /// Maximum number of processes to display (default: 200)
    #[arg(short = 'l', long = "limit", value_name = "N")]
    pub limit: Option<usize>,

    /// Auto-kill all zombies including critical/important
    #[arg(long = "auto-kill-all-zombies")]
    pub auto_kill_all_zombies: bool,

    /// Disable automatic killing
    #[arg(long = "no-auto-kill")]
    pub no_auto_kill: bool,

    /// Enable custom cleanup configuration (the --kill-* flags below)
    #[arg(long = "use-config", conflicts_with = "auto_kill_all_zombies")]
    pub use_config: bool,

    /// Auto-kill user processes (UID >= 1000)
    #[arg(long = "kill-user-processes")]
    pub kill_user_processes: bool,

    /// Auto-kill browser processes
    #[arg(long = "kill-browsers")]
    pub kill_browsers: bool,

    /// Auto-kill safe level processes
    #[arg(long = "kill-safe")]
    pub kill_safe: bool,

    /// Auto-kill important level processes
    #[arg(long = "kill-important")]
    pub kill_important: bool,

    /// Minimum OOM score to kill (0 = disabled)
    #[arg(long = "min-oom-score", value_name = "SCORE", allow_negative_numbers = true)]
    pub min_oom_score: Option<i32>,

    /// Only kill zombie processes (ignore running processes)
    #[arg(long = "zombies-only")]
    pub zombies_only: bool,

    /// Enable desktop notifications for low memory
    #[arg(long = "memory-alert")]
    pub memory_alert: bool,

    /// Alert when available memory drops to this many GB (default: 3)
    #[arg(long = "memory-threshold", value_name = "GB")]
    pub memory_threshold: Option<u64>,

    /// Minutes between memory alerts (default: 15)
    #[arg(long = "memory-cooldown", value_name = "MINUTES")]
    pub memory_cooldown: Option<u64>,

    /// Never kill processes matching this regex (can be used multiple times)
    #[arg(long = "ignore", value_name = "REGEX")]
    pub ignore: Vec<String>,

    /// Treat processes with this name as critical (can be used multiple times)
    #[arg(long = "protect", value_name = "NAME")]
    pub protect: Vec<String>,

    /// Dry run mode - don't actually kill processes, just report what would be killed
    #[arg(long = "dryrun")]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Maximum number of processes to display
    #[arg(short = 'l', long = "limit", value_name = "N", default_value_t = 200)]
    pub limit: usize,

    /// Filter by status (e.g. zombie, running, sleeping)
    #[arg(short = 's', long = "status", value_name = "STATUS")]
    pub status: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct KillArgs {
    /// Process ID to kill
    pub pid: i32,

    /// Signal to send (SIGTERM or SIGKILL)
    #[arg(short = 's', long = "signal", default_value = "SIGTERM")]
    pub signal: String,

    /// Allow killing critical processes (asks for a typed acknowledgment)
    #[arg(short = 'f', long = "force")]
    pub force: bool,
}

impl Args {
    /// Parse arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_monitor_flags() {
        let args = Args::try_parse_from([
            "oom-saver",
            "monitor",
            "--use-config",
            "--kill-user-processes",
            "--zombies-only",
            "--min-oom-score",
            "600",
            "--ignore",
            "^keep",
            "-d",
        ])
        .unwrap();

        assert!(args.debug);
        let Command::Monitor(monitor) = args.command else {
            panic!("expected monitor subcommand");
        };
        assert!(monitor.use_config);
        assert!(monitor.kill_user_processes);
        assert!(monitor.zombies_only);
        assert_eq!(monitor.min_oom_score, Some(600));
        assert_eq!(monitor.ignore, vec!["^keep".to_string()]);
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("5"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_interval("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_interval("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_interval("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_interval("1h"), Ok(Duration::from_secs(3600)));

        assert!(parse_interval("").is_err());
        assert!(parse_interval("fast").is_err());
        assert!(parse_interval("5d").is_err());
        assert!(parse_interval("-5").is_err());
        assert!(parse_interval(&format!("{}h", u64::MAX)).is_err());
    }

    #[test]
    fn test_parse_sub_second_interval_flag() {
        let args = Args::try_parse_from(["oom-saver", "monitor", "-i", "250ms"]).unwrap();
        let Command::Monitor(monitor) = args.command else {
            panic!("expected monitor subcommand");
        };
        assert_eq!(monitor.interval, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_legacy_and_structured_are_exclusive() {
        let result = Args::try_parse_from([
            "oom-saver",
            "monitor",
            "--use-config",
            "--auto-kill-all-zombies",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_kill() {
        let args =
            Args::try_parse_from(["oom-saver", "kill", "1234", "-s", "SIGKILL", "-f"]).unwrap();
        let Command::Kill(kill) = args.command else {
            panic!("expected kill subcommand");
        };
        assert_eq!(kill.pid, 1234);
        assert_eq!(kill.signal, "SIGKILL");
        assert!(kill.force);
    }
}
