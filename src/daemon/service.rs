// Scan loop: enumerate, classify, evaluate, terminate, report

use crate::classifier::{ClassifiedProcess, Classifier, NameTables};
use crate::config::{Config, DEFAULT_INTERVAL};
use crate::killer::{SignalKind, SignalSender, TerminationExecutor, TerminationOutcome};
use crate::monitor::{AlertState, MemInfo, MemoryAlert, ProcessSource};
use crate::notify::NotificationManager;
use crate::policy::CleanupEvaluator;
use crate::report;
use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest single sleep while waiting for the next tick
const STOP_POLL: Duration = Duration::from_millis(100);

/// Memory figures observed during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStatus {
    pub meminfo: MemInfo,
    pub low: bool,
}

/// Everything one cycle produced, handed to the presentation layer
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub retained: Vec<ClassifiedProcess>,
    pub outcomes: Vec<TerminationOutcome>,
    pub memory: Option<MemoryStatus>,
}

/// Periodic scan-and-cleanup loop
pub struct ScanLoop<S, K> {
    config: Config,
    source: S,
    classifier: Classifier,
    evaluator: CleanupEvaluator,
    executor: TerminationExecutor<K>,
    memory_alert: Option<MemoryAlert>,
    notifier: NotificationManager,
    stop: Arc<AtomicBool>,
    cycles: u64,
}

impl<S: ProcessSource, K: SignalSender> ScanLoop<S, K> {
    pub fn new(config: Config, source: S, sender: K) -> Self {
        let tables = NameTables::with_protected(config.protect.iter().cloned());
        let classifier = Classifier::new(tables);
        let evaluator = CleanupEvaluator::new(config.policy.clone(), classifier.clone())
            .with_ignore_patterns(config.ignore.clone())
            .with_protected_pids([std::process::id() as i32]);
        let executor = TerminationExecutor::new(sender, SignalKind::Term, config.dry_run);
        let memory_alert = config
            .memory_alert
            .map(|alert| MemoryAlert::new(alert.threshold_gb, alert.cooldown));

        Self {
            config,
            source,
            classifier,
            evaluator,
            executor,
            memory_alert,
            notifier: NotificationManager::new(cfg!(feature = "dbus-notify")),
            stop: Arc::new(AtomicBool::new(false)),
            cycles: 0,
        }
    }

    /// Flag that ends the loop at the next tick boundary once set
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Install SIGINT/SIGTERM handlers, then run until one arrives
    pub fn run(&mut self) -> Result<()> {
        self.setup_signal_handlers()?;
        self.print_startup_info();
        self.run_loop();
        log::info!("OOM Saver monitor shutting down gracefully");
        Ok(())
    }

    /// Setup signal handlers for graceful shutdown
    fn setup_signal_handlers(&self) -> Result<()> {
        let stop = Arc::clone(&self.stop);
        ctrlc::set_handler(move || {
            log::info!("Received shutdown signal");
            stop.store(true, Ordering::SeqCst);
        })
        .map_err(|e| anyhow!("Failed to set signal handler: {}", e))?;

        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&self.stop))
            .context("Failed to register SIGTERM handler")?;

        Ok(())
    }

    fn print_startup_info(&self) {
        log::info!("=== OOM Saver v{} starting ===", env!("CARGO_PKG_VERSION"));
        log::info!("Monitoring processes every {:?}", self.config.interval);

        if self.config.auto_kill {
            log::info!("Cleanup policy: {}", self.evaluator.policy());
        } else {
            log::warn!("Auto-kill is DISABLED");
        }
        if !self.config.ignore.is_empty() {
            log::info!("Ignore processes: {} pattern(s)", self.config.ignore.len());
        }
        if !self.config.protect.is_empty() {
            log::info!("Protected names: {}", self.config.protect.join(", "));
        }
        if self.config.dry_run {
            log::warn!("DRY RUN MODE - will not actually kill processes");
        }
        if let Some(alert) = &self.config.memory_alert {
            log::info!(
                "Memory alerts enabled (threshold: {} GB available, cooldown: {} min)",
                alert.threshold_gb,
                alert.cooldown.as_secs() / 60
            );
        }
        if self.config.debug {
            log::debug!("Debug logging enabled");
        }
        log::info!("==========================================");
    }

    /// Run cycles until the stop flag is set.
    ///
    /// The first cycle starts immediately. Ticks are measured from the start
    /// of each cycle; a cycle that overruns the interval delays the next one
    /// instead of skipping it. A failed cycle is logged and the loop goes on.
    pub fn run_loop(&mut self) {
        while !self.stop.load(Ordering::SeqCst) {
            let started = Instant::now();

            match self.run_cycle() {
                Ok(cycle) => self.present(&cycle),
                Err(e) => log::error!("Scan cycle {} failed: {:#}", self.cycles, e),
            }

            self.wait_for_tick(started);
        }
    }

    fn wait_for_tick(&self, started: Instant) {
        let deadline = started
            .checked_add(self.config.interval)
            .unwrap_or_else(|| started + DEFAULT_INTERVAL);
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            std::thread::sleep(remaining.min(STOP_POLL));
        }
    }

    /// One complete cycle: every record is classified before any is evaluated
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;
        let memory = self.check_memory();

        let records = self
            .source
            .snapshot()
            .context("Error fetching processes")?;
        let classified = self.classifier.classify_all(records);

        if !self.config.auto_kill {
            return Ok(CycleReport {
                retained: classified,
                outcomes: Vec::new(),
                memory,
            });
        }

        let evaluation = self.evaluator.evaluate(classified);
        let outcomes = self.executor.execute(&evaluation.candidates);

        Ok(CycleReport {
            retained: evaluation.retained,
            outcomes,
            memory,
        })
    }

    /// Advisory only: never feeds into kill decisions
    fn check_memory(&mut self) -> Option<MemoryStatus> {
        let alert = self.memory_alert.as_mut()?;

        let meminfo = match MemInfo::read() {
            Ok(info) => info,
            Err(e) => {
                log::warn!("Error fetching memory stats: {:#}", e);
                return None;
            }
        };

        let now = Instant::now();
        let state = alert.check(&meminfo, now);
        if let AlertState::LowNotify(message) = &state {
            log::warn!("{}", message);
            match self.notifier.send_low_memory_alert(message) {
                Ok(()) => alert.record_sent(now),
                Err(e) => log::warn!("Failed to send desktop notification: {:#}", e),
            }
        }

        Some(MemoryStatus {
            meminfo,
            low: state.is_low(),
        })
    }

    fn present(&self, cycle: &CycleReport) {
        if let Some(memory) = &cycle.memory {
            if memory.low {
                log::warn!("{}", report::memory_line(&memory.meminfo, true));
            } else {
                log::info!("{}", report::memory_line(&memory.meminfo, false));
            }
        }

        if !cycle.outcomes.is_empty() {
            log::info!(
                "Cycle {} cleanup:\n{}",
                self.cycles,
                report::outcomes_summary(&cycle.outcomes)
            );
        }

        println!("{}\n", report::process_table(&cycle.retained, self.config.limit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::killer::KillResult;
    use crate::monitor::{ProcessRecord, ProcessStatus};
    use crate::policy::{CleanupPolicy, StructuredPolicy};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct FixedSource(Vec<ProcessRecord>);

    impl ProcessSource for FixedSource {
        fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
            Ok(self.0.clone())
        }
    }

    /// Fails every other call and raises the stop flag after `stop_after` calls
    struct FlakySource {
        calls: Cell<u32>,
        stop_after: u32,
        stop: RefCell<Option<Arc<AtomicBool>>>,
    }

    impl ProcessSource for FlakySource {
        fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n >= self.stop_after {
                if let Some(stop) = self.stop.borrow().as_ref() {
                    stop.store(true, Ordering::SeqCst);
                }
            }
            if n % 2 == 0 {
                anyhow::bail!("cannot read /proc");
            }
            Ok(vec![ProcessRecord::new(7, "defunct", ProcessStatus::Zombie)])
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSender {
        missing: Vec<i32>,
        calls: Rc<RefCell<Vec<i32>>>,
    }

    impl SignalSender for RecordingSender {
        fn send(&self, pid: i32, _signal: SignalKind) -> KillResult {
            self.calls.borrow_mut().push(pid);
            if self.missing.contains(&pid) {
                KillResult::NotFound
            } else {
                KillResult::Success
            }
        }
    }

    fn scenario_batch() -> Vec<ProcessRecord> {
        vec![
            ProcessRecord::new(1, "systemd", ProcessStatus::Running),
            ProcessRecord::new(50, "defunct", ProcessStatus::Zombie)
                .with_uid(1000)
                .with_oom_score(400),
            ProcessRecord::new(99, "defunct", ProcessStatus::Zombie)
                .with_uid(0)
                .with_ppid(1),
        ]
    }

    fn config(policy: CleanupPolicy) -> Config {
        Config {
            interval: Duration::from_millis(5),
            policy,
            ..Config::default()
        }
    }

    fn retained_pids(report: &CycleReport) -> Vec<i32> {
        report.retained.iter().map(|p| p.record.pid).collect()
    }

    #[test]
    fn test_legacy_cycle_kills_safe_zombies() {
        let sender = RecordingSender::default();
        let calls = Rc::clone(&sender.calls);
        let mut scan = ScanLoop::new(
            config(CleanupPolicy::LegacyZombie { kill_all: false }),
            FixedSource(scenario_batch()),
            sender,
        );

        let report = scan.run_cycle().unwrap();

        assert_eq!(*calls.borrow(), vec![50, 99]);
        assert_eq!(retained_pids(&report), vec![1]);
        assert!(report.outcomes.iter().all(|o| o.succeeded));
        assert!(report.memory.is_none());
    }

    #[test]
    fn test_zombies_only_gate_in_cycle() {
        let sender = RecordingSender::default();
        let calls = Rc::clone(&sender.calls);
        let policy = CleanupPolicy::Structured(StructuredPolicy {
            kill_user_processes: true,
            zombies_only: true,
            ..StructuredPolicy::default()
        });
        let mut scan = ScanLoop::new(
            config(policy),
            FixedSource(vec![
                ProcessRecord::new(300, "vim", ProcessStatus::Running).with_uid(2000),
            ]),
            sender,
        );

        let report = scan.run_cycle().unwrap();
        assert!(calls.borrow().is_empty());
        assert_eq!(retained_pids(&report), vec![300]);
    }

    #[test]
    fn test_vanished_candidate_does_not_stop_batch() {
        let sender = RecordingSender {
            missing: vec![50],
            ..RecordingSender::default()
        };
        let calls = Rc::clone(&sender.calls);
        let mut scan = ScanLoop::new(
            config(CleanupPolicy::LegacyZombie { kill_all: true }),
            FixedSource(scenario_batch()),
            sender,
        );

        let report = scan.run_cycle().unwrap();

        assert_eq!(*calls.borrow(), vec![50, 99]);
        assert_eq!(report.outcomes.len(), 2);
        assert!(!report.outcomes[0].succeeded);
        assert!(report.outcomes[0].error.is_some());
        assert!(report.outcomes[1].succeeded);
    }

    #[test]
    fn test_auto_kill_disabled_retains_everything() {
        let sender = RecordingSender::default();
        let calls = Rc::clone(&sender.calls);
        let mut scan = ScanLoop::new(
            Config {
                auto_kill: false,
                ..config(CleanupPolicy::LegacyZombie { kill_all: true })
            },
            FixedSource(scenario_batch()),
            sender,
        );

        let report = scan.run_cycle().unwrap();
        assert!(calls.borrow().is_empty());
        assert!(report.outcomes.is_empty());
        assert_eq!(retained_pids(&report), vec![1, 50, 99]);
    }

    #[test]
    fn test_own_pid_is_never_killed() {
        let own = std::process::id() as i32;
        let sender = RecordingSender::default();
        let calls = Rc::clone(&sender.calls);
        let policy = CleanupPolicy::Structured(StructuredPolicy {
            kill_user_processes: true,
            ..StructuredPolicy::default()
        });
        let mut scan = ScanLoop::new(
            config(policy),
            FixedSource(vec![
                ProcessRecord::new(own, "oom_saver", ProcessStatus::Running).with_uid(1000),
            ]),
            sender,
        );

        let report = scan.run_cycle().unwrap();
        assert!(calls.borrow().is_empty());
        assert_eq!(retained_pids(&report), vec![own]);
    }

    #[test]
    fn test_failed_cycles_do_not_stop_the_loop() {
        let sender = RecordingSender::default();
        let calls = Rc::clone(&sender.calls);
        let source = FlakySource {
            calls: Cell::new(0),
            stop_after: 4,
            stop: RefCell::new(None),
        };
        let mut scan = ScanLoop::new(
            config(CleanupPolicy::LegacyZombie { kill_all: false }),
            source,
            sender,
        );
        *scan.source.stop.borrow_mut() = Some(scan.stop_flag());

        scan.run_loop();

        assert_eq!(scan.cycles(), 4);
        assert_eq!(scan.source.calls.get(), 4);
        // Cycles 1 and 3 succeeded, 2 and 4 failed at enumeration
        assert_eq!(*calls.borrow(), vec![7, 7]);
    }

    #[test]
    fn test_unrepresentable_interval_does_not_panic() {
        let source = FlakySource {
            calls: Cell::new(0),
            stop_after: 1,
            stop: RefCell::new(None),
        };
        let mut scan = ScanLoop::new(
            Config {
                interval: Duration::MAX,
                ..config(CleanupPolicy::default())
            },
            source,
            RecordingSender::default(),
        );
        *scan.source.stop.borrow_mut() = Some(scan.stop_flag());

        scan.run_loop();
        assert_eq!(scan.cycles(), 1);
    }

    #[test]
    fn test_stop_flag_set_before_start() {
        let mut scan = ScanLoop::new(
            config(CleanupPolicy::default()),
            FixedSource(Vec::new()),
            RecordingSender::default(),
        );
        scan.stop_flag().store(true, Ordering::SeqCst);
        scan.run_loop();
        assert_eq!(scan.cycles(), 0);
    }
}
