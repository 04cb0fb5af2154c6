// Built-in process name tables

/// Init, service managers and core system daemons
pub const CRITICAL_PROCESS_NAMES: &[&str] = &[
    "systemd",
    "init",
    "kthreadd",
    "kworker",
    "sshd",
    "dbus-daemon",
    "NetworkManager",
    "systemd-journald",
    "systemd-logind",
    "systemd-udevd",
    "systemd-networkd",
];

/// Schedulers, loggers, device managers and common server daemons
pub const IMPORTANT_PROCESS_NAMES: &[&str] = &[
    "cron",
    "crond",
    "rsyslog",
    "rsyslogd",
    "journald",
    "udev",
    "udevd",
    "nginx",
    "apache2",
    "httpd",
    "postgres",
    "postgresql",
    "mysqld",
    "mysql",
    "mongod",
    "mongodb",
    "redis-server",
    "dockerd",
    "containerd",
];

/// Lowercase browser names, matched as substrings
pub const BROWSER_PROCESS_NAMES: &[&str] = &[
    "chrome",
    "chromium",
    "firefox",
    "brave",
    "opera",
    "vivaldi",
    "safari",
    "edge",
    "msedge",
    "epiphany",
    "qutebrowser",
    "falkon",
    "palemoon",
    "waterfox",
    "seamonkey",
    "google-chrome",
];

/// Name lists consulted by the classifier.
///
/// Built once before the first scan and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTables {
    critical: Vec<String>,
    important: Vec<String>,
    browsers: Vec<String>,
}

impl NameTables {
    /// Built-in tables extended with operator-protected names
    pub fn with_protected<I, S>(protected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tables = Self::default();
        for name in protected {
            let name = name.into();
            let name = name.trim();
            if !name.is_empty() && !tables.critical.iter().any(|n| n == name) {
                tables.critical.push(name.to_string());
            }
        }
        tables
    }

    pub fn is_critical_name(&self, name: &str) -> bool {
        matches_prefix(&self.critical, name)
    }

    pub fn is_important_name(&self, name: &str) -> bool {
        matches_prefix(&self.important, name)
    }

    /// Case-insensitive substring match against the browser list
    pub fn is_browser_name(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.browsers.iter().any(|b| lower.contains(b.as_str()))
    }

    pub fn critical_names(&self) -> &[String] {
        &self.critical
    }
}

impl Default for NameTables {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|n| (*n).to_string()).collect();
        Self {
            critical: owned(CRITICAL_PROCESS_NAMES),
            important: owned(IMPORTANT_PROCESS_NAMES),
            browsers: owned(BROWSER_PROCESS_NAMES),
        }
    }
}

/// Exact or prefix match (an exact match is also a prefix match)
fn matches_prefix(table: &[String], name: &str) -> bool {
    table.iter().any(|entry| name.starts_with(entry.as_str()))
}
