use receipt_printer::{SessionConfig, TextEncoding};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Print server configuration
///
/// # Environment variables
///
/// Every field can be overridden from the environment (a `.env` file is
/// loaded first by the binary):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | QUEUE_CAPACITY | 100 | Jobs allowed to wait |
/// | MAX_CONCURRENT_JOBS | 1 | Jobs allowed to print at once |
/// | DISPATCHER_WORKERS | 1 | Dispatcher loops |
/// | ADMISSION_TIMEOUT_MS | 5000 | How long a dispatcher waits for a slot |
/// | PRINTER_ADDRESS | (unset) | `TCP:host[:port]`, unset means mock only |
/// | PRINTER_CONNECT_TIMEOUT_MS | 5000 | Hardware connect timeout |
/// | PRINTER_SETTLE_MS | 500 | Delay before disconnect |
/// | PRINTER_RETRY_PAUSE_MS | 100 | Pause in the already-connected recovery |
/// | PAPER_WIDTH | 48 | Characters per line |
/// | PRINTER_ENCODING | latin1 | `latin1` or `gbk` |
/// | ADMIN_TOKEN | hackathon2024 | Shared admin token |
/// | MAX_BODY_BYTES | 65536 | Largest print request body |
/// | MAX_COMMANDS | 512 | Largest normalized command list |
/// | MAX_SCRIPT_STATEMENTS | 512 | Largest script program |
/// | LOG_LEVEL | info | Log level |
/// | LOG_JSON | false | JSON console output |
/// | LOG_DIR | (unset) | Directory for rolling log files |
///
/// # Example
///
/// ```ignore
/// QUEUE_CAPACITY=15 PRINTER_ADDRESS=TCP:192.168.1.50 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity bound of the job queue
    pub queue_capacity: usize,
    /// Concurrency bound of the admission gate
    pub max_concurrent_jobs: usize,
    pub dispatcher_workers: usize,
    pub admission_timeout_ms: u64,

    // === Printer ===
    pub printer_address: Option<String>,
    pub printer_connect_timeout_ms: u64,
    pub printer_settle_ms: u64,
    pub printer_retry_pause_ms: u64,
    pub paper_width: usize,
    pub printer_encoding: TextEncoding,

    // === Limits ===
    pub admin_token: String,
    pub max_body_bytes: usize,
    pub max_commands: usize,
    pub max_script_statements: usize,

    // === Logging ===
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            queue_capacity: env_or("QUEUE_CAPACITY", 100),
            max_concurrent_jobs: env_or("MAX_CONCURRENT_JOBS", 1),
            dispatcher_workers: env_or("DISPATCHER_WORKERS", 1),
            admission_timeout_ms: env_or("ADMISSION_TIMEOUT_MS", 5000),

            printer_address: std::env::var("PRINTER_ADDRESS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            printer_connect_timeout_ms: env_or("PRINTER_CONNECT_TIMEOUT_MS", 5000),
            printer_settle_ms: env_or("PRINTER_SETTLE_MS", 500),
            printer_retry_pause_ms: env_or("PRINTER_RETRY_PAUSE_MS", 100),
            paper_width: env_or("PAPER_WIDTH", 48),
            printer_encoding: std::env::var("PRINTER_ENCODING")
                .ok()
                .and_then(|v| TextEncoding::parse(&v))
                .unwrap_or_default(),

            admin_token: std::env::var("ADMIN_TOKEN").unwrap_or_else(|_| "hackathon2024".into()),
            max_body_bytes: env_or("MAX_BODY_BYTES", 64 * 1024),
            max_commands: env_or("MAX_COMMANDS", 512),
            max_script_statements: env_or("MAX_SCRIPT_STATEMENTS", 512),

            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|v| !v.trim().is_empty()),
        }
    }

    /// Timing and rendering parameters for the hardware backend
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            connect_timeout: Duration::from_millis(self.printer_connect_timeout_ms),
            settle_delay: Duration::from_millis(self.printer_settle_ms),
            retry_pause: Duration::from_millis(self.printer_retry_pause_ms),
            paper_width: self.paper_width,
            encoding: self.printer_encoding,
        }
    }

    pub fn admission_timeout(&self) -> Duration {
        Duration::from_millis(self.admission_timeout_ms)
    }

    /// At least one slot and one worker, whatever the environment says
    pub(crate) fn normalized(mut self) -> Self {
        self.queue_capacity = self.queue_capacity.max(1);
        self.max_concurrent_jobs = self.max_concurrent_jobs.max(1);
        self.dispatcher_workers = self.dispatcher_workers.max(1);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
