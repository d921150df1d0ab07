/// logging.rs — Diagnostics sink and binary logger setup
///
/// Library components never log through global state. Each one receives
/// a `&dyn Diagnostics` and reports skip/drop notices through it. The
/// binary wires `LogDiagnostics` to the `log` facade and initialises
/// `env_logger`; library callers that do not care pass `NoopDiagnostics`.
use std::io::Write;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

pub use log::Level;

/// Receiver for per-record notices and progress messages.
pub trait Diagnostics: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Forwards to the `log` facade under the `genoset` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "genoset", level, "{}", message);
    }
}

/// Keeps every message in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// True if any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|(_, m)| m.contains(needle))
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn log(&self, level: Level, message: &str) {
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((level, message.to_string()));
    }
}

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Initialise the process logger: `[HH:MM:SS] LEVEL: message` on stderr.
///
/// Info level when verbose, warn otherwise, unless `RUST_LOG` is set.
pub fn init_logger(verbose: bool) {
    START_TIME.set(Instant::now()).ok();
    let rust_log = std::env::var("RUST_LOG").ok();
    logger_builder(verbose, rust_log.as_deref()).init();
}

/// A non-empty `rust_log` directive list replaces the verbosity default.
fn logger_builder(verbose: bool, rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => {
            builder.parse_filters(directives);
        }
        None => {
            builder.filter_level(if verbose {
                log::LevelFilter::Info
            } else {
                log::LevelFilter::Warn
            });
        }
    }

    builder
        .format(|buf, record| {
            let elapsed = START_TIME.get_or_init(Instant::now).elapsed();
            let hours = elapsed.as_secs() / 3600;
            let minutes = (elapsed.as_secs() % 3600) / 60;
            let seconds = elapsed.as_secs() % 60;

            writeln!(
                buf,
                "[{:02}:{:02}:{:02}] {}: {}",
                hours,
                minutes,
                seconds,
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr);
    builder
}
