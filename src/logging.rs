use std::env;
use std::io::Write;

use log::{self, LevelFilter, Metadata, Record};

/// Environment variable holding the default log level.
pub const LOG_ENV: &str = "NAVAL_LOG";

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // Boards are rendered on stdout; keep diagnostics off it.
            let _ = writeln!(
                std::io::stderr().lock(),
                "{:<5} [{}] {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

/// Level from `override_level`, else from `NAVAL_LOG`, else `info`.
pub fn resolve_level(override_level: Option<LevelFilter>) -> LevelFilter {
    override_level.unwrap_or_else(|| {
        env::var(LOG_ENV)
            .ok()
            .and_then(|lvl| lvl.parse().ok())
            .unwrap_or(LevelFilter::Info)
    })
}

/// Install the stderr logger. Calling it again only adjusts the level.
pub fn init_logging(override_level: Option<LevelFilter>) {
    let level = resolve_level(override_level);
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
