//! Shared pieces of the `psxrip` and `psxbuild` binaries: the stderr
//! logger and the exit-code policy.

use log::{Level, LevelFilter, Log, Metadata, Record};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

/// Exit code for command-line usage errors.
pub const EXIT_USAGE: u8 = 64;

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Warn => eprintln!(
                "{} {}",
                "Warning:".if_supports_color(Stderr, |t| t.yellow()),
                record.args()
            ),
            Level::Error => eprintln!(
                "{} {}",
                "Error:".if_supports_color(Stderr, |t| t.red()),
                record.args()
            ),
            _ => eprintln!("{}", record.args()),
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Install the stderr logger. Warnings always show; `verbose` raises the
/// level to informational.
pub fn init_logger(verbose: bool) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    });
}
