use core::sync::atomic::{AtomicBool, Ordering};
use debugcon::debugcon_trace;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Mirrors log records to the debug console and, while boot services are
/// alive, to the UEFI text console.
pub struct UefiLogger {
    console: AtomicBool,
}

static LOGGER: UefiLogger = UefiLogger::new();

impl UefiLogger {
    #[must_use]
    const fn new() -> Self {
        Self {
            console: AtomicBool::new(true),
        }
    }

    /// Install the logger. Call once during early init.
    ///
    /// # Errors
    /// Fails if another logger was installed first.
    pub fn init(max_level: LevelFilter) -> Result<&'static Self, SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(max_level);
        Ok(&LOGGER)
    }

    /// Stop writing to the UEFI console. Must happen before the first
    /// `ExitBootServices` attempt.
    pub fn detach_console(&self) {
        self.console.store(false, Ordering::Release);
    }

    /// Resume console output once the handoff has failed for good.
    pub fn attach_console(&self) {
        self.console.store(true, Ordering::Release);
    }
}

impl Log for UefiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // No allocation here: the logger may run right up to ExitBootServices.
        debugcon_trace!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );

        if self.console.load(Ordering::Acquire) {
            uefi::println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}
