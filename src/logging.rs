use log::LevelFilter;
use log::LevelFilter::*;
use std::sync::Mutex;

static LOGGING_INITIALIZED: Mutex<bool> = Mutex::new(false);

/// Sets up logging to stdout. Subsequent calls are no-ops, so tests and
/// embedding processes may call it freely.
pub fn init_logging(verbosity: LevelFilter) {
    {
        let mut lock = LOGGING_INITIALIZED.lock().unwrap();

        if *lock {
            return;
        }

        *lock = true;
    }

    fern::Dispatch::new()
        .level(verbosity)
        .format(|out, message, record| {
            if record.level() >= Debug {
                out.finish(format_args!(
                    "[{}] {}: {}",
                    record.level(),
                    record.target(),
                    message
                ))
            } else if record.level() <= Warn {
                out.finish(format_args!("[{}] {}", record.level(), message))
            } else {
                out.finish(format_args!("{}", message))
            }
        })
        .chain(std::io::stdout())
        .apply()
        .expect("Failed to set up logging. init_logging should only be called once per process.");
}
