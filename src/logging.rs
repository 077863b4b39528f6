use env_logger::{Builder, Target};
use log::{LevelFilter, SetLoggerError};
use std::io::Write;

/// Routes `log` records to stderr as PACE comment lines (`c LEVEL - message`), so they can be
/// interleaved with `.td` output without breaking validators.
///
/// `RUST_LOG` is honoured unless an explicit level is passed.
pub fn init_pace_logger(level: Option<LevelFilter>) -> Result<(), SetLoggerError> {
    let mut builder = Builder::from_default_env();
    builder
        .format(|buf, record| writeln!(buf, "c {} - {}", record.level(), record.args()))
        .target(Target::Stderr);
    if let Some(level) = level {
        builder.filter(None, level);
    }
    builder.try_init()
}

pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
