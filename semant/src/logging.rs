//! Logging configuration for the Bantam compiler
//!
//! Thin wrappers over `log` + `env_logger`. Levels as used here:
//!
//! - `warn!` - recoverable oddities that may indicate upstream bugs
//! - `debug!` - per-class / per-method progress of a pass
//! - `trace!` - scope transitions and per-expression detail
//!
//! Set `RUST_LOG` to control output at runtime, e.g.
//! `RUST_LOG=semant=trace` to watch the type checker walk scopes.

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging with sensible defaults (Warn level).
///
/// Only initializes once; subsequent calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Initialize logging with a specific level.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {}:{} - {}",
                    record.level(),
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.args()
                )
            })
            .init();
    });
}

/// Initialize logging from the `RUST_LOG` environment variable,
/// defaulting to Warn when unset.
pub fn init_from_env() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Initialize logging for tests. Safe to call from every test.
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}
