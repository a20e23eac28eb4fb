//! Logging setup
//!
//! The library only emits through the `log` facade. Binaries and tests that
//! want output can call [`init_logging`] once at startup.

/// Install `env_logger`, honouring `RUST_LOG`. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Logging is disabled without the `debug` feature
#[cfg(not(feature = "debug"))]
pub fn init_logging() {}
