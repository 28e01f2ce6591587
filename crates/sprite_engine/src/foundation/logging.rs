//! Logging setup
//!
//! The crate logs through the `log` facade: `trace!` per traversed node,
//! `debug!` per frame, `warn!` on scratch pool growth and `error!` when a
//! frame aborts. Binaries pick the backend; these helpers install
//! `env_logger`.

pub use log::{debug, error, info, trace, warn};

/// Initialize logging from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default filter when `RUST_LOG` is unset
pub fn init_with_default(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

/// Route log output through the test harness.
///
/// Safe to call from every test; only the first call installs the logger.
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}
