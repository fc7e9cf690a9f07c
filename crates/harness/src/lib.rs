pub mod desk;
pub mod flaky;

pub use desk::*;
pub use flaky::{Failure, FlakyStore};

/// Installs a fmt subscriber for test output, filtered by `RUST_LOG`. Safe to
/// call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
