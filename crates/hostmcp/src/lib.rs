//! Public surface for hostmcp.
//!
//! Re-exports the building blocks and provides the startup sequence the
//! binary runs once the host answers.

mod startup;

/// Re-export for convenience.
pub use hostmcp_config as config;
/// Re-export for convenience.
pub use hostmcp_protocol as protocol;
/// Re-export for convenience.
pub use hostmcp_runtime as runtime;
/// Re-export for convenience.
pub use hostmcp_server as server;
/// Re-export for convenience.
pub use hostmcp_tools as tools;

pub use startup::{
    CommandPreparer, DependencyPreparer, StartupError, StartupReport, StartupSequence,
    poll_schedule, readiness_probe,
};

/// Initialize `env_logger` with millisecond timestamps, honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}
