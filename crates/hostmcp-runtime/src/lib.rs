//! Runtime plumbing between the host process and the tool layer.
//!
//! - [`bridge`] drives async host operations from synchronous call sites.
//! - [`readiness`] polls the host in the background and fires the startup
//!   callback at most once.

pub mod bridge;
pub mod readiness;

pub use bridge::{Bridge, BridgeCall, DEFAULT_BRIDGE_TIMEOUT, call_async};
pub use readiness::{
    HttpProbe, MonitorHandle, MonitorOutcome, PollSchedule, Probe, ProbeFailure,
    ReadinessMonitor, ReadinessState, ReadyOutcome, TcpProbe,
};
