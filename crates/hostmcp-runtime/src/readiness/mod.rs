//! Background readiness detection for the host service.
//!
//! A [`ReadinessMonitor`] polls the host with a [`Probe`] on its own thread
//! and runs the startup callback once the host answers. Every detection path
//! goes through [`ReadinessMonitor::notify_ready`], which consults the shared
//! [`ReadinessState`] so the callback fires at most once per process.

mod monitor;
mod probe;
mod state;

pub use monitor::{MonitorHandle, MonitorOutcome, PollSchedule, ReadinessMonitor, ReadyOutcome};
pub use probe::{HttpProbe, Probe, ProbeFailure, TcpProbe};
pub use state::ReadinessState;
