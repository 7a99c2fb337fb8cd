//! Test helpers shared across hostmcp crates.

pub mod host;
pub mod operations;

pub use host::FakeHost;
pub use operations::{
    BlockingOperation, CountingOperation, EchoOperation, FailingOperation, FixedOperation,
    PanickingOperation, RecordingOperation, SleepingOperation,
};
