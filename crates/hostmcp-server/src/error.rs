use std::io;
use thiserror::Error;

/// Failures starting or configuring the tool transport.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to start server runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("invalid cors setting: {0}")]
    Cors(String),
    #[error("server thread exited before binding")]
    ThreadExited,
}
