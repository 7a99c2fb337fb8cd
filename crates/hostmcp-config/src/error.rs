use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: json5::Error,
    },
    /// The merged value does not deserialize into the model.
    #[error("config does not match the model: {0}")]
    Decode(#[from] serde_json::Error),
    /// A field failed schema or invariant checks.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
}

impl ConfigError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(origin: impl Into<String>, source: json5::Error) -> Self {
        Self::Parse {
            origin: origin.into(),
            source,
        }
    }
}
