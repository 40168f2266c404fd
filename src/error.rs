/// Error taxonomy for interpreter-facing failures.
use thiserror::Error;

/// Broad class of a failure, used to pick the log level at the dispatch boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad command, bad buffer/viewer name, malformed arguments.
    UserInput,
    /// Corrupt or unreadable image, WCS/geometry failure, no object found.
    Data,
    /// Filesystem or external process failure.
    Environment,
}

#[derive(Debug, Error)]
pub enum ZViewError {
    #[error("No such buffer: '{0}'")]
    NoSuchBuffer(String),

    #[error("No such viewer: '{0}'")]
    NoSuchViewer(String),

    #[error("No viewers")]
    NoViewers,

    #[error("{0}")]
    UserInput(String),

    #[error("{0}")]
    Data(String),

    #[error("{0}")]
    Environment(String),
}

impl ZViewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ZViewError::NoSuchBuffer(_)
            | ZViewError::NoSuchViewer(_)
            | ZViewError::NoViewers
            | ZViewError::UserInput(_) => ErrorKind::UserInput,
            ZViewError::Data(_) => ErrorKind::Data,
            ZViewError::Environment(_) => ErrorKind::Environment,
        }
    }

    /// Classify a loader error: OS-level I/O failures are environment errors,
    /// everything else (bad header, truncated data) is a data error.
    pub fn from_load_error(err: &anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        match err.root_cause().downcast_ref::<std::io::Error>() {
            Some(io) if io.kind() != std::io::ErrorKind::UnexpectedEof => {
                ZViewError::Environment(message)
            }
            _ => ZViewError::Data(message),
        }
    }
}
