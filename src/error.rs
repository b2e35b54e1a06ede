//! Error type shared by every reader operation.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbnError {
    /// The file could not be opened, read or mapped.
    #[error("I/O error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A record index or range reaches past the last whole record.
    #[error("records [{index}, {index}+{count}) out of range (record_count={record_count})")]
    OutOfRange {
        index: usize,
        count: usize,
        record_count: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The record area does not divide evenly into records. Loads only log
    /// this; the partial record is never decoded.
    #[error("{remainder} trailing bytes do not form a whole {record_width}-byte record")]
    Truncated {
        remainder: usize,
        record_width: usize,
    },
}

impl DbnError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DbnError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, DbnError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_message_leaves_cause_to_source() {
        let err = DbnError::io("a.dbn", io::Error::new(io::ErrorKind::NotFound, "no such file"));
        assert_eq!(err.to_string(), "I/O error on \"a.dbn\"");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("no such file"));
    }
}
