//! Error types for mft-timeline
//!
//! Per-record and per-attribute failures are recoverable: the pipeline turns
//! them into skip events. Only configuration and I/O errors stop a run.

use thiserror::Error;

/// Main error type for MFT decoding operations
#[derive(Error, Debug)]
pub enum MftError {
    #[error("not an MFT record (missing FILE0 signature)")]
    NotAnMftRecord,

    #[error("record too short: needed {needed} bytes, got {got}")]
    TooShort { needed: usize, got: usize },

    #[error("{attribute} attribute too short: needed {needed} bytes, got {got}")]
    AttributeTooShort {
        attribute: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("non-resident {attribute} attribute encountered")]
    UnsupportedAttributeLayout { attribute: &'static str },

    #[error("data run at offset {offset} needs {needed} bytes, only {available} available")]
    TruncatedDataRun {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid data run: {0}")]
    InvalidDataRun(String),

    #[error("record {record_number} has no WIN32 or POSIX file name")]
    NoCanonicalName { record_number: u32 },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Coarse failure taxonomy used for reporting and skip decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedRecord,
    MalformedAttribute,
    UnsupportedAttributeLayout,
    TruncatedDataRun,
    Unnamed,
    Configuration,
    Io,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedRecord => "MalformedRecord",
            ErrorKind::MalformedAttribute => "MalformedAttribute",
            ErrorKind::UnsupportedAttributeLayout => "UnsupportedAttributeLayout",
            ErrorKind::TruncatedDataRun => "TruncatedDataRun",
            ErrorKind::Unnamed => "Unnamed",
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Io => "Io",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for mft-timeline operations
pub type Result<T> = std::result::Result<T, MftError>;

impl MftError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MftError::NotAnMftRecord | MftError::TooShort { .. } => ErrorKind::MalformedRecord,
            MftError::AttributeTooShort { .. } => ErrorKind::MalformedAttribute,
            MftError::UnsupportedAttributeLayout { .. } => ErrorKind::UnsupportedAttributeLayout,
            MftError::TruncatedDataRun { .. } | MftError::InvalidDataRun(_) => {
                ErrorKind::TruncatedDataRun
            }
            MftError::NoCanonicalName { .. } => ErrorKind::Unnamed,
            MftError::Configuration(_) => ErrorKind::Configuration,
            MftError::Io(_) => ErrorKind::Io,
            MftError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Check if this error is recoverable (stream can continue)
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Io | ErrorKind::Cancelled
        )
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        MftError::Configuration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_failures_are_recoverable() {
        assert!(MftError::NotAnMftRecord.is_recoverable());
        assert!(MftError::TooShort { needed: 0x38, got: 4 }.is_recoverable());
        assert!(MftError::InvalidDataRun("zero width".into()).is_recoverable());
        assert!(!MftError::config("bytes per cluster is 0").is_recoverable());
        assert!(!MftError::Cancelled.is_recoverable());
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(MftError::NotAnMftRecord.kind(), ErrorKind::MalformedRecord);
        assert_eq!(
            MftError::UnsupportedAttributeLayout { attribute: "$FILE_NAME" }.kind(),
            ErrorKind::UnsupportedAttributeLayout
        );
        assert_eq!(
            MftError::TruncatedDataRun { offset: 1, needed: 3, available: 1 }.kind(),
            ErrorKind::TruncatedDataRun
        );
        assert_eq!(ErrorKind::Configuration.to_string(), "ConfigurationError");
    }
}
