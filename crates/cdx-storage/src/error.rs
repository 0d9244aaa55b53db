//! Error types for the CDX storage layer

use thiserror::Error;

use crate::schema::DelayType;

/// Result type for CDX operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while writing, reading or analysing CDX files
#[derive(Error, Debug)]
pub enum StorageError {
    /// File variant does not match the reader that opened it
    #[error("Format mismatch: expected a {expected} file, found {found}")]
    FormatMismatch {
        /// Variant required by the reader
        expected: DelayType,
        /// Variant recorded in the file
        found: DelayType,
    },

    /// Missing or malformed parameter, link group, frame or index
    #[error("Schema violation: {reason}")]
    SchemaViolation {
        /// Description of the violation
        reason: String,
    },

    /// Invalid writer or conversion configuration
    #[error("Configuration error: {reason}")]
    Config {
        /// Reason the configuration was rejected
        reason: String,
    },

    /// Record rejected because it breaks a data-integrity rule
    #[error("Integrity violation on link '{link}': {reason}")]
    Integrity {
        /// Link the record belongs to
        link: String,
        /// Description of the violation
        reason: String,
    },

    /// Requested time window lies outside the file
    #[error("Range error: window start {start_s} s, length {length_s} s does not fit file length {available_s} s")]
    Range {
        /// Requested window start in seconds
        start_s: f64,
        /// Requested window length in seconds (0 = to end of file)
        length_s: f64,
        /// Total duration of the file in seconds
        available_s: f64,
    },

    /// Non-finite or non-positive input where a logarithm is required
    #[error("Numeric degenerate input for {quantity}: {value}")]
    NumericDegenerate {
        /// Name of the offending quantity
        quantity: &'static str,
        /// Offending value
        value: f64,
    },

    /// Invalid magic number in binary format
    #[error("Invalid magic number: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        /// Expected magic number
        expected: [u8; 4],
        /// Found magic number
        found: [u8; 4],
    },

    /// Unsupported version
    #[error("Unsupported version: {version}, supported: {supported}")]
    UnsupportedVersion {
        /// Version found
        version: u32,
        /// Supported version
        supported: u32,
    },

    /// Checksum verification failed
    #[error("Checksum verification failed for {section}: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// File section that failed verification
        section: &'static str,
        /// Expected checksum
        expected: u32,
        /// Computed checksum
        computed: u32,
    },

    /// Link name not present in the file
    #[error("Link '{link}' not found")]
    LinkNotFound {
        /// Requested link name
        link: String,
    },

    /// Out of bounds access
    #[error("Index {index} out of bounds (max: {max})")]
    OutOfBounds {
        /// Index that was out of bounds
        index: u64,
        /// Number of available entries
        max: u64,
    },

    /// Operation on a handle that was already closed
    #[error("File handle already closed")]
    Closed,

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        /// Source I/O error
        source: std::io::Error,
    },
}

impl StorageError {
    /// Create a schema violation error
    pub fn schema(reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create an integrity violation for a link
    pub fn integrity(link: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Integrity {
            link: link.into(),
            reason: reason.into(),
        }
    }

    /// Create a link-not-found error
    pub fn link_not_found(link: impl Into<String>) -> Self {
        Self::LinkNotFound { link: link.into() }
    }
}
