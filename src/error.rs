use std::path::PathBuf;

/// Custom Result type for genoseek operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the genoseek library, encompassing all possible error cases
/// that can occur while indexing and reading genotype files.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors related to building, loading or validating the side-car index
    #[error("Error processing index: {0}")]
    IndexError(#[from] IndexError),

    /// Errors that occur while reading and decoding records
    #[error("Error reading file: {0}")]
    ReadError(#[from] ReadError),

    /// Errors in the reader configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    /// An optional capability is required to open the file but is not available
    #[error("Missing capability: {0} support is required to read this file")]
    MissingCapability(&'static str),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),

    /// UTF-8 conversion errors
    #[error("Error with UTF8: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// Errors from the CSV layer of the index payload
    CsvError(#[from] csv::Error),
}
impl Error {
    /// Checks if the error means the side-car index must be rebuilt
    ///
    /// Both a corrupt index (header or payload mismatch) and a stale index
    /// (missing columns) are recoverable only by regenerating the index.
    #[must_use]
    pub fn is_rebuild_required(&self) -> bool {
        match self {
            Self::IndexError(err) => err.is_rebuild_required(),
            _ => false,
        }
    }

    /// Checks if the error reports an operation that needs an index (or index columns)
    /// that the reader does not have
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::ReadError(ReadError::UnsupportedOperation { .. }))
    }
}

/// Errors related to the side-car index
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The leading bytes of the side-car are not the expected header
    #[error("{0}: not a valid index file")]
    InvalidHeader(PathBuf),

    /// The header matched but the payload could not be decompressed or parsed
    #[error("{path}: corrupted index payload ({reason})")]
    CorruptPayload { path: PathBuf, reason: String },

    /// The index is readable but lacks columns the caller requires
    #[error("{path}: missing index columns [{}]: reindex", .missing.join(", "))]
    MissingColumns {
        path: PathBuf,
        missing: Vec<String>,
    },

    /// An identifier is still duplicated after disambiguation
    ///
    /// This happens when the file already contains an identifier equal to one of the
    /// generated aliases (e.g. a literal `rs1:dup1`).
    #[error("Identifier {0} is not unique after disambiguation")]
    UnresolvedDuplicate(String),

    /// The identifier column was not requested when building the index
    #[error("The index requires a name column")]
    MissingNameColumn,

    /// Only one of the chromosome and position columns was requested
    #[error("Chromosome and position columns must be indexed together")]
    PartialLocation,

    /// Two consecutive rows do not have strictly increasing offsets
    ///
    /// The first parameter is the row, the second the offending offset
    #[error("Index row {0} has a non-increasing offset ({1})")]
    NonIncreasingOffset(usize, u64),
}
impl IndexError {
    /// Checks if this error can only be fixed by regenerating the index
    #[must_use]
    pub fn is_rebuild_required(&self) -> bool {
        matches!(
            self,
            Self::InvalidHeader(_)
                | Self::CorruptPayload { .. }
                | Self::MissingColumns { .. }
                | Self::NonIncreasingOffset(_, _)
        )
    }
}

/// Errors that can occur while reading genotype records
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The operation needs random access that the reader cannot provide
    #[error("{operation} is not supported: {reason}")]
    UnsupportedOperation {
        operation: &'static str,
        reason: &'static str,
    },

    /// The record found at an indexed offset is not the one the index expects
    #[error("Index file not synced with data file: expected {expected} at offset {offset}, found {found}")]
    IndexOutOfSync {
        expected: String,
        found: String,
        offset: u64,
    },

    /// A data line could not be decoded
    ///
    /// * `line` - 1-based line number when known, 0 for random access reads
    #[error("Malformed record (line {line}): {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A chromosome token outside of the supported alphabet
    #[error("Invalid chromosome: {0}")]
    InvalidChromosome(String),

    /// The number of probability triples does not match the number of samples
    #[error("Record {name} has {found} samples but {expected} were expected")]
    SampleCountMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// The file is gzip compressed but not in the seekable BGZF container
    #[error("{0}: compressed with gzip, recompress with bgzip for random access")]
    UnsupportedCompression(PathBuf),

    /// The reader has been closed
    #[error("The reader has been closed")]
    Closed,
}
impl ReadError {
    pub(crate) fn unsupported(operation: &'static str, reason: &'static str) -> Self {
        Self::UnsupportedOperation { operation, reason }
    }

    pub(crate) fn malformed<S: Into<String>>(line: usize, reason: S) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors in a reader configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The probability threshold is not within [0, 1]
    #[error("Probability threshold must be within [0, 1], found {0}")]
    InvalidThreshold(f64),
}
