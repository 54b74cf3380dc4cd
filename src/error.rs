/// Custom Result type for binvar operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the binvar library, encompassing all possible error cases
/// that can occur while assembling or decoding a container.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors related to container header processing
    HeaderError(#[from] HeaderError),
    /// Errors that occur while decoding a container
    ReadError(#[from] ReadError),
    /// Errors that occur while assembling a container
    WriteError(#[from] WriteError),
    /// Errors raised by the upstream variant and sequence feeds
    FeedError(#[from] FeedError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
    /// UTF-8 encoding/decoding errors
    Utf8Error(#[from] std::str::Utf8Error),
    /// Errors from the FASTA parser
    FastaError(#[from] seq_io::fasta::Error),
    /// Errors from transparent decompression of input files
    NifflerError(#[from] niffler::Error),
}

/// Errors specific to processing and validating container headers
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The magic number in the header does not match the expected value
    ///
    /// # Arguments
    /// * `u32` - The invalid magic number that was found
    #[error("Invalid magic number: {0:#x}")]
    InvalidMagicNumber(u32),

    /// The format version in the header is not supported
    #[error("Invalid format version: {0}")]
    InvalidFormatVersion(u8),

    /// The wire discipline code is not one of the known disciplines
    #[error("Invalid wire discipline code: {0}")]
    InvalidDiscipline(u8),

    /// The buffer is too small to hold a header
    ///
    /// # Arguments
    /// * First `usize` - The actual number of bytes provided
    /// * Second `usize` - The expected number of bytes
    #[error("Invalid number of bytes provided: {0}. Expected: {1}")]
    InvalidSize(usize, usize),
}

/// Errors that can occur while decoding a container
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file being read is not a regular file
    #[error("File is not regular")]
    IncompatibleFile,

    /// The reference or mask block is shorter than the declared reference length requires
    ///
    /// # Fields
    /// * `expected` - Number of bytes required by the declared reference length
    /// * `got` - Number of bytes available
    #[error("Reference section truncated: expected {expected} bytes, found {got}")]
    TruncatedReference { expected: usize, got: usize },

    /// The `META` trailer marker could not be located
    ///
    /// # Arguments
    /// * `usize` - The byte offset at which the marker was expected (or searched from)
    #[error("Missing META trailer (expected at or after byte {0})")]
    MissingTrailer(usize),
}

/// Errors that can occur while assembling a container
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// Attempted to finish a container without providing a reference sequence
    #[error("No reference sequence was provided to the writer")]
    MissingReference,

    /// A reference sequence was provided more than once
    #[error("Reference sequence was already set ({0} symbols)")]
    ReferenceAlreadySet(usize),

    /// The metadata block would exceed the 4-byte length field of the trailer
    #[error("Metadata block of {0} bytes does not fit the trailer length field")]
    MetadataOverflow(usize),
}

/// Errors raised by the upstream feeds
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    /// The sequence feed contained no records
    #[error("No sequence record found in reference input")]
    EmptyReference,
}
