/*!
 * Error types for the elan-data library.
 *
 * This module contains custom error types for the different parts of the crate,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, editing or writing `.eaf` documents
#[derive(Error, Debug)]
pub enum EafError {
    /// Empty file path given to a constructor
    #[error("No file given")]
    NoFile,

    /// Error reading or writing a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML
    #[error("Malformed XML: {0}")]
    Xml(String),

    /// A required attribute is missing from a tag
    #[error("Missing attribute {attribute} on <{element}>")]
    MissingAttribute {
        /// Tag name
        element: String,
        /// Attribute name
        attribute: String,
    },

    /// A `CONSTRAINTS` value that is not one of the ELAN stereotypes
    #[error("Invalid stereotype: {0}")]
    InvalidStereotype(String),

    /// A tier points at a linguistic type that is not declared
    #[error("{tier} has unknown Linguistic Type Reference {type_ref}")]
    UnknownTierType {
        /// Tier ID
        tier: String,
        /// Referenced LINGUISTIC_TYPE_ID
        type_ref: String,
    },

    /// A subtier points at a parent tier that is not declared
    #[error("{tier} references unknown parent tier {parent}")]
    UnknownParent {
        /// Tier ID
        tier: String,
        /// Referenced PARENT_REF
        parent: String,
    },

    /// A tier with this name already exists
    #[error("Tier already exists: {0}")]
    DuplicateTier(String),

    /// No tier name given for a segment
    #[error("No tier given")]
    NoTier,

    /// Segment bounds are reversed
    #[error("Invalid segment bounds: start {start} is greater than end {end}")]
    InvalidBounds {
        /// Start (ms)
        start: u64,
        /// End (ms)
        end: u64,
    },

    /// No segment carries the requested annotation ID
    #[error("No segment matches the given ID {0}")]
    SegmentNotFound(String),

    /// Split points fall outside the segment
    #[error("Split times are out of bounds for segment {0}")]
    SplitOutOfBounds(String),

    /// Saving would overwrite an existing file
    #[error("{} already exists, refusing to overwrite it", .0.display())]
    FileExists(PathBuf),

    /// Snapshot (de)serialization failed
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Errors that can occur while loading or inspecting audio
#[derive(Error, Debug)]
pub enum AudioError {
    /// The document has no associated audio file
    #[error("ELAN_Data object has no associated audio file")]
    NoAudio,

    /// Error opening the audio file
    #[error("Audio file error: {0}")]
    Io(#[from] std::io::Error),

    /// The audio could not be decoded
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// A requested time window is not valid for the audio
    #[error("Invalid time range: {0}")]
    InvalidRange(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from document handling
    #[error("Document error: {0}")]
    Eaf(#[from] EafError),

    /// Error from audio handling
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

/// Wrap any XML library error as an [`EafError::Xml`]
pub(crate) fn xml_error<E: std::fmt::Display>(error: E) -> EafError {
    EafError::Xml(error.to_string())
}
