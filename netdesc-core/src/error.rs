//! Error types for netdesc-core.
//!
//! - [`enum@Error`] - Main error enum returned by the packet facade
//! - [`DescriptorError`] - Descriptor bytes or builder input that violate the layout
//! - [`BindFault`] - Raised by a header view while binding; only ever surfaces
//!   wrapped in [`Error::Binding`]
//!
//! Lookups never return errors; absence is `None`.

use thiserror::Error;

use crate::descriptor::DescriptorType;

/// Main error type for netdesc-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A header demanded by `get_header` is not present at this depth.
    #[error("Header not found: {name} (depth {depth})")]
    HeaderNotFound { name: &'static str, depth: usize },

    /// A header view failed to bind after a successful lookup.
    #[error("Failed to bind {header} in packet [{summary}]: {source}")]
    Binding {
        header: &'static str,
        summary: String,
        #[source]
        source: BindFault,
    },

    /// Invalid descriptor bytes or builder input.
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

/// Errors related to descriptor layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Buffer shorter than the layout requires.
    #[error("{descriptor}: buffer too short (need {needed} bytes, have {have})")]
    BufferTooShort {
        descriptor: DescriptorType,
        needed: usize,
        have: usize,
    },

    /// Record count field above the layout maximum.
    #[error("record count {count} exceeds maximum {max}")]
    TooManyRecords { count: usize, max: usize },

    /// Record extends past the captured bytes.
    #[error("record {index} ({end} bytes) extends past capture length {capture_length}")]
    RecordOutOfBounds {
        index: usize,
        end: usize,
        capture_length: usize,
    },

    /// Descriptor claims more captured bytes than the frame holds.
    #[error("capture length {capture_length} exceeds frame size {frame_len}")]
    CaptureLengthMismatch {
        capture_length: usize,
        frame_len: usize,
    },

    /// Options record pushed without a parent header.
    #[error("options record has no parent header")]
    OrphanOptions,

    /// Descriptor type cannot head a packet.
    #[error("{0} is not a packet descriptor")]
    NotPacketDescriptor(DescriptorType),
}

/// Fault raised by a header view while binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindFault {
    /// Located range is outside the bound data.
    #[error("range {offset}..{end} outside {len} bytes")]
    OutOfRange { offset: usize, end: usize, len: usize },

    /// View rejected the header bytes.
    #[error("{0}")]
    Rejected(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
