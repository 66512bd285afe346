//! XMEML Decoder Library
//!
//! This library translates XMEML interchange documents into the timeline model.
//! Only the first sequence of a document is translated.

mod decoder;
pub mod lift;
pub mod media;

pub use decoder::Decoder;

use std::io::Read;
use xmeml_core::Timeline;

/// Result type for xmeml-decoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for xmeml-decoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed document: {0}")]
    MalformedDocument(#[source] xmeml_core::Error),

    #[error("No sequence found in document")]
    NoSequenceFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XMEML core error: {0}")]
    Core(#[from] xmeml_core::Error),
}

/// Decoder configuration
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Insert gaps wherever an item starts past the end of the previous one
    pub reconstruct_gaps: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            reconstruct_gaps: true,
        }
    }
}

/// Decodes a document with the default configuration
pub fn decode<R: Read>(reader: R) -> Result<Timeline> {
    Decoder::new(DecoderConfig::default()).decode(reader)
}
