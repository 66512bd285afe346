//! XMEML Encoder Library
//!
//! This library translates a timeline back into an XMEML interchange document.
//! Item positions are recomputed from durations and vendor metadata is lowered
//! back into effects, filters and the other fields it was lifted from.

mod encoder;
pub mod lower;
pub mod media;

pub use encoder::Encoder;

use std::io::Write;
use xmeml_core::timeline::DEFAULT_RATE;
use xmeml_core::Timeline;

/// Result type for xmeml-encoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for xmeml-encoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No timeline to encode")]
    NilTimeline,

    #[error("Duration unavailable for clip {name:?}")]
    DurationUnavailable { name: String },

    #[error("Media reference conversion failed: {0}")]
    MediaReferenceConversionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XMEML core error: {0}")]
    Core(#[from] xmeml_core::Error),

    #[error("XML write error: {0}")]
    Xml(String),
}

/// Encoder configuration
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Frame rate used when the timeline has no clip to take one from
    pub default_rate: f64,
    /// Value of the root `version` attribute
    pub version: String,
    /// Spaces per indentation level
    pub indent: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            default_rate: DEFAULT_RATE,
            version: "5".to_string(),
            indent: 2,
        }
    }
}

/// Encodes a timeline with the default configuration.
///
/// Fails with [`Error::NilTimeline`] when there is no timeline.
pub fn encode<W: Write>(timeline: Option<&Timeline>, writer: W) -> Result<()> {
    let timeline = timeline.ok_or(Error::NilTimeline)?;
    Encoder::new(EncoderConfig::default()).encode(timeline, writer)
}
