//! XMEML Core Library
//!
//! This library provides the schema model and XML codec for XMEML interchange
//! documents, the timeline model the decoder and encoder translate to and from,
//! and the small set of pure helpers both sides share.

pub mod ident;
pub mod metadata;
pub mod rate;
pub mod schema;
pub mod timeline;

pub use ident::sanitize_id;
pub use metadata::Metadata;
pub use rate::{fps_from_rate, is_drop_frame, rate_from_fps};
pub use schema::Xmeml;
pub use timeline::{
    Clip, Gap, ImageSequenceReference, Item, Marker, MarkerColor, MediaReference, RationalTime,
    TimeRange, Timeline, Track, TrackKind, Transition,
};

/// Result type for xmeml-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for xmeml-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("Document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("XML write error: {0}")]
    XmlWrite(String),

    #[error("Unexpected root element <{0}>, expected <xmeml>")]
    UnexpectedRoot(String),

    #[error("Invalid value for <{element}>: {value:?}")]
    InvalidValue { element: String, value: String },

    #[error("Duration unavailable for {0:?}: no source range and no available range")]
    DurationUnavailable(String),

    #[error("Invalid child {name:?}: {reason}")]
    InvalidChild { name: String, reason: String },
}
