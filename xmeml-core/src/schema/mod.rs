//! XMEML schema model
//!
//! A typed tree mirroring the interchange XML. Values are plain data; reading
//! and writing live in [`read`] and [`write`].

mod read;
mod write;

/// Root `<xmeml>` element
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Xmeml {
    /// Value of the `version` attribute
    pub version: String,
    /// Top-level sequences, in file order
    pub sequences: Vec<Sequence>,
}

/// A `<sequence>`: a named timeline with video and audio tracks
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sequence {
    pub name: String,
    /// Total duration in frames
    pub duration: Option<i64>,
    pub rate: Rate,
    pub timecode: Option<Timecode>,
    pub media: Media,
    pub markers: Vec<Marker>,
}

/// Integer timebase plus the NTSC (x1000/1001) flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rate {
    pub timebase: u32,
    pub ntsc: bool,
}

/// Sequence `<timecode>`
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timecode {
    pub rate: Rate,
    pub string: Option<String>,
    pub frame: Option<i64>,
    pub display_format: Option<String>,
}

/// `<media>` container holding the optional video and audio groups
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Media {
    pub video: Option<TrackGroup>,
    pub audio: Option<TrackGroup>,
}

/// `<video>` or `<audio>`: an ordered list of tracks
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackGroup {
    pub tracks: Vec<Track>,
}

/// A `<track>`.
///
/// The three item kinds are stored in separate lists, exactly as the schema
/// does, so file order across kinds is lost. Items whose fields could not be
/// parsed are kept in `rejected` with whatever position was recoverable.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    pub enabled: Option<bool>,
    pub locked: Option<bool>,
    pub clip_items: Vec<ClipItem>,
    pub transition_items: Vec<TransitionItem>,
    pub generator_items: Vec<GeneratorItem>,
    pub rejected: Vec<RejectedItem>,
}

/// A track item that failed to parse
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RejectedItem {
    /// Element name (`clipitem`, `transitionitem`, `generatoritem`)
    pub element: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub reason: String,
}

/// A `<clipitem>`
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClipItem {
    pub id: Option<String>,
    pub name: String,
    pub enabled: Option<bool>,
    pub duration: i64,
    pub rate: Option<Rate>,
    /// Timeline position, inclusive
    pub start: i64,
    /// Timeline position, exclusive
    pub end: i64,
    /// Source media position
    pub in_point: i64,
    pub out_point: i64,
    pub file: Option<File>,
    /// Nested sequence, never resolved
    pub sequence: Option<Box<Sequence>>,
    pub source_track: Option<SourceTrack>,
    pub labels: Option<Labels>,
    pub comments: Vec<String>,
    pub links: Vec<Link>,
    pub filters: Vec<Filter>,
    pub effects: Vec<Effect>,
    pub markers: Vec<Marker>,
}

/// A `<file>` media reference
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct File {
    pub id: String,
    pub name: String,
    pub path_url: Option<String>,
    pub rate: Option<Rate>,
    pub duration: Option<i64>,
}

impl File {
    /// True when the element only points back to an earlier definition by id
    pub fn is_back_reference(&self) -> bool {
        self.name.is_empty() && self.path_url.is_none() && self.duration.is_none()
    }
}

/// `<sourcetrack>`
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceTrack {
    pub media_type: String,
    pub track_index: Option<i64>,
}

/// `<labels>`
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Labels {
    pub label2: Option<String>,
}

/// `<link>` between clip items
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Link {
    pub link_clip_ref: String,
    pub media_type: Option<String>,
    pub track_index: Option<i64>,
}

/// A `<filter>` wrapping an effect
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Filter {
    pub enabled: Option<bool>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub effect: Option<Effect>,
}

/// An `<effect>`
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Effect {
    pub name: String,
    pub effect_id: String,
    pub effect_type: String,
    pub media_type: String,
    pub effect_category: Option<String>,
    pub duration: Option<i64>,
    pub start_ratio: Option<f64>,
    pub end_ratio: Option<f64>,
    pub reverse: Option<bool>,
    pub parameters: Vec<Parameter>,
}

/// An effect `<parameter>`
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    pub parameter_id: Option<String>,
    pub name: Option<String>,
    pub value: Option<String>,
    pub value_id: Option<String>,
    pub value_min: Option<f64>,
    pub value_max: Option<f64>,
    pub value_list: Option<String>,
}

/// A `<transitionitem>`. Its duration is `end - start`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionItem {
    pub name: String,
    pub rate: Option<Rate>,
    pub start: i64,
    pub end: i64,
    pub alignment: String,
    pub effect: Option<Effect>,
}

impl Default for TransitionItem {
    fn default() -> Self {
        Self {
            name: String::new(),
            rate: None,
            start: 0,
            end: 0,
            alignment: DEFAULT_ALIGNMENT.to_string(),
            effect: None,
        }
    }
}

/// Alignment used when a transition does not specify one
pub const DEFAULT_ALIGNMENT: &str = "center";

/// A `<generatoritem>` (slug, color bars, ...)
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratorItem {
    pub name: String,
    pub duration: i64,
    pub rate: Option<Rate>,
    pub start: i64,
    pub end: i64,
    pub in_point: Option<i64>,
    pub out_point: Option<i64>,
    pub enabled: Option<bool>,
    pub anamorphic: Option<bool>,
    pub alpha_type: Option<String>,
    pub effect: Option<Effect>,
    pub filters: Vec<Filter>,
    pub markers: Vec<Marker>,
}

/// A `<marker>`
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Marker {
    pub name: String,
    pub comment: Option<String>,
    pub in_point: i64,
    pub out_point: i64,
    pub color: Option<Color>,
}

/// Marker `<color>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub red: i64,
    pub green: i64,
    pub blue: i64,
    pub alpha: Option<i64>,
}

impl Xmeml {
    /// Creates a document with a single sequence
    pub fn new(version: impl Into<String>, sequence: Sequence) -> Self {
        Self {
            version: version.into(),
            sequences: vec![sequence],
        }
    }
}
