//! Timeline model: tracks of clips, gaps and transitions
//!
//! This is the schema-agnostic side of the translation. Times are
//! [`RationalTime`] values (a frame count at a rate); anything without a typed
//! slot goes into the open [`Metadata`] map.

use crate::metadata::Metadata;
use crate::{Error, Result};
use std::fmt;
use std::ops::Add;

/// Rate used when there is nothing to derive one from
pub const DEFAULT_RATE: f64 = 24.0;

/// A point in time (or a length) expressed as `value` units at `rate` per second
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RationalTime {
    pub value: f64,
    pub rate: f64,
}

impl RationalTime {
    /// Creates a new rational time
    pub fn new(value: f64, rate: f64) -> Self {
        Self { value, rate }
    }

    /// Zero at the given rate
    pub fn zero(rate: f64) -> Self {
        Self::new(0.0, rate)
    }

    /// Converts to an equivalent time at another rate
    pub fn rescaled_to(&self, rate: f64) -> Self {
        if self.rate == rate || self.rate == 0.0 {
            return Self::new(self.value, rate);
        }
        Self::new(self.value * rate / self.rate, rate)
    }

    /// Whole frame count at the given rate
    pub fn to_frames(&self, rate: f64) -> i64 {
        self.rescaled_to(rate).value.round() as i64
    }

    /// Returns the time in seconds
    pub fn to_seconds(&self) -> f64 {
        if self.rate == 0.0 {
            0.0
        } else {
            self.value / self.rate
        }
    }
}

impl Add for RationalTime {
    type Output = RationalTime;

    /// The result is expressed at the left-hand side's rate
    fn add(self, other: RationalTime) -> RationalTime {
        RationalTime::new(self.value + other.rescaled_to(self.rate).value, self.rate)
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} frames @ {:.3} fps ({:.3}s)", self.value, self.rate, self.to_seconds())
    }
}

/// A start time plus a duration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeRange {
    pub start_time: RationalTime,
    pub duration: RationalTime,
}

impl TimeRange {
    /// Creates a new time range
    pub fn new(start_time: RationalTime, duration: RationalTime) -> Self {
        Self {
            start_time,
            duration,
        }
    }

    /// Builds a range from whole frames at one rate
    pub fn from_frames(start: f64, duration: f64, rate: f64) -> Self {
        Self::new(RationalTime::new(start, rate), RationalTime::new(duration, rate))
    }

    /// First time past the end of the range
    pub fn end_time_exclusive(&self) -> RationalTime {
        self.start_time + self.duration
    }
}

/// Kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackKind {
    Video,
    Audio,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Video => f.write_str("Video"),
            TrackKind::Audio => f.write_str("Audio"),
        }
    }
}

/// Fixed palette for marker colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MarkerColor {
    Pink,
    Red,
    Orange,
    Yellow,
    #[default]
    Green,
    Cyan,
    Blue,
    Purple,
    Magenta,
    Black,
    White,
}

/// A named range of interest on a clip or timeline
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Marker {
    pub name: String,
    pub marked_range: TimeRange,
    pub color: MarkerColor,
    pub comment: String,
    pub metadata: Metadata,
}

impl Marker {
    /// Creates a green marker with no comment
    pub fn new(name: impl Into<String>, marked_range: TimeRange) -> Self {
        Self {
            name: name.into(),
            marked_range,
            color: MarkerColor::default(),
            comment: String::new(),
            metadata: Metadata::new(),
        }
    }

    /// Sets the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// Image sequence media, addressed by a pattern rather than one file
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageSequenceReference {
    pub name: String,
    pub target_url_base: String,
    pub name_prefix: String,
    pub name_suffix: String,
    pub start_frame: i64,
    pub frame_step: i64,
    pub rate: f64,
    pub frame_zero_padding: usize,
    pub available_range: Option<TimeRange>,
    pub metadata: Metadata,
}

/// Where a clip's media comes from
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum MediaReference {
    /// A single media file
    External {
        name: String,
        target_url: String,
        available_range: Option<TimeRange>,
    },
    /// No media
    Missing { name: String },
    /// Synthesized media (slug, bars, solid color)
    Generator {
        name: String,
        generator_kind: String,
        parameters: Metadata,
        available_range: Option<TimeRange>,
    },
    /// Numbered still frames
    ImageSequence(ImageSequenceReference),
}

impl MediaReference {
    /// Creates a missing reference with an empty name
    pub fn missing() -> Self {
        MediaReference::Missing {
            name: String::new(),
        }
    }

    /// Creates an external reference
    pub fn external(
        name: impl Into<String>,
        target_url: impl Into<String>,
        available_range: Option<TimeRange>,
    ) -> Self {
        MediaReference::External {
            name: name.into(),
            target_url: target_url.into(),
            available_range,
        }
    }

    /// Returns the reference name
    pub fn name(&self) -> &str {
        match self {
            MediaReference::External { name, .. }
            | MediaReference::Missing { name }
            | MediaReference::Generator { name, .. } => name,
            MediaReference::ImageSequence(seq) => &seq.name,
        }
    }

    /// Returns the range of media available, if known
    pub fn available_range(&self) -> Option<TimeRange> {
        match self {
            MediaReference::External {
                available_range, ..
            }
            | MediaReference::Generator {
                available_range, ..
            } => *available_range,
            MediaReference::ImageSequence(seq) => seq.available_range,
            MediaReference::Missing { .. } => None,
        }
    }

    /// Checks if this is a missing reference
    pub fn is_missing(&self) -> bool {
        matches!(self, MediaReference::Missing { .. })
    }
}

impl Default for MediaReference {
    fn default() -> Self {
        MediaReference::missing()
    }
}

/// A trimmed piece of media placed on a track
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clip {
    pub name: String,
    pub enabled: bool,
    pub source_range: Option<TimeRange>,
    pub media_reference: MediaReference,
    pub markers: Vec<Marker>,
    pub metadata: Metadata,
}

impl Clip {
    /// Creates an enabled clip with no markers or metadata
    pub fn new(
        name: impl Into<String>,
        media_reference: MediaReference,
        source_range: Option<TimeRange>,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            source_range,
            media_reference,
            markers: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Adds markers
    pub fn with_markers(mut self, markers: Vec<Marker>) -> Self {
        self.markers = markers;
        self
    }

    /// Sets the metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The range of media used: the source range, else the available range
    pub fn trimmed_range(&self) -> Result<TimeRange> {
        self.source_range
            .or_else(|| self.media_reference.available_range())
            .ok_or_else(|| Error::DurationUnavailable(self.name.clone()))
    }

    /// Length of the clip on its track
    pub fn duration(&self) -> Result<RationalTime> {
        self.trimmed_range().map(|range| range.duration)
    }
}

/// Empty space on a track
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gap {
    pub name: String,
    pub duration: RationalTime,
    pub metadata: Metadata,
}

impl Gap {
    /// Creates an unnamed gap
    pub fn new(duration: RationalTime) -> Self {
        Self {
            name: String::new(),
            duration,
            metadata: Metadata::new(),
        }
    }
}

/// A transition around a cut, split into incoming and outgoing offsets
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    pub name: String,
    pub transition_type: String,
    pub in_offset: RationalTime,
    pub out_offset: RationalTime,
    pub metadata: Metadata,
}

/// Transition type for transitions carried over from interchange documents
pub const CUSTOM_TRANSITION: &str = "Custom_Transition";

impl Transition {
    /// Creates a custom transition
    pub fn new(name: impl Into<String>, in_offset: RationalTime, out_offset: RationalTime) -> Self {
        Self {
            name: name.into(),
            transition_type: CUSTOM_TRANSITION.to_string(),
            in_offset,
            out_offset,
            metadata: Metadata::new(),
        }
    }

    /// Total length, incoming plus outgoing
    pub fn duration(&self) -> RationalTime {
        self.in_offset + self.out_offset
    }
}

/// Any child of a track
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Item {
    Clip(Clip),
    Gap(Gap),
    Transition(Transition),
}

impl Item {
    /// Returns the item name
    pub fn name(&self) -> &str {
        match self {
            Item::Clip(clip) => &clip.name,
            Item::Gap(gap) => &gap.name,
            Item::Transition(transition) => &transition.name,
        }
    }

    /// Length of the item on its track
    pub fn duration(&self) -> Result<RationalTime> {
        match self {
            Item::Clip(clip) => clip.duration(),
            Item::Gap(gap) => Ok(gap.duration),
            Item::Transition(transition) => Ok(transition.duration()),
        }
    }

    /// Returns the item metadata
    pub fn metadata(&self) -> &Metadata {
        match self {
            Item::Clip(clip) => &clip.metadata,
            Item::Gap(gap) => &gap.metadata,
            Item::Transition(transition) => &transition.metadata,
        }
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, Item::Clip(_))
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Item::Gap(_))
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, Item::Transition(_))
    }

    pub fn as_clip(&self) -> Option<&Clip> {
        match self {
            Item::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn as_gap(&self) -> Option<&Gap> {
        match self {
            Item::Gap(gap) => Some(gap),
            _ => None,
        }
    }

    pub fn as_transition(&self) -> Option<&Transition> {
        match self {
            Item::Transition(transition) => Some(transition),
            _ => None,
        }
    }
}

impl From<Clip> for Item {
    fn from(clip: Clip) -> Self {
        Item::Clip(clip)
    }
}

impl From<Gap> for Item {
    fn from(gap: Gap) -> Self {
        Item::Gap(gap)
    }
}

impl From<Transition> for Item {
    fn from(transition: Transition) -> Self {
        Item::Transition(transition)
    }
}

/// An ordered sequence of items played one after the other
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    pub name: String,
    pub kind: TrackKind,
    pub enabled: bool,
    children: Vec<Item>,
    pub metadata: Metadata,
}

impl Track {
    /// Creates an empty, enabled track
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: true,
            children: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Appends an item after validating its timing.
    ///
    /// Clips whose duration cannot be resolved are accepted; their timing is
    /// checked when it is needed.
    pub fn append_child(&mut self, item: impl Into<Item>) -> Result<()> {
        let item = item.into();
        if let Ok(duration) = item.duration() {
            validate_time(item.name(), &duration)?;
        }
        if let Item::Transition(transition) = &item {
            validate_time(&transition.name, &transition.in_offset)?;
            validate_time(&transition.name, &transition.out_offset)?;
        }
        self.children.push(item);
        Ok(())
    }

    /// Returns the children in playback order
    pub fn children(&self) -> &[Item] {
        &self.children
    }

    /// Sum of the children's durations, at the first child's rate.
    ///
    /// Transitions take up track time here, matching how they are laid out
    /// in interchange documents.
    pub fn duration(&self) -> Result<RationalTime> {
        let mut total: Option<RationalTime> = None;
        for child in &self.children {
            let duration = child.duration()?;
            total = Some(match total {
                Some(t) => t + duration,
                None => duration,
            });
        }
        Ok(total.unwrap_or_else(|| RationalTime::zero(DEFAULT_RATE)))
    }
}

fn validate_time(name: &str, time: &RationalTime) -> Result<()> {
    if !time.value.is_finite() || time.value < 0.0 {
        return Err(Error::InvalidChild {
            name: name.to_string(),
            reason: format!("duration {} is negative or not finite", time.value),
        });
    }
    if !time.rate.is_finite() || time.rate <= 0.0 {
        return Err(Error::InvalidChild {
            name: name.to_string(),
            reason: format!("rate {} is not positive", time.rate),
        });
    }
    Ok(())
}

/// A named set of tracks
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timeline {
    pub name: String,
    pub global_start_time: Option<RationalTime>,
    pub tracks: Vec<Track>,
    pub markers: Vec<Marker>,
    pub metadata: Metadata,
}

impl Timeline {
    /// Creates an empty timeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global_start_time: None,
            tracks: Vec::new(),
            markers: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Appends a track
    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Video tracks, in order
    pub fn video_tracks(&self) -> Vec<&Track> {
        self.tracks_of(TrackKind::Video)
    }

    /// Audio tracks, in order
    pub fn audio_tracks(&self) -> Vec<&Track> {
        self.tracks_of(TrackKind::Audio)
    }

    fn tracks_of(&self, kind: TrackKind) -> Vec<&Track> {
        self.tracks.iter().filter(|t| t.kind == kind).collect()
    }

    /// Length of the longest track
    pub fn duration(&self) -> Result<RationalTime> {
        let mut longest: Option<RationalTime> = None;
        for track in &self.tracks {
            let duration = track.duration()?;
            if longest.map_or(true, |l| duration.to_seconds() > l.to_seconds()) {
                longest = Some(duration);
            }
        }
        Ok(longest.unwrap_or_else(|| RationalTime::zero(DEFAULT_RATE)))
    }
}
