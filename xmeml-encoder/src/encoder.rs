//! Translation of a timeline into an XMEML sequence

use crate::lower::{self, ClipItemExtras};
use crate::media::FileTable;
use crate::{EncoderConfig, Error, Result};
use serde_json::Value;
use std::io::Write;
use tracing::{debug, warn};
use xmeml_core::metadata::{self, Metadata};
use xmeml_core::rate::rate_from_fps;
use xmeml_core::schema::{
    ClipItem, Effect, GeneratorItem, Media, Parameter, Rate, Sequence, Timecode,
    Track as SchemaTrack, TrackGroup, TransitionItem, Xmeml, DEFAULT_ALIGNMENT,
};
use xmeml_core::timeline::DEFAULT_RATE;
use xmeml_core::{Clip, Item, MediaReference, Timeline, Track, Transition};

/// Rates closer than this are treated as equal
const RATE_EPSILON: f64 = 1e-6;

/// Encoder from timelines to XMEML documents
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    /// Creates a new encoder with the given configuration
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Encodes a timeline and writes the document
    pub fn encode<W: Write>(&self, timeline: &Timeline, writer: W) -> Result<()> {
        let document = self.to_document(timeline)?;
        document
            .write(writer, self.config.indent)
            .map_err(|e| match e {
                xmeml_core::Error::Io(io) => Error::Io(io),
                xmeml_core::Error::XmlWrite(message) => Error::Xml(message),
                other => Error::Core(other),
            })
    }

    /// Encodes a timeline into a string
    pub fn encode_to_string(&self, timeline: &Timeline) -> Result<String> {
        let mut buffer = Vec::new();
        self.encode(timeline, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Xml(e.to_string()))
    }

    /// The configured fallback rate, or 24 fps if it is not a usable rate
    fn default_rate(&self) -> f64 {
        let rate = self.config.default_rate;
        if rate.is_finite() && rate > 0.0 {
            rate
        } else {
            warn!("Ignoring default rate {}, using {} fps", rate, DEFAULT_RATE);
            DEFAULT_RATE
        }
    }

    /// Builds the schema document for a timeline without serializing it
    pub fn to_document(&self, timeline: &Timeline) -> Result<Xmeml> {
        let fps = working_rate(timeline).unwrap_or_else(|| self.default_rate());
        debug!("Encoding {:?} at {} fps", timeline.name, fps);

        let sequence = SequenceEncoder {
            fps,
            rate: rate_from_fps(fps),
            files: FileTable::new(),
        }
        .convert_timeline(timeline)?;

        Ok(Xmeml::new(self.config.version.clone(), sequence))
    }
}

/// Rate of the first clip with a known duration, video tracks first
fn working_rate(timeline: &Timeline) -> Option<f64> {
    timeline
        .video_tracks()
        .into_iter()
        .chain(timeline.audio_tracks())
        .flat_map(|track| track.children())
        .filter_map(Item::as_clip)
        .find_map(|clip| clip.duration().ok())
        .map(|duration| duration.rate)
        .filter(|rate| rate.is_finite() && *rate > 0.0)
}

fn duration_error(error: xmeml_core::Error) -> Error {
    match error {
        xmeml_core::Error::DurationUnavailable(name) => Error::DurationUnavailable { name },
        other => Error::Core(other),
    }
}

fn is_generator(clip: &Clip) -> bool {
    metadata::get_bool(&clip.metadata, metadata::GENERATOR) == Some(true)
        || matches!(clip.media_reference, MediaReference::Generator { .. })
}

fn is_nested_placeholder(clip: &Clip) -> bool {
    metadata::get_bool(&clip.metadata, metadata::NESTED_SEQUENCE) == Some(true)
}

/// Formats a frame count as non-drop `HH:MM:SS:FF`
fn timecode_string(frame: i64, timebase: u32) -> String {
    let timebase = i64::from(timebase.max(1));
    let frames = frame.rem_euclid(timebase);
    let seconds = frame.div_euclid(timebase);
    format!(
        "{:02}:{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60,
        frames
    )
}

/// Per-call state: the working rate and the files written so far
struct SequenceEncoder {
    fps: f64,
    rate: Rate,
    files: FileTable,
}

impl SequenceEncoder {
    fn convert_timeline(mut self, timeline: &Timeline) -> Result<Sequence> {
        let duration = timeline.duration().map_err(duration_error)?;

        let video = self.convert_group(&timeline.video_tracks())?;
        let audio = self.convert_group(&timeline.audio_tracks())?;

        Ok(Sequence {
            name: timeline.name.clone(),
            duration: Some(duration.to_frames(self.fps)),
            rate: self.rate,
            timecode: self.timecode(timeline),
            media: Media { video, audio },
            markers: lower::lower_markers(&timeline.markers, self.fps),
        })
    }

    /// Timecode from the global start time, or from the stored timecode
    /// string when there is no start time
    fn timecode(&self, timeline: &Timeline) -> Option<Timecode> {
        let stored_string = metadata::get_str(&timeline.metadata, metadata::TIMECODE_STRING);
        let stored_format = metadata::get_str(&timeline.metadata, metadata::TIMECODE_FORMAT);

        let Some(start) = timeline.global_start_time else {
            return stored_string.map(|string| Timecode {
                rate: self.rate,
                string: Some(string.to_string()),
                frame: None,
                display_format: stored_format.map(str::to_string),
            });
        };

        let fps = if start.rate > 0.0 { start.rate } else { self.fps };
        let rate = rate_from_fps(fps);
        let frame = start.value.round() as i64;

        let string = stored_string
            .map(str::to_string)
            .unwrap_or_else(|| timecode_string(frame, rate.timebase));
        let display_format = stored_format.unwrap_or("NDF").to_string();

        Some(Timecode {
            rate,
            string: Some(string),
            frame: Some(frame),
            display_format: Some(display_format),
        })
    }

    fn convert_group(&mut self, tracks: &[&Track]) -> Result<Option<TrackGroup>> {
        if tracks.is_empty() {
            return Ok(None);
        }
        let tracks = tracks
            .iter()
            .map(|track| self.convert_track(track))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(TrackGroup { tracks }))
    }

    fn convert_track(&mut self, track: &Track) -> Result<SchemaTrack> {
        let mut output = SchemaTrack {
            enabled: Some(track.enabled),
            locked: metadata::get_bool(&track.metadata, metadata::LOCKED),
            ..SchemaTrack::default()
        };

        let mut cursor: i64 = 0;
        for child in track.children() {
            match child {
                Item::Clip(clip) => {
                    let duration = self.clip_frames(clip)?;
                    if is_generator(clip) {
                        output
                            .generator_items
                            .push(self.convert_generator(clip, cursor, duration)?);
                    } else {
                        output
                            .clip_items
                            .push(self.convert_clip(clip, cursor, duration)?);
                    }
                    cursor += duration;
                }
                Item::Transition(transition) => {
                    let duration = transition.duration().to_frames(self.fps);
                    output
                        .transition_items
                        .push(self.convert_transition(transition, cursor, duration));
                    cursor += duration;
                }
                Item::Gap(gap) => {
                    cursor += gap.duration.to_frames(self.fps);
                }
                other => {
                    debug!("Skipping unsupported item {:?} on {}", other.name(), track.name);
                }
            }
        }

        debug!(
            "Encoded {} with {} clips, {} transitions, {} generators",
            track.name,
            output.clip_items.len(),
            output.transition_items.len(),
            output.generator_items.len()
        );
        Ok(output)
    }

    /// Clip length in working-rate frames
    fn clip_frames(&self, clip: &Clip) -> Result<i64> {
        let duration = clip.duration().map_err(duration_error)?;
        if (duration.rate - self.fps).abs() > RATE_EPSILON {
            warn!(
                "Clip {:?} at {} fps is rescaled to the sequence rate of {} fps",
                clip.name, duration.rate, self.fps
            );
        }
        Ok(duration.to_frames(self.fps))
    }

    fn in_point(&self, clip: &Clip) -> Result<i64> {
        let range = clip.trimmed_range().map_err(duration_error)?;
        Ok(range.start_time.to_frames(self.fps))
    }

    fn convert_clip(&mut self, clip: &Clip, start: i64, duration: i64) -> Result<ClipItem> {
        let in_point = self.in_point(clip)?;
        let ClipItemExtras {
            id,
            labels,
            comments,
            source_track,
            links,
            effects,
            filters,
        } = lower::clip_item_extras(&clip.metadata);

        let (file, sequence) = if is_nested_placeholder(clip) {
            let name = metadata::get_str(&clip.metadata, metadata::SEQUENCE_NAME)
                .unwrap_or(clip.name.as_str())
                .to_string();
            let nested = Sequence {
                name,
                duration: Some(duration),
                rate: self.rate,
                ..Sequence::default()
            };
            (None, Some(Box::new(nested)))
        } else {
            (self.files.file_for(&clip.media_reference, self.fps)?, None)
        };

        let media_duration = clip
            .media_reference
            .available_range()
            .map(|range| range.duration.to_frames(self.fps))
            .unwrap_or(duration);

        Ok(ClipItem {
            id,
            name: clip.name.clone(),
            enabled: Some(clip.enabled),
            duration: media_duration,
            rate: Some(self.rate),
            start,
            end: start + duration,
            in_point,
            out_point: in_point + duration,
            file,
            sequence,
            source_track,
            labels,
            comments,
            links,
            filters,
            effects,
            markers: lower::lower_markers(&clip.markers, self.fps),
        })
    }

    fn convert_generator(&self, clip: &Clip, start: i64, duration: i64) -> Result<GeneratorItem> {
        let in_point = self.in_point(clip)?;
        let name = if clip.name.is_empty() {
            metadata::get_str(&clip.metadata, metadata::GENERATOR_NAME)
                .unwrap_or_default()
                .to_string()
        } else {
            clip.name.clone()
        };

        let effect = metadata::get_object(&clip.metadata, metadata::EFFECT)
            .map(lower::effect_from_metadata)
            .or_else(|| generator_effect(&clip.media_reference));

        Ok(GeneratorItem {
            name,
            duration,
            rate: Some(self.rate),
            start,
            end: start + duration,
            in_point: Some(in_point),
            out_point: Some(in_point + duration),
            enabled: Some(clip.enabled),
            anamorphic: metadata::get_bool(&clip.metadata, metadata::ANAMORPHIC),
            alpha_type: metadata::get_str(&clip.metadata, metadata::ALPHA_TYPE).map(str::to_string),
            effect,
            filters: lower::filters_from_metadata(&clip.metadata, metadata::FILTERS),
            markers: lower::lower_markers(&clip.markers, self.fps),
        })
    }

    fn convert_transition(&self, transition: &Transition, start: i64, duration: i64) -> TransitionItem {
        TransitionItem {
            name: transition.name.clone(),
            rate: Some(self.rate),
            start,
            end: start + duration,
            alignment: metadata::get_str(&transition.metadata, metadata::ALIGNMENT)
                .unwrap_or(DEFAULT_ALIGNMENT)
                .to_string(),
            effect: metadata::get_object(&transition.metadata, metadata::EFFECT)
                .map(lower::effect_from_metadata),
        }
    }
}

/// Builds a generator effect from a generator reference when no effect was
/// kept in metadata
fn generator_effect(reference: &MediaReference) -> Option<Effect> {
    let MediaReference::Generator {
        generator_kind,
        parameters,
        ..
    } = reference
    else {
        return None;
    };

    Some(Effect {
        name: generator_kind.clone(),
        effect_id: generator_kind.clone(),
        effect_type: "generator".to_string(),
        media_type: "video".to_string(),
        parameters: generator_parameters(parameters),
        ..Effect::default()
    })
}

fn generator_parameters(parameters: &Metadata) -> Vec<Parameter> {
    parameters
        .iter()
        .map(|(key, value)| Parameter {
            parameter_id: Some(key.clone()),
            value: Some(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            ..Parameter::default()
        })
        .collect()
}
