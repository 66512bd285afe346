//! Translation of an XMEML sequence into a timeline

use crate::{lift, media, DecoderConfig, Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, warn};
use xmeml_core::metadata::{self, Metadata};
use xmeml_core::rate::{fps_from_rate, rate_from_fps, timecode_to_frames};
use xmeml_core::schema::{
    ClipItem, File, GeneratorItem, Rate, RejectedItem, Sequence, Track as SchemaTrack,
    TransitionItem, Xmeml,
};
use xmeml_core::timeline::DEFAULT_RATE;
use xmeml_core::{
    Clip, Gap, Item, MediaReference, RationalTime, TimeRange, Timeline, Track, TrackKind,
    Transition,
};

/// Decoder from XMEML documents to timelines
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a new decoder with the given configuration
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Reads and decodes a document
    pub fn decode<R: Read>(&self, reader: R) -> Result<Timeline> {
        let document = Xmeml::read(reader).map_err(|e| match e {
            xmeml_core::Error::Io(io) => Error::Io(io),
            other => Error::MalformedDocument(other),
        })?;
        self.decode_document(&document)
    }

    /// Decodes a document held in a string
    pub fn decode_str(&self, xml: &str) -> Result<Timeline> {
        self.decode(xml.as_bytes())
    }

    /// Translates the first sequence of a parsed document
    pub fn decode_document(&self, document: &Xmeml) -> Result<Timeline> {
        let sequence = document.sequences.first().ok_or(Error::NoSequenceFound)?;
        if document.sequences.len() > 1 {
            debug!(
                "Ignoring {} sequences after the first",
                document.sequences.len() - 1
            );
        }

        SequenceDecoder {
            config: &self.config,
            sequence_fps: sequence_fps(&sequence.rate),
            files: HashMap::new(),
        }
        .convert_sequence(sequence)
    }
}

fn sequence_fps(rate: &Rate) -> f64 {
    if rate.timebase > 0 {
        fps_from_rate(rate)
    } else {
        DEFAULT_RATE
    }
}

/// Per-call state: the sequence rate and the file definitions seen so far
struct SequenceDecoder<'a> {
    config: &'a DecoderConfig,
    sequence_fps: f64,
    files: HashMap<String, File>,
}

/// Any track item with an absolute position
enum Positioned<'a> {
    Clip(&'a ClipItem),
    Transition(&'a TransitionItem),
    Generator(&'a GeneratorItem),
    Rejected(&'a RejectedItem),
}

/// Start or end of an item that sits against a transition
const UNSET_EDGE: i64 = -1;

/// Fills in an edge left as `-1` from the other edge and the item length
fn resolve_span(start: i64, end: i64, length: i64) -> (i64, i64) {
    match (start, end) {
        (UNSET_EDGE, UNSET_EDGE) => (start, end),
        (UNSET_EDGE, end) => (end - length, end),
        (start, UNSET_EDGE) => (start, start + length),
        span => span,
    }
}

fn generator_length(item: &GeneratorItem) -> i64 {
    match (item.in_point, item.out_point) {
        (Some(in_point), Some(out_point)) => out_point - in_point,
        _ => item.duration,
    }
}

/// Tie-break rank of an element: clips, then transitions, then generators
fn kind_rank(element: &str) -> u8 {
    match element {
        "clipitem" => 0,
        "transitionitem" => 1,
        _ => 2,
    }
}

impl Positioned<'_> {
    fn span(&self) -> (i64, Option<i64>) {
        match self {
            Positioned::Clip(item) => {
                let (start, end) =
                    resolve_span(item.start, item.end, item.out_point - item.in_point);
                (start, Some(end))
            }
            Positioned::Transition(item) => (item.start, Some(item.end)),
            Positioned::Generator(item) => {
                let (start, end) = resolve_span(item.start, item.end, generator_length(item));
                (start, Some(end))
            }
            Positioned::Rejected(item) => (item.start.unwrap_or_default(), item.end),
        }
    }

    fn start(&self) -> i64 {
        self.span().0
    }

    fn end(&self) -> Option<i64> {
        self.span().1
    }

    fn rank(&self) -> u8 {
        match self {
            Positioned::Clip(_) => kind_rank("clipitem"),
            Positioned::Transition(_) => kind_rank("transitionitem"),
            Positioned::Generator(_) => kind_rank("generatoritem"),
            Positioned::Rejected(item) => kind_rank(&item.element),
        }
    }
}

/// Collects the items of a track sorted by start.
///
/// Equal starts keep the order clips, transitions, generators. An item that
/// failed to parse takes the slot of its element kind.
fn ordered_items(track: &SchemaTrack) -> Vec<Positioned<'_>> {
    let mut items: Vec<Positioned> = track
        .clip_items
        .iter()
        .map(Positioned::Clip)
        .chain(track.transition_items.iter().map(Positioned::Transition))
        .chain(track.generator_items.iter().map(Positioned::Generator))
        .chain(
            track
                .rejected
                .iter()
                .filter(|r| r.start.is_some())
                .map(Positioned::Rejected),
        )
        .collect();

    items.sort_by_key(|item| (item.start(), item.rank()));
    items
}

impl SequenceDecoder<'_> {
    fn convert_sequence(mut self, sequence: &Sequence) -> Result<Timeline> {
        let mut timeline = Timeline::new(sequence.name.clone());

        if let Some(timecode) = &sequence.timecode {
            let rate = if timecode.rate.timebase > 0 {
                timecode.rate
            } else {
                rate_from_fps(self.sequence_fps)
            };
            let fps = fps_from_rate(&rate);
            let frame = timecode.frame.or_else(|| {
                let string = timecode.string.as_deref()?;
                let drop_frame =
                    timecode.display_format.as_deref() == Some("DF") || string.contains(';');
                timecode_to_frames(string, rate.timebase, drop_frame)
            });
            if let Some(frame) = frame {
                timeline.global_start_time = Some(RationalTime::new(frame as f64, fps));
            }
            if let Some(string) = &timecode.string {
                insert(&mut timeline.metadata, metadata::TIMECODE_STRING, string.as_str());
            }
            if let Some(format) = &timecode.display_format {
                insert(&mut timeline.metadata, metadata::TIMECODE_FORMAT, format.as_str());
            }
        }

        timeline.markers = lift::convert_markers(&sequence.markers, self.sequence_fps);

        let groups = [
            (TrackKind::Video, sequence.media.video.as_ref()),
            (TrackKind::Audio, sequence.media.audio.as_ref()),
        ];
        for (kind, group) in groups {
            let Some(group) = group else { continue };
            for (index, schema_track) in group.tracks.iter().enumerate() {
                let track = self.convert_track(schema_track, kind, index)?;
                timeline.add_track(track);
            }
        }

        Ok(timeline)
    }

    fn convert_track(&mut self, schema_track: &SchemaTrack, kind: TrackKind, index: usize) -> Result<Track> {
        let mut track = Track::new(format!("{} {}", kind, index + 1), kind);
        if schema_track.enabled == Some(false) {
            track.enabled = false;
        }
        if let Some(locked) = schema_track.locked {
            insert(&mut track.metadata, metadata::LOCKED, locked);
        }

        let mut cursor: i64 = 0;
        for item in ordered_items(schema_track) {
            let start = item.start();
            let end = item.end().unwrap_or(start);

            if self.config.reconstruct_gaps && start > cursor {
                let gap = Gap::new(RationalTime::new((start - cursor) as f64, self.sequence_fps));
                track.append_child(gap)?;
            }

            let converted = match item {
                Positioned::Clip(clip) => Ok(Item::Clip(self.convert_clip_item(clip))),
                Positioned::Transition(transition) => {
                    Ok(Item::Transition(self.convert_transition(transition)))
                }
                Positioned::Generator(generator) => {
                    Ok(Item::Clip(self.convert_generator(generator)))
                }
                Positioned::Rejected(rejected) => Err(format!(
                    "<{}> could not be parsed: {}",
                    rejected.element, rejected.reason
                )),
            };

            let appended = converted.and_then(|item| {
                let name = item.name().to_string();
                track
                    .append_child(item)
                    .map_err(|e| format!("{:?} could not be appended: {}", name, e))
            });

            if let Err(reason) = appended {
                warn!("Dropping item at frame {} on {}: {}", start, track.name, reason);
                if self.config.reconstruct_gaps && end > start.max(cursor) {
                    let length = end - start.max(cursor);
                    track.append_child(Gap::new(RationalTime::new(length as f64, self.sequence_fps)))?;
                }
            }

            cursor = cursor.max(end);
        }

        debug!("Decoded {} with {} items", track.name, track.children().len());
        Ok(track)
    }

    fn item_fps(&self, rate: Option<&Rate>) -> f64 {
        match rate {
            Some(rate) if rate.timebase > 0 => fps_from_rate(rate),
            _ => self.sequence_fps,
        }
    }

    /// Returns the full definition for a file, registering new definitions
    /// and resolving `<file id="..."/>` back-references.
    fn resolve_file(&mut self, file: &File) -> File {
        if file.is_back_reference() {
            if let Some(known) = self.files.get(&file.id) {
                return known.clone();
            }
        } else if !file.id.is_empty() {
            self.files.insert(file.id.clone(), file.clone());
        }
        file.clone()
    }

    fn convert_clip_item(&mut self, item: &ClipItem) -> Clip {
        let fps = self.item_fps(item.rate.as_ref());
        let source_range = TimeRange::from_frames(
            item.in_point as f64,
            (item.out_point - item.in_point) as f64,
            fps,
        );

        let mut clip_metadata = lift::clip_item_metadata(item);

        let media_reference = if let Some(nested) = &item.sequence {
            insert(&mut clip_metadata, metadata::NESTED_SEQUENCE, true);
            insert(&mut clip_metadata, metadata::SEQUENCE_NAME, nested.name.as_str());
            MediaReference::missing()
        } else {
            match &item.file {
                Some(file) => {
                    let file = self.resolve_file(file);
                    media::media_reference_for_file(&file, fps)
                }
                None => MediaReference::missing(),
            }
        };

        let mut clip = Clip::new(item.name.clone(), media_reference, Some(source_range))
            .with_markers(lift::convert_markers(&item.markers, fps))
            .with_metadata(clip_metadata);
        if item.enabled == Some(false) {
            clip.enabled = false;
        }
        clip
    }

    fn convert_transition(&self, item: &TransitionItem) -> Transition {
        let fps = self.item_fps(item.rate.as_ref());
        let half = RationalTime::new((item.end - item.start) as f64 / 2.0, fps);

        let mut transition = Transition::new(item.name.clone(), half, half);
        insert(&mut transition.metadata, metadata::ALIGNMENT, item.alignment.as_str());
        if let Some(effect) = &item.effect {
            insert(&mut transition.metadata, metadata::EFFECT, lift::effect_to_metadata(effect));
        }
        transition
    }

    fn convert_generator(&self, item: &GeneratorItem) -> Clip {
        let fps = self.item_fps(item.rate.as_ref());
        let in_point = item.in_point.unwrap_or_default();
        let duration = if item.duration > 0 {
            item.duration
        } else {
            match item.out_point {
                Some(out_point) => out_point - in_point,
                None => item.end - item.start,
            }
        };
        let source_range = TimeRange::from_frames(in_point as f64, duration as f64, fps);

        let mut clip_metadata = Metadata::new();
        insert(&mut clip_metadata, metadata::GENERATOR, true);
        insert(&mut clip_metadata, metadata::GENERATOR_NAME, item.name.as_str());
        if let Some(effect) = &item.effect {
            insert(&mut clip_metadata, metadata::EFFECT, lift::effect_to_metadata(effect));
        }
        if !item.filters.is_empty() {
            insert(&mut clip_metadata, metadata::FILTERS, lift::filters_to_value(&item.filters));
        }
        if let Some(anamorphic) = item.anamorphic {
            insert(&mut clip_metadata, metadata::ANAMORPHIC, anamorphic);
        }
        if let Some(alpha_type) = &item.alpha_type {
            insert(&mut clip_metadata, metadata::ALPHA_TYPE, alpha_type.as_str());
        }

        let generator_kind = item
            .effect
            .as_ref()
            .map(|e| e.effect_id.as_str())
            .filter(|id| !id.is_empty())
            .unwrap_or(item.name.as_str())
            .to_string();
        let parameters = item
            .effect
            .iter()
            .flat_map(|e| &e.parameters)
            .filter_map(|p| {
                let key = p.parameter_id.as_ref().or(p.name.as_ref())?;
                Some((key.clone(), Value::from(p.value.clone().unwrap_or_default())))
            })
            .collect();

        let media_reference = MediaReference::Generator {
            name: item.name.clone(),
            generator_kind,
            parameters,
            available_range: None,
        };

        let mut clip = Clip::new(item.name.clone(), media_reference, Some(source_range))
            .with_markers(lift::convert_markers(&item.markers, fps))
            .with_metadata(clip_metadata);
        if item.enabled == Some(false) {
            clip.enabled = false;
        }
        clip
    }
}

fn insert(map: &mut Metadata, key: &str, value: impl Into<Value>) {
    map.insert(key.to_string(), value.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURES: &str = include_str!("../../testdata/features.xml");

    fn decode(xml: &str) -> Result<Timeline> {
        Decoder::default().decode_str(xml)
    }

    fn document(tracks: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE xmeml>
<xmeml version="5">
  <sequence>
    <name>Test Sequence</name>
    <rate><timebase>24</timebase><ntsc>FALSE</ntsc></rate>
    <media>{}</media>
  </sequence>
</xmeml>"#,
            tracks
        )
    }

    fn clip_item(name: &str, start: i64, end: i64) -> String {
        format!(
            "<clipitem><name>{}</name><duration>{}</duration>\
             <rate><timebase>24</timebase><ntsc>FALSE</ntsc></rate>\
             <start>{}</start><end>{}</end><in>0</in><out>{}</out></clipitem>",
            name,
            end - start,
            start,
            end,
            end - start
        )
    }

    fn names(track: &Track) -> Vec<&str> {
        track.children().iter().map(Item::name).collect()
    }

    #[test]
    fn test_decode_basic_document() {
        let xml = document(&format!(
            r#"<video><track>
                <clipitem id="clip1">
                  <name>Test Clip</name>
                  <duration>50</duration>
                  <rate><timebase>24</timebase><ntsc>FALSE</ntsc></rate>
                  <start>0</start><end>50</end><in>0</in><out>50</out>
                  <file id="file-1">
                    <name>test.mov</name>
                    <pathurl>file:///path/to/test.mov</pathurl>
                    <duration>100</duration>
                  </file>
                </clipitem>
              </track></video>
              <audio><track>{}</track></audio>"#,
            clip_item("Audio Clip", 0, 50)
        ));

        let timeline = decode(&xml).unwrap();
        assert_eq!(timeline.name, "Test Sequence");
        assert_eq!(timeline.video_tracks().len(), 1);
        assert_eq!(timeline.audio_tracks().len(), 1);

        let video = timeline.video_tracks()[0];
        assert_eq!(video.name, "Video 1");
        let clip = video.children()[0].as_clip().unwrap();
        assert_eq!(clip.name, "Test Clip");
        assert_eq!(clip.source_range, Some(TimeRange::from_frames(0.0, 50.0, 24.0)));
        assert_eq!(metadata::get_str(&clip.metadata, metadata::ID), Some("clip1"));
        match &clip.media_reference {
            MediaReference::External { target_url, .. } => {
                assert_eq!(target_url, "file:///path/to/test.mov")
            }
            other => panic!("expected external reference, got {:?}", other),
        }

        let audio = timeline.audio_tracks()[0];
        assert_eq!(audio.name, "Audio 1");
        assert!(audio.children()[0].as_clip().unwrap().media_reference.is_missing());
    }

    #[test]
    fn test_decode_ntsc_rate() {
        let xml = document(
            r#"<video><track><clipitem><name>NTSC</name><duration>30</duration>
                <rate><timebase>30</timebase><ntsc>TRUE</ntsc></rate>
                <start>0</start><end>30</end><in>0</in><out>30</out></clipitem></track></video>"#,
        );

        let timeline = decode(&xml).unwrap();
        let clip = timeline.video_tracks()[0].children()[0].as_clip().unwrap();
        let rate = clip.source_range.unwrap().duration.rate;
        assert!((rate - 29.97).abs() < 0.01, "rate was {}", rate);
    }

    #[test]
    fn test_decode_empty_sequence() {
        let timeline = decode(&document("")).unwrap();
        assert!(timeline.video_tracks().is_empty());
        assert!(timeline.audio_tracks().is_empty());
    }

    #[test]
    fn test_decode_invalid_xml() {
        let result = decode("<xmeml><sequence>");
        assert!(matches!(result, Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn test_decode_no_sequence() {
        let result = decode(r#"<?xml version="1.0"?><xmeml version="5"></xmeml>"#);
        assert!(matches!(result, Err(Error::NoSequenceFound)));
    }

    #[test]
    fn test_only_first_sequence_is_decoded() {
        let xml = r#"<xmeml version="5">
            <sequence><name>First</name></sequence>
            <sequence><name>Second</name></sequence>
        </xmeml>"#;
        assert_eq!(decode(xml).unwrap().name, "First");
    }

    #[test]
    fn test_decode_multiple_tracks() {
        let xml = document(&format!(
            "<video><track>{}</track><track>{}</track></video><audio><track>{}</track><track>{}</track><track>{}</track></audio>",
            clip_item("V1", 0, 10),
            clip_item("V2", 0, 10),
            clip_item("A1", 0, 10),
            clip_item("A2", 0, 10),
            clip_item("A3", 0, 10),
        ));

        let timeline = decode(&xml).unwrap();
        assert_eq!(timeline.video_tracks().len(), 2);
        assert_eq!(timeline.audio_tracks().len(), 3);
        assert_eq!(timeline.audio_tracks()[2].name, "Audio 3");
    }

    #[test]
    fn test_order_is_reconstructed_from_start() {
        let xml = document(
            r#"<video><track>
                <generatoritem><name>Gen</name><duration>10</duration><start>20</start><end>30</end></generatoritem>
                <clipitem><name>Late</name><start>20</start><end>30</end><in>0</in><out>10</out></clipitem>
                <transitionitem><name>Trans</name><start>20</start><end>30</end></transitionitem>
                <clipitem><name>Early</name><start>0</start><end>20</end><in>0</in><out>20</out></clipitem>
              </track></video>"#,
        );

        let timeline = decode(&xml).unwrap();
        assert_eq!(
            names(timeline.video_tracks()[0]),
            vec!["Early", "Late", "Trans", "Gen"]
        );
    }

    #[test]
    fn test_gaps_are_reconstructed() {
        let xml = document(&format!(
            "<video><track>{}{}</track></video>",
            clip_item("A", 10, 60),
            clip_item("B", 85, 135),
        ));

        let timeline = decode(&xml).unwrap();
        let children = timeline.video_tracks()[0].children();
        assert_eq!(children.len(), 4);
        assert_eq!(children[0].as_gap().unwrap().duration.value, 10.0);
        assert!(children[1].is_clip());
        assert_eq!(children[2].as_gap().unwrap().duration.value, 25.0);
        assert!(children[3].is_clip());
    }

    #[test]
    fn test_gap_reconstruction_can_be_disabled() {
        let xml = document(&format!(
            "<video><track>{}{}</track></video>",
            clip_item("A", 10, 60),
            clip_item("B", 85, 135),
        ));

        let decoder = Decoder::new(DecoderConfig {
            reconstruct_gaps: false,
        });
        let timeline = decoder.decode_str(&xml).unwrap();
        assert_eq!(names(timeline.video_tracks()[0]), vec!["A", "B"]);
    }

    #[test]
    fn test_bad_item_is_dropped_and_position_kept() {
        let xml = document(&format!(
            "<video><track>{}<clipitem><name>Broken</name><start>50</start><end>75</end><in>x</in></clipitem>{}</track></video>",
            clip_item("A", 0, 50),
            clip_item("B", 75, 100),
        ));

        let timeline = decode(&xml).unwrap();
        let track = timeline.video_tracks()[0];
        assert_eq!(names(track), vec!["A", "", "B"]);
        assert_eq!(track.children()[1].as_gap().unwrap().duration.value, 25.0);
        assert_eq!(track.duration().unwrap().value, 100.0);
    }

    #[test]
    fn test_item_with_inverted_range_is_dropped() {
        let xml = document(&format!(
            "<video><track>{}<clipitem><name>Inverted</name><start>50</start><end>60</end><in>40</in><out>30</out></clipitem></track></video>",
            clip_item("A", 0, 50),
        ));

        let timeline = decode(&xml).unwrap();
        let track = timeline.video_tracks()[0];
        assert_eq!(track.children().len(), 2);
        assert!(track.children()[1].is_gap());
    }

    #[test]
    fn test_nested_sequence_placeholder() {
        let xml = document(
            r#"<video><track><clipitem id="nest">
                <name>Nested</name><start>0</start><end>40</end><in>0</in><out>40</out>
                <sequence><name>Inner Edit</name></sequence>
              </clipitem></track></video>"#,
        );

        let timeline = decode(&xml).unwrap();
        let clip = timeline.video_tracks()[0].children()[0].as_clip().unwrap();
        assert!(clip.media_reference.is_missing());
        assert_eq!(metadata::get_bool(&clip.metadata, metadata::NESTED_SEQUENCE), Some(true));
        assert_eq!(metadata::get_str(&clip.metadata, metadata::SEQUENCE_NAME), Some("Inner Edit"));
        assert_eq!(clip.duration().unwrap().value, 40.0);
    }

    #[test]
    fn test_disabled_clip_and_track() {
        let xml = document(
            r#"<video><track><enabled>FALSE</enabled><locked>TRUE</locked>
                <clipitem><name>Off</name><enabled>FALSE</enabled><start>0</start><end>5</end><in>0</in><out>5</out></clipitem>
              </track></video>"#,
        );

        let timeline = decode(&xml).unwrap();
        let track = timeline.video_tracks()[0];
        assert!(!track.enabled);
        assert_eq!(metadata::get_bool(&track.metadata, metadata::LOCKED), Some(true));
        assert!(!track.children()[0].as_clip().unwrap().enabled);
    }

    #[test]
    fn test_item_without_rate_uses_sequence_rate() {
        let xml = r#"<xmeml version="5"><sequence><name>S</name>
            <rate><timebase>25</timebase></rate>
            <media><video><track><clipitem><name>A</name><start>0</start><end>25</end><in>0</in><out>25</out></clipitem></track></video></media>
        </sequence></xmeml>"#;

        let timeline = decode(xml).unwrap();
        let clip = timeline.video_tracks()[0].children()[0].as_clip().unwrap();
        assert_eq!(clip.duration().unwrap().rate, 25.0);
    }

    #[test]
    fn test_features_fixture_order_and_kinds() {
        let timeline = decode(FEATURES).unwrap();
        let track = timeline.video_tracks()[0];

        assert_eq!(
            names(track),
            vec!["Clip With Markers", "Cross Dissolve", "Slug", "Render"]
        );
        assert!(track.children()[1].is_transition());
    }

    #[test]
    fn test_features_markers() {
        let timeline = decode(FEATURES).unwrap();
        let clip = timeline.video_tracks()[0].children()[0].as_clip().unwrap();

        assert_eq!(clip.markers.len(), 2);
        assert_eq!(clip.markers[0].name, "Clip Marker 1");
        assert_eq!(clip.markers[0].comment, "First marker");
        assert!(clip.markers[0].metadata.contains_key(metadata::COLOR));
        assert!(!clip.markers[1].metadata.contains_key(metadata::COLOR));
        assert_eq!(clip.markers[1].marked_range.duration.value, 0.0);

        assert_eq!(timeline.markers.len(), 1);
        assert_eq!(timeline.markers[0].name, "Act Two");
    }

    #[test]
    fn test_features_effects_and_filters() {
        let timeline = decode(FEATURES).unwrap();
        let clip = timeline.video_tracks()[0].children()[0].as_clip().unwrap();

        assert_eq!(metadata::get_objects(&clip.metadata, metadata::EFFECTS).len(), 1);
        let filters = metadata::get_objects(&clip.metadata, metadata::FILTERS);
        assert_eq!(filters.len(), 1);
        let effect = metadata::get_object(filters[0], "effect").unwrap();
        assert_eq!(metadata::get_str(effect, "effectid"), Some("gaussianblur"));
        assert_eq!(metadata::get_str(&clip.metadata, metadata::LABEL), Some("Iris"));
    }

    #[test]
    fn test_features_transition() {
        let timeline = decode(FEATURES).unwrap();
        let transition = timeline.video_tracks()[0].children()[1]
            .as_transition()
            .unwrap();

        assert_eq!(transition.name, "Cross Dissolve");
        assert_eq!(transition.in_offset.value, 5.0);
        assert_eq!(transition.out_offset.value, 5.0);
        assert_eq!(
            metadata::get_str(&transition.metadata, metadata::ALIGNMENT),
            Some("center")
        );
        let effect = metadata::get_object(&transition.metadata, metadata::EFFECT).unwrap();
        assert_eq!(metadata::get_f64(effect, "endratio"), Some(1.0));
    }

    #[test]
    fn test_features_generator() {
        let timeline = decode(FEATURES).unwrap();
        let clip = timeline.video_tracks()[0].children()[2].as_clip().unwrap();

        assert_eq!(clip.name, "Slug");
        assert_eq!(metadata::get_bool(&clip.metadata, metadata::GENERATOR), Some(true));
        assert_eq!(clip.markers.len(), 1);
        assert_eq!(clip.duration().unwrap().value, 40.0);
        match &clip.media_reference {
            MediaReference::Generator { generator_kind, .. } => assert_eq!(generator_kind, "Slug"),
            other => panic!("expected generator reference, got {:?}", other),
        }
    }

    #[test]
    fn test_features_image_sequence() {
        let timeline = decode(FEATURES).unwrap();
        let clip = timeline.video_tracks()[0].children()[3].as_clip().unwrap();

        match &clip.media_reference {
            MediaReference::ImageSequence(seq) => {
                assert_eq!(seq.name_prefix, "render.");
                assert_eq!(seq.frame_zero_padding, 4);
            }
            other => panic!("expected image sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_file_back_reference_is_resolved() {
        let timeline = decode(FEATURES).unwrap();
        let clip = timeline.audio_tracks()[0].children()[0].as_clip().unwrap();

        match &clip.media_reference {
            MediaReference::External { name, target_url, .. } => {
                assert_eq!(name, "interview.mov");
                assert_eq!(target_url, "file:///media/interview.mov");
            }
            other => panic!("expected external reference, got {:?}", other),
        }
        let source_track = metadata::get_object(&clip.metadata, metadata::SOURCE_TRACK).unwrap();
        assert_eq!(metadata::get_str(source_track, "mediatype"), Some("audio"));
    }

    #[test]
    fn test_features_timecode() {
        let timeline = decode(FEATURES).unwrap();
        assert_eq!(timeline.global_start_time, Some(RationalTime::new(86400.0, 24.0)));
        assert_eq!(
            metadata::get_str(&timeline.metadata, metadata::TIMECODE_STRING),
            Some("01:00:00:00")
        );
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let bytes: &[u8] =
            b"<xmeml version=\"5\"><sequence><name>\xff\xfe</name></sequence></xmeml>";
        let result = Decoder::default().decode(bytes);
        assert!(matches!(result, Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn test_broken_clip_keeps_clip_slot_on_tie() {
        let xml = document(&format!(
            "<video><track>{}\
             <generatoritem><name>Gen</name><duration>10</duration><start>20</start><end>30</end></generatoritem>\
             <clipitem><name>Broken</name><start>20</start><end>30</end><in>x</in></clipitem>\
             </track></video>",
            clip_item("A", 0, 20),
        ));

        let timeline = decode(&xml).unwrap();
        let track = timeline.video_tracks()[0];
        assert_eq!(names(track), vec!["A", "", "Gen"]);
        assert_eq!(track.children()[1].as_gap().unwrap().duration.value, 10.0);
    }

    #[test]
    fn test_edges_next_to_transition_are_resolved() {
        let xml = document(
            r#"<video><track>
                <clipitem><name>B</name><start>-1</start><end>110</end><in>0</in><out>50</out></clipitem>
                <clipitem><name>A</name><start>0</start><end>-1</end><in>0</in><out>50</out></clipitem>
                <transitionitem><name>Dissolve</name><start>50</start><end>60</end></transitionitem>
              </track></video>"#,
        );

        let timeline = decode(&xml).unwrap();
        let track = timeline.video_tracks()[0];
        assert_eq!(names(track), vec!["A", "Dissolve", "B"]);
        assert_eq!(track.duration().unwrap().value, 110.0);
    }

    #[test]
    fn test_resolve_span() {
        assert_eq!(resolve_span(0, -1, 50), (0, 50));
        assert_eq!(resolve_span(-1, 110, 50), (60, 110));
        assert_eq!(resolve_span(10, 20, 50), (10, 20));
    }

    #[test]
    fn test_timecode_without_frame_uses_string() {
        let xml = r#"<xmeml version="5"><sequence><name>S</name>
            <rate><timebase>30</timebase><ntsc>TRUE</ntsc></rate>
            <timecode><string>01:00:00;00</string><displayformat>DF</displayformat></timecode>
        </sequence></xmeml>"#;

        let timeline = decode(xml).unwrap();
        let start = timeline.global_start_time.unwrap();
        assert_eq!(start.value, 107892.0);
        assert!((start.rate - 29.97).abs() < 0.01);
        assert_eq!(
            metadata::get_str(&timeline.metadata, metadata::TIMECODE_FORMAT),
            Some("DF")
        );
    }
}
