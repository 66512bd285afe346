//! Lowering timeline metadata back into vendor fields
//!
//! The inverse of lifting: each map is read field by field and only the keys
//! present produce schema values.

use serde_json::Value;
use xmeml_core::metadata::{self, Metadata};
use xmeml_core::schema::{self, Color, Effect, Filter, Labels, Link, Parameter, SourceTrack};
use xmeml_core::Marker;

fn string(map: &Metadata, key: &str) -> Option<String> {
    metadata::get_str(map, key).map(str::to_string)
}

/// Rebuilds an effect
pub fn effect_from_metadata(map: &Metadata) -> Effect {
    Effect {
        name: string(map, "name").unwrap_or_default(),
        effect_id: string(map, "effectid").unwrap_or_default(),
        effect_type: string(map, "effecttype").unwrap_or_default(),
        media_type: string(map, "mediatype").unwrap_or_default(),
        effect_category: string(map, "effectcategory"),
        duration: metadata::get_i64(map, "duration"),
        start_ratio: metadata::get_f64(map, "startratio"),
        end_ratio: metadata::get_f64(map, "endratio"),
        reverse: metadata::get_bool(map, "reverse"),
        parameters: metadata::get_objects(map, "parameters")
            .into_iter()
            .map(parameter_from_metadata)
            .collect(),
    }
}

/// Rebuilds the effects stored as an array under `key`
pub fn effects_from_metadata(map: &Metadata, key: &str) -> Vec<Effect> {
    metadata::get_objects(map, key)
        .into_iter()
        .map(effect_from_metadata)
        .collect()
}

/// Rebuilds a filter and its nested effect
pub fn filter_from_metadata(map: &Metadata) -> Filter {
    Filter {
        enabled: metadata::get_bool(map, "enabled"),
        start: metadata::get_i64(map, "start"),
        end: metadata::get_i64(map, "end"),
        effect: metadata::get_object(map, "effect").map(effect_from_metadata),
    }
}

/// Rebuilds the filters stored as an array under `key`
pub fn filters_from_metadata(map: &Metadata, key: &str) -> Vec<Filter> {
    metadata::get_objects(map, key)
        .into_iter()
        .map(filter_from_metadata)
        .collect()
}

/// Rebuilds an effect parameter
pub fn parameter_from_metadata(map: &Metadata) -> Parameter {
    Parameter {
        parameter_id: string(map, "parameterid"),
        name: string(map, "name"),
        value: string(map, "value"),
        value_id: string(map, "valueid"),
        value_min: metadata::get_f64(map, "valuemin"),
        value_max: metadata::get_f64(map, "valuemax"),
        value_list: string(map, "valuelist"),
    }
}

/// Rebuilds a marker RGBA color
pub fn color_from_metadata(map: &Metadata) -> Color {
    Color {
        red: metadata::get_i64(map, "red").unwrap_or_default(),
        green: metadata::get_i64(map, "green").unwrap_or_default(),
        blue: metadata::get_i64(map, "blue").unwrap_or_default(),
        alpha: metadata::get_i64(map, "alpha"),
    }
}

/// Lowers a marker at the given frame rate.
///
/// The comment field wins over the metadata copy; an empty comment falls
/// back to whatever metadata kept.
pub fn lower_marker(marker: &Marker, fps: f64) -> schema::Marker {
    let in_point = marker.marked_range.start_time.to_frames(fps);
    let out_point = in_point + marker.marked_range.duration.to_frames(fps);

    let comment = if marker.comment.is_empty() {
        string(&marker.metadata, metadata::COMMENT)
    } else {
        Some(marker.comment.clone())
    };

    schema::Marker {
        name: marker.name.clone(),
        comment,
        in_point,
        out_point,
        color: metadata::get_object(&marker.metadata, metadata::COLOR).map(color_from_metadata),
    }
}

/// Lowers a list of markers
pub fn lower_markers(markers: &[Marker], fps: f64) -> Vec<schema::Marker> {
    markers.iter().map(|m| lower_marker(m, fps)).collect()
}

/// Clip item fields restored from clip metadata
#[derive(Debug, Default)]
pub struct ClipItemExtras {
    pub id: Option<String>,
    pub labels: Option<Labels>,
    pub comments: Vec<String>,
    pub source_track: Option<SourceTrack>,
    pub links: Vec<Link>,
    pub effects: Vec<Effect>,
    pub filters: Vec<Filter>,
}

/// Reads back the clip item fields lifted into clip metadata
pub fn clip_item_extras(map: &Metadata) -> ClipItemExtras {
    let comments = map
        .get(metadata::COMMENTS)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let source_track = metadata::get_object(map, metadata::SOURCE_TRACK).map(|track| SourceTrack {
        media_type: string(track, "mediatype").unwrap_or_default(),
        track_index: metadata::get_i64(track, "trackindex"),
    });

    let links = metadata::get_objects(map, metadata::LINKS)
        .into_iter()
        .map(|link| Link {
            link_clip_ref: string(link, "linkclipref").unwrap_or_default(),
            media_type: string(link, "mediatype"),
            track_index: metadata::get_i64(link, "trackindex"),
        })
        .collect();

    ClipItemExtras {
        id: string(map, metadata::ID),
        labels: string(map, metadata::LABEL).map(|label| Labels {
            label2: Some(label),
        }),
        comments,
        source_track,
        links,
        effects: effects_from_metadata(map, metadata::EFFECTS),
        filters: filters_from_metadata(map, metadata::FILTERS),
    }
}
