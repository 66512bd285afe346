//! Lifting vendor fields into timeline metadata
//!
//! Each schema structure is converted field by field into an ordered map.
//! Optional fields that are absent in the document are left out of the map,
//! so lowering can rebuild exactly what was present.

use serde_json::Value;
use xmeml_core::metadata::{self, Metadata};
use xmeml_core::schema::{self, ClipItem, Color, Effect, Filter, Parameter};
use xmeml_core::{Marker, TimeRange};

fn insert(map: &mut Metadata, key: &str, value: impl Into<Value>) {
    map.insert(key.to_string(), value.into());
}

fn insert_opt<T: Into<Value>>(map: &mut Metadata, key: &str, value: Option<T>) {
    if let Some(v) = value {
        insert(map, key, v);
    }
}

/// Lifts an effect
pub fn effect_to_metadata(effect: &Effect) -> Metadata {
    let mut map = Metadata::new();
    insert(&mut map, "name", effect.name.as_str());
    insert(&mut map, "effectid", effect.effect_id.as_str());
    insert(&mut map, "effecttype", effect.effect_type.as_str());
    insert(&mut map, "mediatype", effect.media_type.as_str());
    insert_opt(&mut map, "effectcategory", effect.effect_category.as_deref());
    insert_opt(&mut map, "duration", effect.duration);
    insert_opt(&mut map, "startratio", effect.start_ratio);
    insert_opt(&mut map, "endratio", effect.end_ratio);
    insert_opt(&mut map, "reverse", effect.reverse);

    if !effect.parameters.is_empty() {
        let parameters: Vec<Value> = effect
            .parameters
            .iter()
            .map(|p| Value::Object(parameter_to_metadata(p)))
            .collect();
        insert(&mut map, "parameters", parameters);
    }

    map
}

/// Lifts a list of effects into an array value
pub fn effects_to_value(effects: &[Effect]) -> Value {
    Value::Array(
        effects
            .iter()
            .map(|e| Value::Object(effect_to_metadata(e)))
            .collect(),
    )
}

/// Lifts a filter and its nested effect
pub fn filter_to_metadata(filter: &Filter) -> Metadata {
    let mut map = Metadata::new();
    insert_opt(&mut map, "enabled", filter.enabled);
    insert_opt(&mut map, "start", filter.start);
    insert_opt(&mut map, "end", filter.end);
    if let Some(effect) = &filter.effect {
        insert(&mut map, "effect", effect_to_metadata(effect));
    }
    map
}

/// Lifts a list of filters into an array value
pub fn filters_to_value(filters: &[Filter]) -> Value {
    Value::Array(
        filters
            .iter()
            .map(|f| Value::Object(filter_to_metadata(f)))
            .collect(),
    )
}

/// Lifts an effect parameter
pub fn parameter_to_metadata(parameter: &Parameter) -> Metadata {
    let mut map = Metadata::new();
    insert_opt(&mut map, "parameterid", parameter.parameter_id.as_deref());
    insert_opt(&mut map, "name", parameter.name.as_deref());
    insert_opt(&mut map, "value", parameter.value.as_deref());
    insert_opt(&mut map, "valueid", parameter.value_id.as_deref());
    insert_opt(&mut map, "valuemin", parameter.value_min);
    insert_opt(&mut map, "valuemax", parameter.value_max);
    insert_opt(&mut map, "valuelist", parameter.value_list.as_deref());
    map
}

/// Lifts a marker RGBA color
pub fn color_to_metadata(color: &Color) -> Metadata {
    let mut map = Metadata::new();
    insert(&mut map, "red", color.red);
    insert(&mut map, "green", color.green);
    insert(&mut map, "blue", color.blue);
    insert_opt(&mut map, "alpha", color.alpha);
    map
}

/// Translates a marker; its range is `[in, out - in)` at `fps`.
///
/// The comment lands in the marker's comment field and, when present, in
/// metadata too. The vendor color only exists in metadata; the marker keeps
/// the default palette color.
pub fn convert_marker(marker: &schema::Marker, fps: f64) -> Marker {
    let duration = (marker.out_point - marker.in_point).max(0);
    let range = TimeRange::from_frames(marker.in_point as f64, duration as f64, fps);

    let mut result = Marker::new(marker.name.clone(), range);
    if let Some(comment) = &marker.comment {
        result.comment = comment.clone();
        insert(&mut result.metadata, metadata::COMMENT, comment.as_str());
    }
    if let Some(color) = &marker.color {
        insert(&mut result.metadata, metadata::COLOR, color_to_metadata(color));
    }
    result
}

/// Translates a list of markers
pub fn convert_markers(markers: &[schema::Marker], fps: f64) -> Vec<Marker> {
    markers.iter().map(|m| convert_marker(m, fps)).collect()
}

/// Lifts the clip item fields that have no slot on a clip: id, effects,
/// filters, color label, comments, source track and links.
pub fn clip_item_metadata(item: &ClipItem) -> Metadata {
    let mut map = Metadata::new();

    insert_opt(&mut map, metadata::ID, item.id.as_deref());
    if !item.effects.is_empty() {
        insert(&mut map, metadata::EFFECTS, effects_to_value(&item.effects));
    }
    if !item.filters.is_empty() {
        insert(&mut map, metadata::FILTERS, filters_to_value(&item.filters));
    }
    if let Some(label) = item.labels.as_ref().and_then(|l| l.label2.as_deref()) {
        insert(&mut map, metadata::LABEL, label);
    }
    if !item.comments.is_empty() {
        insert(&mut map, metadata::COMMENTS, item.comments.clone());
    }
    if let Some(source_track) = &item.source_track {
        let mut track = Metadata::new();
        insert(&mut track, "mediatype", source_track.media_type.as_str());
        insert_opt(&mut track, "trackindex", source_track.track_index);
        insert(&mut map, metadata::SOURCE_TRACK, track);
    }
    if !item.links.is_empty() {
        let links: Vec<Value> = item
            .links
            .iter()
            .map(|link| {
                let mut entry = Metadata::new();
                insert(&mut entry, "linkclipref", link.link_clip_ref.as_str());
                insert_opt(&mut entry, "mediatype", link.media_type.as_deref());
                insert_opt(&mut entry, "trackindex", link.track_index);
                Value::Object(entry)
            })
            .collect();
        insert(&mut map, metadata::LINKS, links);
    }

    map
}
