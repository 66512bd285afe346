//! Open metadata maps and the vendor key namespace
//!
//! Fields the interchange schema carries but the timeline model has no slot
//! for are stashed in [`Metadata`] under keys starting with [`VENDOR_PREFIX`].
//! The decoder lifts them, the encoder lowers them back.

use serde_json::{Map, Value};

/// Ordered string-keyed map of JSON values
pub type Metadata = Map<String, Value>;

/// Prefix shared by every vendor key
pub const VENDOR_PREFIX: &str = "xmeml:";

/// Clip item `id` attribute
pub const ID: &str = "xmeml:id";
/// Clip item effects, an array of effect objects
pub const EFFECTS: &str = "xmeml:effects";
/// Single effect of a transition or generator item
pub const EFFECT: &str = "xmeml:effect";
/// Filters, an array of filter objects
pub const FILTERS: &str = "xmeml:filters";
/// Transition alignment tag
pub const ALIGNMENT: &str = "xmeml:alignment";
/// Marks a clip decoded from a generator item
pub const GENERATOR: &str = "xmeml:generator";
/// Generator item name
pub const GENERATOR_NAME: &str = "xmeml:generator_name";
/// Generator `anamorphic` flag
pub const ANAMORPHIC: &str = "xmeml:anamorphic";
/// Generator `alphatype`
pub const ALPHA_TYPE: &str = "xmeml:alphatype";
/// Marks a placeholder clip standing in for a nested sequence
pub const NESTED_SEQUENCE: &str = "xmeml:nested_sequence";
/// Name of the nested sequence behind a placeholder clip
pub const SEQUENCE_NAME: &str = "xmeml:sequence_name";
/// Marker RGBA color object
pub const COLOR: &str = "xmeml:color";
/// Marker comment, duplicated from the marker's comment field
pub const COMMENT: &str = "xmeml:comment";
/// File id of an image sequence reference
pub const FILE_ID: &str = "xmeml:file_id";
/// Clip color label (`<labels><label2>`)
pub const LABEL: &str = "xmeml:label";
/// Clip comments, an array of strings
pub const COMMENTS: &str = "xmeml:comments";
/// Clip `<sourcetrack>` object
pub const SOURCE_TRACK: &str = "xmeml:source_track";
/// Clip `<link>` objects
pub const LINKS: &str = "xmeml:links";
/// Track `locked` flag
pub const LOCKED: &str = "xmeml:locked";
/// Sequence timecode string
pub const TIMECODE_STRING: &str = "xmeml:timecode_string";
/// Sequence timecode display format (`DF` / `NDF`)
pub const TIMECODE_FORMAT: &str = "xmeml:timecode_format";

/// Checks if a key belongs to the vendor namespace
pub fn is_vendor_key(key: &str) -> bool {
    key.starts_with(VENDOR_PREFIX)
}

/// Removes every vendor key, leaving caller-authored entries untouched
pub fn strip_vendor_keys(metadata: &mut Metadata) {
    metadata.retain(|key, _| !is_vendor_key(key));
}

/// Returns the string stored under `key`
pub fn get_str<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(Value::as_str)
}

/// Returns the boolean stored under `key`
pub fn get_bool(metadata: &Metadata, key: &str) -> Option<bool> {
    metadata.get(key).and_then(Value::as_bool)
}

/// Returns the integer stored under `key`
pub fn get_i64(metadata: &Metadata, key: &str) -> Option<i64> {
    metadata.get(key).and_then(Value::as_i64)
}

/// Returns the number stored under `key` as a float
pub fn get_f64(metadata: &Metadata, key: &str) -> Option<f64> {
    metadata.get(key).and_then(Value::as_f64)
}

/// Returns the object stored under `key`
pub fn get_object<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a Metadata> {
    metadata.get(key).and_then(Value::as_object)
}

/// Returns the objects of the array stored under `key`, skipping non-objects
pub fn get_objects<'a>(metadata: &'a Metadata, key: &str) -> Vec<&'a Metadata> {
    metadata
        .get(key)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}
