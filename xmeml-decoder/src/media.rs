//! Media reference classification
//!
//! A `<file>` either names a single media file or, when its name carries a
//! frame-number placeholder, an image sequence.

use serde_json::Value;
use xmeml_core::metadata::{self, Metadata};
use xmeml_core::schema::File;
use xmeml_core::{ImageSequenceReference, MediaReference, TimeRange};

/// Frame-number placeholder found in an image sequence name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePattern {
    /// Text before the placeholder
    pub prefix: String,
    /// Text after the placeholder
    pub suffix: String,
    /// Number of digits in a frame number
    pub padding: usize,
}

/// Minimum run of `#` characters that marks a frame number
const MIN_HASH_RUN: usize = 4;

/// Finds a `####` or `%0Nd` placeholder in a file name.
///
/// Returns `None` for names that refer to a single file.
pub fn parse_sequence_pattern(name: &str) -> Option<SequencePattern> {
    hash_pattern(name).or_else(|| printf_pattern(name))
}

fn hash_pattern(name: &str) -> Option<SequencePattern> {
    let start = name.find(&"#".repeat(MIN_HASH_RUN))?;
    let run = name[start..].bytes().take_while(|&b| b == b'#').count();

    Some(SequencePattern {
        prefix: name[..start].to_string(),
        suffix: name[start + run..].to_string(),
        padding: run,
    })
}

fn printf_pattern(name: &str) -> Option<SequencePattern> {
    let bytes = name.as_bytes();

    for (start, _) in name.match_indices('%') {
        let digits = bytes[start + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let end = start + 1 + digits;

        if digits == 0 || bytes.get(end) != Some(&b'd') {
            continue;
        }

        let padding = name[start + 1..end].parse().ok()?;
        return Some(SequencePattern {
            prefix: name[..start].to_string(),
            suffix: name[end + 1..].to_string(),
            padding,
        });
    }

    None
}

/// Checks if a file name denotes an image sequence
pub fn is_image_sequence(name: &str) -> bool {
    parse_sequence_pattern(name).is_some()
}

/// Converts a file reference to an external or image sequence reference.
///
/// The available range is `[0, duration)` at `fps` when the file carries a
/// duration. A file without a path URL becomes a missing reference.
pub fn media_reference_for_file(file: &File, fps: f64) -> MediaReference {
    let path_url = match file.path_url.as_deref() {
        Some(url) if !url.is_empty() => url,
        _ => {
            return MediaReference::Missing {
                name: file.name.clone(),
            }
        }
    };

    let available_range = file
        .duration
        .map(|duration| TimeRange::from_frames(0.0, duration as f64, fps));

    match parse_sequence_pattern(&file.name) {
        Some(pattern) => {
            let mut reference_metadata = Metadata::new();
            reference_metadata.insert(metadata::FILE_ID.to_string(), Value::from(file.id.clone()));

            MediaReference::ImageSequence(ImageSequenceReference {
                name: file.name.clone(),
                target_url_base: url_base(path_url).to_string(),
                name_prefix: pattern.prefix,
                name_suffix: pattern.suffix,
                start_frame: 0,
                frame_step: 1,
                rate: fps,
                frame_zero_padding: pattern.padding,
                available_range,
                metadata: reference_metadata,
            })
        }
        None => MediaReference::External {
            name: file.name.clone(),
            target_url: path_url.to_string(),
            available_range,
        },
    }
}

/// Everything up to and including the last `/`
fn url_base(url: &str) -> &str {
    match url.rfind('/') {
        Some(index) => &url[..=index],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, path_url: Option<&str>) -> File {
        File {
            id: "file-1".to_string(),
            name: name.to_string(),
            path_url: path_url.map(str::to_string),
            rate: None,
            duration: Some(120),
        }
    }

    #[test]
    fn test_hash_pattern() {
        let pattern = parse_sequence_pattern("render.#####.exr").unwrap();
        assert_eq!(pattern.prefix, "render.");
        assert_eq!(pattern.suffix, ".exr");
        assert_eq!(pattern.padding, 5);
    }

    #[test]
    fn test_printf_pattern() {
        let pattern = parse_sequence_pattern("shot_%04d.dpx").unwrap();
        assert_eq!(pattern.prefix, "shot_");
        assert_eq!(pattern.suffix, ".dpx");
        assert_eq!(pattern.padding, 4);
    }

    #[test]
    fn test_single_files_are_not_sequences() {
        assert!(!is_image_sequence("interview.mov"));
        assert!(!is_image_sequence("take ### 3.mov"));
        assert!(!is_image_sequence("100%.wav"));
        assert!(!is_image_sequence("frame_%d.png"));
        assert!(!is_image_sequence(""));
    }

    #[test]
    fn test_external_reference() {
        let reference = media_reference_for_file(&file("a.mov", Some("file:///media/a.mov")), 24.0);

        match reference {
            MediaReference::External {
                name,
                target_url,
                available_range,
            } => {
                assert_eq!(name, "a.mov");
                assert_eq!(target_url, "file:///media/a.mov");
                assert_eq!(available_range, Some(TimeRange::from_frames(0.0, 120.0, 24.0)));
            }
            other => panic!("expected external reference, got {:?}", other),
        }
    }

    #[test]
    fn test_image_sequence_reference() {
        let reference = media_reference_for_file(
            &file("plate.####.exr", Some("file:///renders/plate.####.exr")),
            25.0,
        );

        match reference {
            MediaReference::ImageSequence(seq) => {
                assert_eq!(seq.target_url_base, "file:///renders/");
                assert_eq!(seq.name_prefix, "plate.");
                assert_eq!(seq.name_suffix, ".exr");
                assert_eq!(seq.frame_zero_padding, 4);
                assert_eq!(seq.rate, 25.0);
                assert_eq!(
                    metadata::get_str(&seq.metadata, metadata::FILE_ID),
                    Some("file-1")
                );
            }
            other => panic!("expected image sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_path_is_missing() {
        assert!(media_reference_for_file(&file("a.mov", Some("")), 24.0).is_missing());
        assert!(media_reference_for_file(&file("a.mov", None), 24.0).is_missing());
    }
}
