//! Media references to `<file>` elements

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use url::Url;
use xmeml_core::metadata::{self, Metadata};
use xmeml_core::rate::rate_from_fps;
use xmeml_core::schema::File;
use xmeml_core::{sanitize_id, MediaReference, TimeRange};

/// Prefix of generated file ids
const FILE_ID_PREFIX: &str = "file-";

/// Builds `<file>` elements for one document.
///
/// A file is written in full the first time and as a back-reference when the
/// same definition comes up again. A different file whose id is already taken
/// gets a numbered id (`file-clipmov-2`).
#[derive(Debug, Default)]
pub struct FileTable {
    written: HashMap<String, File>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a media reference at the working rate.
    ///
    /// Returns `None` for references with nothing to point at: an unnamed
    /// missing reference, or a generator.
    pub fn file_for(&mut self, reference: &MediaReference, fps: f64) -> Result<Option<File>> {
        let file = match reference {
            MediaReference::External {
                name,
                target_url,
                available_range,
            } => {
                let name = if name.is_empty() {
                    file_name_of(target_url)
                } else {
                    name.clone()
                };
                let path_url = if target_url.is_empty() {
                    None
                } else {
                    Some(to_path_url(target_url)?)
                };
                File {
                    id: file_id(&name),
                    name,
                    path_url,
                    rate: Some(rate_from_fps(fps)),
                    duration: frames(available_range, fps),
                }
            }
            MediaReference::Missing { name } if name.is_empty() => return Ok(None),
            MediaReference::Missing { name } => File {
                id: file_id(name),
                name: name.clone(),
                ..File::default()
            },
            MediaReference::ImageSequence(sequence) => File {
                id: stored_id(&sequence.metadata).unwrap_or_else(|| file_id(&sequence.name)),
                name: sequence.name.clone(),
                path_url: Some(format!("{}{}", sequence.target_url_base, sequence.name)),
                rate: Some(rate_from_fps(fps)),
                duration: frames(&sequence.available_range, fps),
            },
            MediaReference::Generator { .. } => return Ok(None),
            other => {
                return Err(Error::MediaReferenceConversionFailed(format!(
                    "unsupported media reference {:?}",
                    other.name()
                )))
            }
        };

        Ok(Some(self.register(file)))
    }

    fn register(&mut self, mut file: File) -> File {
        let base = file.id.clone();
        let mut suffix = 1;
        loop {
            match self.written.get(&file.id) {
                Some(known) if known_as(known, &file) => {
                    return File {
                        id: file.id,
                        ..File::default()
                    };
                }
                Some(_) => {
                    suffix += 1;
                    file.id = format!("{}-{}", base, suffix);
                }
                None => {
                    self.written.insert(file.id.clone(), file.clone());
                    return file;
                }
            }
        }
    }
}

/// Same definition apart from the id
fn known_as(known: &File, file: &File) -> bool {
    known.name == file.name
        && known.path_url == file.path_url
        && known.rate == file.rate
        && known.duration == file.duration
}

fn stored_id(map: &Metadata) -> Option<String> {
    metadata::get_str(map, metadata::FILE_ID)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn frames(range: &Option<TimeRange>, fps: f64) -> Option<i64> {
    range.map(|r| r.duration.to_frames(fps))
}

/// Derives a file id from a media name
pub fn file_id(name: &str) -> String {
    format!("{}{}", FILE_ID_PREFIX, sanitize_id(name))
}

fn file_name_of(target_url: &str) -> String {
    target_url
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Returns `target` as a URL, turning plain paths into absolute `file://`
/// URLs. Targets that already carry a scheme are kept verbatim.
pub fn to_path_url(target: &str) -> Result<String> {
    // A single letter scheme is a Windows drive, not a URL
    if let Ok(url) = Url::parse(target) {
        if url.scheme().len() > 1 {
            return Ok(target.to_string());
        }
    }

    let absolute = std::path::absolute(Path::new(target))?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| {
            Error::MediaReferenceConversionFailed(format!(
                "cannot express {} as a file URL",
                absolute.display()
            ))
        })
}
