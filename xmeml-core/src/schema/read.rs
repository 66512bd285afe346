//! Reading the schema model from XML

use super::*;
use crate::{Error, Result};
use roxmltree::{Document, Node, ParsingOptions};
use std::io::Read;
use std::str::FromStr;

impl Xmeml {
    /// Reads a document from a reader
    ///
    /// Bytes that are not UTF-8 fail as [`Error::InvalidUtf8`], not as IO.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        Self::parse(std::str::from_utf8(&content)?)
    }

    /// Parses a document from a string.
    ///
    /// Fails on XML that is not well formed or a root other than `<xmeml>`.
    /// Item-level field errors do not fail the document; see [`Track::rejected`].
    pub fn parse(xml: &str) -> Result<Self> {
        let mut options = ParsingOptions::default();
        options.allow_dtd = true;
        let doc = Document::parse_with_options(xml, options)?;

        let root = doc.root_element();
        if root.tag_name().name() != "xmeml" {
            return Err(Error::UnexpectedRoot(root.tag_name().name().to_string()));
        }

        let sequences = elements(root, "sequence")
            .map(parse_sequence)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            version: root.attribute("version").unwrap_or_default().to_string(),
            sequences,
        })
    }
}

/// Direct element children with the given tag name
fn elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn text(node: Node, name: &str) -> Option<String> {
    element(node, name).map(|n| n.text().unwrap_or_default().to_string())
}

fn parse_value<T: FromStr>(node: Node, name: &str) -> Result<Option<T>> {
    match element(node, name) {
        None => Ok(None),
        Some(child) => {
            let raw = child.text().unwrap_or_default().trim();
            raw.parse().map(Some).map_err(|_| Error::InvalidValue {
                element: name.to_string(),
                value: raw.to_string(),
            })
        }
    }
}

fn parse_bool(node: Node, name: &str) -> Result<Option<bool>> {
    match element(node, name) {
        None => Ok(None),
        Some(child) => {
            let raw = child.text().unwrap_or_default().trim();
            match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(Error::InvalidValue {
                    element: name.to_string(),
                    value: raw.to_string(),
                }),
            }
        }
    }
}

fn parse_rate(node: Node) -> Result<Option<Rate>> {
    match element(node, "rate") {
        None => Ok(None),
        Some(rate) => Ok(Some(Rate {
            timebase: parse_value(rate, "timebase")?.unwrap_or_default(),
            ntsc: parse_bool(rate, "ntsc")?.unwrap_or_default(),
        })),
    }
}

fn parse_sequence(node: Node) -> Result<Sequence> {
    let media = match element(node, "media") {
        Some(media) => Media {
            video: element(media, "video").map(parse_track_group).transpose()?,
            audio: element(media, "audio").map(parse_track_group).transpose()?,
        },
        None => Media::default(),
    };

    Ok(Sequence {
        name: text(node, "name").unwrap_or_default(),
        duration: parse_value(node, "duration")?,
        rate: parse_rate(node)?.unwrap_or_default(),
        timecode: element(node, "timecode").map(parse_timecode).transpose()?,
        media,
        markers: elements(node, "marker")
            .map(parse_marker)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn parse_timecode(node: Node) -> Result<Timecode> {
    Ok(Timecode {
        rate: parse_rate(node)?.unwrap_or_default(),
        string: text(node, "string"),
        frame: parse_value(node, "frame")?,
        display_format: text(node, "displayformat"),
    })
}

fn parse_track_group(node: Node) -> Result<TrackGroup> {
    Ok(TrackGroup {
        tracks: elements(node, "track")
            .map(parse_track)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn parse_track(node: Node) -> Result<Track> {
    let mut track = Track {
        enabled: parse_bool(node, "enabled")?,
        locked: parse_bool(node, "locked")?,
        ..Track::default()
    };

    for child in node.children().filter(|n| n.is_element()) {
        let element_name = child.tag_name().name();
        let parsed = match element_name {
            "clipitem" => parse_clip_item(child).map(|item| track.clip_items.push(item)),
            "transitionitem" => {
                parse_transition_item(child).map(|item| track.transition_items.push(item))
            }
            "generatoritem" => {
                parse_generator_item(child).map(|item| track.generator_items.push(item))
            }
            _ => Ok(()),
        };

        if let Err(e) = parsed {
            track.rejected.push(RejectedItem {
                element: element_name.to_string(),
                start: parse_value(child, "start").ok().flatten(),
                end: parse_value(child, "end").ok().flatten(),
                reason: e.to_string(),
            });
        }
    }

    Ok(track)
}

fn parse_clip_item(node: Node) -> Result<ClipItem> {
    Ok(ClipItem {
        id: node.attribute("id").map(str::to_string),
        name: text(node, "name").unwrap_or_default(),
        enabled: parse_bool(node, "enabled")?,
        duration: parse_value(node, "duration")?.unwrap_or_default(),
        rate: parse_rate(node)?,
        start: parse_value(node, "start")?.unwrap_or_default(),
        end: parse_value(node, "end")?.unwrap_or_default(),
        in_point: parse_value(node, "in")?.unwrap_or_default(),
        out_point: parse_value(node, "out")?.unwrap_or_default(),
        file: element(node, "file").map(parse_file).transpose()?,
        sequence: element(node, "sequence")
            .map(parse_sequence)
            .transpose()?
            .map(Box::new),
        source_track: element(node, "sourcetrack")
            .map(|n| -> Result<SourceTrack> {
                Ok(SourceTrack {
                    media_type: text(n, "mediatype").unwrap_or_default(),
                    track_index: parse_value(n, "trackindex")?,
                })
            })
            .transpose()?,
        labels: element(node, "labels").map(|n| Labels {
            label2: text(n, "label2"),
        }),
        comments: element(node, "comments")
            .map(|n| {
                elements(n, "comment")
                    .map(|c| c.text().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default(),
        links: elements(node, "link")
            .map(|n| -> Result<Link> {
                Ok(Link {
                    link_clip_ref: text(n, "linkclipref").unwrap_or_default(),
                    media_type: text(n, "mediatype"),
                    track_index: parse_value(n, "trackindex")?,
                })
            })
            .collect::<Result<Vec<_>>>()?,
        filters: elements(node, "filter")
            .map(parse_filter)
            .collect::<Result<Vec<_>>>()?,
        effects: elements(node, "effect")
            .map(parse_effect)
            .collect::<Result<Vec<_>>>()?,
        markers: elements(node, "marker")
            .map(parse_marker)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn parse_file(node: Node) -> Result<File> {
    Ok(File {
        id: node.attribute("id").unwrap_or_default().to_string(),
        name: text(node, "name").unwrap_or_default(),
        path_url: text(node, "pathurl"),
        rate: parse_rate(node)?,
        duration: parse_value(node, "duration")?,
    })
}

fn parse_transition_item(node: Node) -> Result<TransitionItem> {
    Ok(TransitionItem {
        name: text(node, "name").unwrap_or_default(),
        rate: parse_rate(node)?,
        start: parse_value(node, "start")?.unwrap_or_default(),
        end: parse_value(node, "end")?.unwrap_or_default(),
        alignment: text(node, "alignment")
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ALIGNMENT.to_string()),
        effect: element(node, "effect").map(parse_effect).transpose()?,
    })
}

fn parse_generator_item(node: Node) -> Result<GeneratorItem> {
    Ok(GeneratorItem {
        name: text(node, "name").unwrap_or_default(),
        duration: parse_value(node, "duration")?.unwrap_or_default(),
        rate: parse_rate(node)?,
        start: parse_value(node, "start")?.unwrap_or_default(),
        end: parse_value(node, "end")?.unwrap_or_default(),
        in_point: parse_value(node, "in")?,
        out_point: parse_value(node, "out")?,
        enabled: parse_bool(node, "enabled")?,
        anamorphic: parse_bool(node, "anamorphic")?,
        alpha_type: text(node, "alphatype"),
        effect: element(node, "effect").map(parse_effect).transpose()?,
        filters: elements(node, "filter")
            .map(parse_filter)
            .collect::<Result<Vec<_>>>()?,
        markers: elements(node, "marker")
            .map(parse_marker)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn parse_filter(node: Node) -> Result<Filter> {
    Ok(Filter {
        enabled: parse_bool(node, "enabled")?,
        start: parse_value(node, "start")?,
        end: parse_value(node, "end")?,
        effect: element(node, "effect").map(parse_effect).transpose()?,
    })
}

fn parse_effect(node: Node) -> Result<Effect> {
    Ok(Effect {
        name: text(node, "name").unwrap_or_default(),
        effect_id: text(node, "effectid").unwrap_or_default(),
        effect_type: text(node, "effecttype").unwrap_or_default(),
        media_type: text(node, "mediatype").unwrap_or_default(),
        effect_category: text(node, "effectcategory"),
        duration: parse_value(node, "duration")?,
        start_ratio: parse_value(node, "startratio")?,
        end_ratio: parse_value(node, "endratio")?,
        reverse: parse_bool(node, "reverse")?,
        parameters: elements(node, "parameter")
            .map(parse_parameter)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn parse_parameter(node: Node) -> Result<Parameter> {
    Ok(Parameter {
        parameter_id: text(node, "parameterid"),
        name: text(node, "name"),
        value: text(node, "value"),
        value_id: text(node, "valueid"),
        value_min: parse_value(node, "valuemin")?,
        value_max: parse_value(node, "valuemax")?,
        value_list: text(node, "valuelist"),
    })
}

fn parse_marker(node: Node) -> Result<Marker> {
    Ok(Marker {
        name: text(node, "name").unwrap_or_default(),
        comment: text(node, "comment"),
        in_point: parse_value(node, "in")?.unwrap_or_default(),
        out_point: parse_value(node, "out")?.unwrap_or_default(),
        color: element(node, "color")
            .map(|n| -> Result<Color> {
                Ok(Color {
                    red: parse_value(n, "red")?.unwrap_or_default(),
                    green: parse_value(n, "green")?.unwrap_or_default(),
                    blue: parse_value(n, "blue")?.unwrap_or_default(),
                    alpha: parse_value(n, "alpha")?,
                })
            })
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE xmeml>
<xmeml version="5">
  <sequence>
    <name>Edit</name>
    <duration>100</duration>
    <rate>
      <timebase>30</timebase>
      <ntsc>TRUE</ntsc>
    </rate>
    <media>
      <video>
        <track>
          <clipitem id="clip-1">
            <name>A</name>
            <duration>50</duration>
            <start>0</start>
            <end>50</end>
            <in>10</in>
            <out>60</out>
            <file id="file-1">
              <name>a.mov</name>
              <pathurl>file:///media/a.mov</pathurl>
              <duration>200</duration>
            </file>
          </clipitem>
          <clipitem id="clip-2">
            <name>B</name>
            <start>oops</start>
            <end>80</end>
          </clipitem>
        </track>
      </video>
    </media>
  </sequence>
</xmeml>"#;

    #[test]
    fn test_parse_minimal_document() {
        let doc = Xmeml::parse(MINIMAL).unwrap();

        assert_eq!(doc.version, "5");
        assert_eq!(doc.sequences.len(), 1);

        let sequence = &doc.sequences[0];
        assert_eq!(sequence.name, "Edit");
        assert_eq!(sequence.duration, Some(100));
        assert_eq!(sequence.rate, Rate { timebase: 30, ntsc: true });
        assert!(sequence.media.audio.is_none());

        let track = &sequence.media.video.as_ref().unwrap().tracks[0];
        assert_eq!(track.clip_items.len(), 1);

        let clip = &track.clip_items[0];
        assert_eq!(clip.id.as_deref(), Some("clip-1"));
        assert_eq!(clip.in_point, 10);
        assert_eq!(clip.out_point, 60);
        assert!(clip.rate.is_none());

        let file = clip.file.as_ref().unwrap();
        assert_eq!(file.path_url.as_deref(), Some("file:///media/a.mov"));
        assert_eq!(file.duration, Some(200));
    }

    #[test]
    fn test_bad_item_field_is_rejected_not_fatal() {
        let doc = Xmeml::parse(MINIMAL).unwrap();
        let track = &doc.sequences[0].media.video.as_ref().unwrap().tracks[0];

        assert_eq!(track.rejected.len(), 1);
        let rejected = &track.rejected[0];
        assert_eq!(rejected.element, "clipitem");
        assert_eq!(rejected.start, None);
        assert_eq!(rejected.end, Some(80));
    }

    #[test]
    fn test_malformed_xml() {
        let result = Xmeml::parse("<xmeml><sequence></xmeml>");
        assert!(matches!(result, Err(Error::XmlParse(_))));
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error() {
        let bytes: &[u8] = b"<xmeml version=\"5\"><sequence><name>\xff\xfe</name></sequence></xmeml>";
        let result = Xmeml::read(bytes);
        assert!(matches!(result, Err(Error::InvalidUtf8(_))));
    }

    #[test]
    fn test_unexpected_root() {
        let result = Xmeml::parse("<fcpxml version=\"1.8\"/>");
        assert!(matches!(result, Err(Error::UnexpectedRoot(name)) if name == "fcpxml"));
    }

    #[test]
    fn test_transition_alignment_defaults_to_center() {
        let xml = r#"<xmeml version="5"><sequence><media><video><track>
            <transitionitem><name>Dissolve</name><start>10</start><end>20</end></transitionitem>
        </track></video></media></sequence></xmeml>"#;
        let doc = Xmeml::parse(xml).unwrap();
        let track = &doc.sequences[0].media.video.as_ref().unwrap().tracks[0];
        assert_eq!(track.transition_items[0].alignment, "center");
    }
}
