//! Writing the schema model as XML

use super::*;
use crate::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// XML declaration written before the document
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// DOCTYPE line written after the declaration
pub const DOCTYPE: &str = "<!DOCTYPE xmeml>\n";

fn xml_err<E: std::fmt::Display>(e: E) -> Error {
    Error::XmlWrite(e.to_string())
}

impl Xmeml {
    /// Writes the declaration, DOCTYPE, the indented document and a trailing
    /// newline.
    pub fn write<W: Write>(&self, mut writer: W, indent: usize) -> Result<()> {
        writer.write_all(XML_HEADER.as_bytes())?;
        writer.write_all(DOCTYPE.as_bytes())?;

        let mut xml = XmlWriter {
            inner: Writer::new_with_indent(&mut writer, b' ', indent),
        };

        let mut root = BytesStart::new("xmeml");
        root.push_attribute(("version", self.version.as_str()));
        xml.inner
            .write_event(Event::Start(root))
            .map_err(xml_err)?;
        for sequence in &self.sequences {
            write_sequence(&mut xml, sequence)?;
        }
        xml.end("xmeml")?;

        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Serializes the document to a string
    pub fn to_xml_string(&self, indent: usize) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, indent)?;
        String::from_utf8(buffer).map_err(xml_err)
    }
}

struct XmlWriter<W: Write> {
    inner: Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    fn start(&mut self, name: &str) -> Result<()> {
        self.inner
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_err)
    }

    fn start_with_id(&mut self, name: &str, id: Option<&str>) -> Result<()> {
        let mut start = BytesStart::new(name);
        if let Some(id) = id {
            start.push_attribute(("id", id));
        }
        self.inner.write_event(Event::Start(start)).map_err(xml_err)
    }

    fn empty_with_id(&mut self, name: &str, id: &str) -> Result<()> {
        let mut empty = BytesStart::new(name);
        empty.push_attribute(("id", id));
        self.inner.write_event(Event::Empty(empty)).map_err(xml_err)
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.inner
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_err)
    }

    fn text(&mut self, name: &str, value: &str) -> Result<()> {
        self.start(name)?;
        self.inner
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(xml_err)?;
        self.end(name)
    }

    fn value<T: std::fmt::Display>(&mut self, name: &str, value: T) -> Result<()> {
        self.text(name, &value.to_string())
    }

    fn opt_text(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) => self.text(name, v),
            None => Ok(()),
        }
    }

    fn opt_value<T: std::fmt::Display>(&mut self, name: &str, value: Option<T>) -> Result<()> {
        match value {
            Some(v) => self.value(name, v),
            None => Ok(()),
        }
    }

    fn bool(&mut self, name: &str, value: bool) -> Result<()> {
        self.text(name, if value { "TRUE" } else { "FALSE" })
    }

    fn opt_bool(&mut self, name: &str, value: Option<bool>) -> Result<()> {
        match value {
            Some(v) => self.bool(name, v),
            None => Ok(()),
        }
    }

    fn rate(&mut self, rate: &Rate) -> Result<()> {
        self.start("rate")?;
        self.value("timebase", rate.timebase)?;
        self.bool("ntsc", rate.ntsc)?;
        self.end("rate")
    }

    fn opt_rate(&mut self, rate: Option<&Rate>) -> Result<()> {
        match rate {
            Some(r) => self.rate(r),
            None => Ok(()),
        }
    }
}

fn write_sequence<W: Write>(xml: &mut XmlWriter<W>, sequence: &Sequence) -> Result<()> {
    xml.start("sequence")?;
    xml.text("name", &sequence.name)?;
    xml.opt_value("duration", sequence.duration)?;
    xml.rate(&sequence.rate)?;

    if let Some(timecode) = &sequence.timecode {
        xml.start("timecode")?;
        xml.rate(&timecode.rate)?;
        xml.opt_text("string", timecode.string.as_deref())?;
        xml.opt_value("frame", timecode.frame)?;
        xml.opt_text("displayformat", timecode.display_format.as_deref())?;
        xml.end("timecode")?;
    }

    let media = &sequence.media;
    if media.video.is_some() || media.audio.is_some() {
        xml.start("media")?;
        if let Some(video) = &media.video {
            write_track_group(xml, "video", video)?;
        }
        if let Some(audio) = &media.audio {
            write_track_group(xml, "audio", audio)?;
        }
        xml.end("media")?;
    }

    for marker in &sequence.markers {
        write_marker(xml, marker)?;
    }

    xml.end("sequence")
}

fn write_track_group<W: Write>(xml: &mut XmlWriter<W>, name: &str, group: &TrackGroup) -> Result<()> {
    xml.start(name)?;
    for track in &group.tracks {
        xml.start("track")?;
        xml.opt_bool("enabled", track.enabled)?;
        xml.opt_bool("locked", track.locked)?;
        for item in &track.clip_items {
            write_clip_item(xml, item)?;
        }
        for item in &track.transition_items {
            write_transition_item(xml, item)?;
        }
        for item in &track.generator_items {
            write_generator_item(xml, item)?;
        }
        xml.end("track")?;
    }
    xml.end(name)
}

fn write_clip_item<W: Write>(xml: &mut XmlWriter<W>, item: &ClipItem) -> Result<()> {
    xml.start_with_id("clipitem", item.id.as_deref())?;
    xml.text("name", &item.name)?;
    xml.opt_bool("enabled", item.enabled)?;
    xml.value("duration", item.duration)?;
    xml.opt_rate(item.rate.as_ref())?;
    xml.value("start", item.start)?;
    xml.value("end", item.end)?;
    xml.value("in", item.in_point)?;
    xml.value("out", item.out_point)?;

    if let Some(file) = &item.file {
        if file.is_back_reference() {
            xml.empty_with_id("file", &file.id)?;
        } else {
            xml.start_with_id("file", Some(file.id.as_str()))?;
            xml.text("name", &file.name)?;
            xml.opt_text("pathurl", file.path_url.as_deref())?;
            xml.opt_rate(file.rate.as_ref())?;
            xml.opt_value("duration", file.duration)?;
            xml.end("file")?;
        }
    }

    if let Some(sequence) = &item.sequence {
        write_sequence(xml, sequence)?;
    }

    if let Some(source_track) = &item.source_track {
        xml.start("sourcetrack")?;
        xml.text("mediatype", &source_track.media_type)?;
        xml.opt_value("trackindex", source_track.track_index)?;
        xml.end("sourcetrack")?;
    }

    if let Some(labels) = &item.labels {
        xml.start("labels")?;
        xml.opt_text("label2", labels.label2.as_deref())?;
        xml.end("labels")?;
    }

    if !item.comments.is_empty() {
        xml.start("comments")?;
        for comment in &item.comments {
            xml.text("comment", comment)?;
        }
        xml.end("comments")?;
    }

    for link in &item.links {
        xml.start("link")?;
        xml.text("linkclipref", &link.link_clip_ref)?;
        xml.opt_text("mediatype", link.media_type.as_deref())?;
        xml.opt_value("trackindex", link.track_index)?;
        xml.end("link")?;
    }

    for filter in &item.filters {
        write_filter(xml, filter)?;
    }
    for effect in &item.effects {
        write_effect(xml, effect)?;
    }
    for marker in &item.markers {
        write_marker(xml, marker)?;
    }

    xml.end("clipitem")
}

fn write_transition_item<W: Write>(xml: &mut XmlWriter<W>, item: &TransitionItem) -> Result<()> {
    xml.start("transitionitem")?;
    xml.text("name", &item.name)?;
    xml.opt_rate(item.rate.as_ref())?;
    xml.value("start", item.start)?;
    xml.value("end", item.end)?;
    xml.text("alignment", &item.alignment)?;
    if let Some(effect) = &item.effect {
        write_effect(xml, effect)?;
    }
    xml.end("transitionitem")
}

fn write_generator_item<W: Write>(xml: &mut XmlWriter<W>, item: &GeneratorItem) -> Result<()> {
    xml.start("generatoritem")?;
    xml.text("name", &item.name)?;
    xml.value("duration", item.duration)?;
    xml.opt_rate(item.rate.as_ref())?;
    xml.value("start", item.start)?;
    xml.value("end", item.end)?;
    xml.opt_value("in", item.in_point)?;
    xml.opt_value("out", item.out_point)?;
    xml.opt_bool("enabled", item.enabled)?;
    xml.opt_bool("anamorphic", item.anamorphic)?;
    xml.opt_text("alphatype", item.alpha_type.as_deref())?;
    if let Some(effect) = &item.effect {
        write_effect(xml, effect)?;
    }
    for filter in &item.filters {
        write_filter(xml, filter)?;
    }
    for marker in &item.markers {
        write_marker(xml, marker)?;
    }
    xml.end("generatoritem")
}

fn write_filter<W: Write>(xml: &mut XmlWriter<W>, filter: &Filter) -> Result<()> {
    xml.start("filter")?;
    xml.opt_bool("enabled", filter.enabled)?;
    xml.opt_value("start", filter.start)?;
    xml.opt_value("end", filter.end)?;
    if let Some(effect) = &filter.effect {
        write_effect(xml, effect)?;
    }
    xml.end("filter")
}

fn write_effect<W: Write>(xml: &mut XmlWriter<W>, effect: &Effect) -> Result<()> {
    xml.start("effect")?;
    xml.text("name", &effect.name)?;
    xml.text("effectid", &effect.effect_id)?;
    xml.text("effecttype", &effect.effect_type)?;
    xml.text("mediatype", &effect.media_type)?;
    xml.opt_text("effectcategory", effect.effect_category.as_deref())?;
    xml.opt_value("duration", effect.duration)?;
    xml.opt_value("startratio", effect.start_ratio)?;
    xml.opt_value("endratio", effect.end_ratio)?;
    xml.opt_bool("reverse", effect.reverse)?;
    for parameter in &effect.parameters {
        xml.start("parameter")?;
        xml.opt_text("parameterid", parameter.parameter_id.as_deref())?;
        xml.opt_text("name", parameter.name.as_deref())?;
        xml.opt_text("value", parameter.value.as_deref())?;
        xml.opt_text("valueid", parameter.value_id.as_deref())?;
        xml.opt_value("valuemin", parameter.value_min)?;
        xml.opt_value("valuemax", parameter.value_max)?;
        xml.opt_text("valuelist", parameter.value_list.as_deref())?;
        xml.end("parameter")?;
    }
    xml.end("effect")
}

fn write_marker<W: Write>(xml: &mut XmlWriter<W>, marker: &Marker) -> Result<()> {
    xml.start("marker")?;
    xml.text("name", &marker.name)?;
    xml.opt_text("comment", marker.comment.as_deref())?;
    xml.value("in", marker.in_point)?;
    xml.value("out", marker.out_point)?;
    if let Some(color) = &marker.color {
        xml.start("color")?;
        xml.value("red", color.red)?;
        xml.value("green", color.green)?;
        xml.value("blue", color.blue)?;
        xml.opt_value("alpha", color.alpha)?;
        xml.end("color")?;
    }
    xml.end("marker")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Xmeml {
        let clip = ClipItem {
            id: Some("clip-1".to_string()),
            name: "Shot & Take".to_string(),
            enabled: Some(true),
            duration: 48,
            rate: Some(Rate { timebase: 24, ntsc: false }),
            start: 0,
            end: 48,
            in_point: 0,
            out_point: 48,
            markers: vec![Marker {
                name: "Beat".to_string(),
                comment: Some("".to_string()),
                in_point: 12,
                out_point: 13,
                color: Some(Color { red: 255, green: 0, blue: 0, alpha: None }),
            }],
            ..ClipItem::default()
        };

        Xmeml::new(
            "5",
            Sequence {
                name: "Edit".to_string(),
                duration: Some(48),
                rate: Rate { timebase: 24, ntsc: false },
                media: Media {
                    video: Some(TrackGroup {
                        tracks: vec![Track {
                            enabled: Some(true),
                            clip_items: vec![clip],
                            ..Track::default()
                        }],
                    }),
                    audio: None,
                },
                ..Sequence::default()
            },
        )
    }

    #[test]
    fn test_header_and_trailing_newline() {
        let xml = sample().to_xml_string(2).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE xmeml>\n<xmeml version=\"5\">"));
        assert!(xml.ends_with("</xmeml>\n"));
        assert!(xml.contains("\n  <sequence>"));
        assert!(xml.contains("<name>Shot &amp; Take</name>"));
        assert!(xml.contains("<ntsc>FALSE</ntsc>"));
    }

    #[test]
    fn test_written_document_parses_back() {
        let doc = sample();
        let xml = doc.to_xml_string(2).unwrap();
        let parsed = Xmeml::parse(&xml).unwrap();

        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_empty_media_is_omitted() {
        let doc = Xmeml::new("5", Sequence::default());
        let xml = doc.to_xml_string(2).unwrap();

        assert_eq!(xml.matches("<sequence>").count(), 1);
        assert!(!xml.contains("<media>"));
        assert!(!xml.contains("<video>"));
        assert!(!xml.contains("<audio>"));
    }

    #[test]
    fn test_file_back_reference_is_empty_element() {
        let mut doc = sample();
        let track = &mut doc.sequences[0].media.video.as_mut().unwrap().tracks[0];
        track.clip_items[0].file = Some(File {
            id: "file-1".to_string(),
            ..File::default()
        });

        let xml = doc.to_xml_string(2).unwrap();
        assert!(xml.contains("<file id=\"file-1\"/>"));

        let parsed = Xmeml::parse(&xml).unwrap();
        assert_eq!(parsed, doc);
    }
}
