// @module: EAF 3.0 serialisation

use std::collections::{BTreeMap, BTreeSet};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use url::Url;

use super::reader::LAST_USED_ANNOTATION_ID;
use super::{ElanData, ELAN_ENCODING};
use crate::errors::{xml_error, EafError};
use crate::segments::Segment;
use crate::tiers::Stereotype;

// @const: Schema written on the root element
const EAF_SCHEMA: &str = "http://www.mpi.nl/tools/elan/EAFv3.0.xsd";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const EAF_FORMAT: &str = "3.0";
const AUDIO_MIME_TYPE: &str = "audio/x-wav";

fn emit<'a>(writer: &mut Writer<Vec<u8>>, event: impl Into<Event<'a>>) -> Result<(), EafError> {
    writer.write_event(event).map_err(xml_error)
}

fn media_url(data: &ElanData) -> Option<String> {
    let audio = data.audio.as_ref()?;
    Some(
        Url::from_file_path(audio)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("file:{}", audio.display())),
    )
}

/// Whether a segment is written as a `REF_ANNOTATION`
fn is_reference(data: &ElanData, segment: &Segment) -> bool {
    segment
        .reference
        .as_deref()
        .is_some_and(|parent| data.segments.get_segment(parent).is_some())
}

/// Serialise a document as tab-indented EAF 3.0
pub(crate) fn write_document(data: &ElanData) -> Result<String, EafError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some(ELAN_ENCODING), None)))?;

    let mut root = BytesStart::new("ANNOTATION_DOCUMENT");
    root.push_attribute(("AUTHOR", data.header.author.as_str()));
    root.push_attribute(("DATE", data.header.date.as_str()));
    root.push_attribute(("FORMAT", EAF_FORMAT));
    root.push_attribute(("VERSION", EAF_FORMAT));
    root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    root.push_attribute(("xsi:noNamespaceSchemaLocation", EAF_SCHEMA));
    emit(&mut writer, Event::Start(root))?;

    write_header(&mut writer, data)?;

    // One slot per distinct time value, ascending
    let times: BTreeSet<u64> = data
        .segments
        .iter()
        .filter(|segment| !is_reference(data, segment))
        .flat_map(|segment| [segment.start, segment.end])
        .collect();
    let slots: BTreeMap<u64, String> = times
        .into_iter()
        .enumerate()
        .map(|(index, time)| (time, format!("ts{}", index + 1)))
        .collect();

    if slots.is_empty() {
        emit(&mut writer, Event::Empty(BytesStart::new("TIME_ORDER")))?;
    } else {
        emit(&mut writer, Event::Start(BytesStart::new("TIME_ORDER")))?;
        for (time, id) in &slots {
            let mut slot = BytesStart::new("TIME_SLOT");
            slot.push_attribute(("TIME_SLOT_ID", id.as_str()));
            slot.push_attribute(("TIME_VALUE", time.to_string().as_str()));
            emit(&mut writer, Event::Empty(slot))?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("TIME_ORDER")))?;
    }

    for tier in &data.tiers {
        let segments: Vec<&Segment> = data.segments.tier_segments(&tier.name).collect();
        if segments.is_empty() {
            emit(&mut writer, Event::Empty(tier.as_xml()))?;
            continue;
        }

        emit(&mut writer, Event::Start(tier.as_xml()))?;
        for segment in segments {
            write_annotation(&mut writer, data, segment, &slots)?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("TIER")))?;
    }

    for tier_type in &data.tier_types {
        emit(&mut writer, Event::Empty(tier_type.as_xml()))?;
    }

    for constraint in Stereotype::ALL.iter().filter_map(|stereotype| stereotype.constraint_xml()) {
        emit(&mut writer, Event::Empty(constraint))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("ANNOTATION_DOCUMENT")))?;

    let mut xml = String::from_utf8(writer.into_inner()).map_err(xml_error)?;
    xml.push('\n');

    Ok(xml)
}

fn write_header(writer: &mut Writer<Vec<u8>>, data: &ElanData) -> Result<(), EafError> {
    let mut header = BytesStart::new("HEADER");
    header.push_attribute(("MEDIA_FILE", data.header.media_file.as_str()));
    header.push_attribute(("TIME_UNITS", data.header.time_units.as_str()));
    emit(writer, Event::Start(header))?;

    if let Some(url) = media_url(data) {
        let mut descriptor = BytesStart::new("MEDIA_DESCRIPTOR");
        descriptor.push_attribute(("MEDIA_URL", url.as_str()));
        descriptor.push_attribute(("MIME_TYPE", AUDIO_MIME_TYPE));
        descriptor.push_attribute(("RELATIVE_MEDIA_URL", ""));
        emit(writer, Event::Empty(descriptor))?;
    }

    let last_used = data.segments.last_used_id().to_string();
    let properties = data
        .header
        .properties
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .chain(std::iter::once((LAST_USED_ANNOTATION_ID, last_used.as_str())));

    for (name, value) in properties {
        let mut property = BytesStart::new("PROPERTY");
        property.push_attribute(("NAME", name));
        emit(writer, Event::Start(property))?;
        emit(writer, Event::Text(BytesText::new(value)))?;
        emit(writer, Event::End(BytesEnd::new("PROPERTY")))?;
    }

    emit(writer, Event::End(BytesEnd::new("HEADER")))
}

fn write_annotation(
    writer: &mut Writer<Vec<u8>>,
    data: &ElanData,
    segment: &Segment,
    slots: &BTreeMap<u64, String>,
) -> Result<(), EafError> {
    emit(writer, Event::Start(BytesStart::new("ANNOTATION")))?;

    let (mut tag, name) = match segment.reference.as_deref() {
        Some(parent) if is_reference(data, segment) => {
            let mut tag = BytesStart::new("REF_ANNOTATION");
            tag.push_attribute(("ANNOTATION_ID", segment.id.as_str()));
            tag.push_attribute(("ANNOTATION_REF", parent));
            (tag, "REF_ANNOTATION")
        }
        _ => {
            let mut tag = BytesStart::new("ALIGNABLE_ANNOTATION");
            tag.push_attribute(("ANNOTATION_ID", segment.id.as_str()));
            (tag, "ALIGNABLE_ANNOTATION")
        }
    };

    if name == "ALIGNABLE_ANNOTATION" {
        let start = slots.get(&segment.start).map(String::as_str).unwrap_or_default();
        let end = slots.get(&segment.end).map(String::as_str).unwrap_or_default();
        tag.push_attribute(("TIME_SLOT_REF1", start));
        tag.push_attribute(("TIME_SLOT_REF2", end));
    }

    emit(writer, Event::Start(tag))?;
    emit(writer, Event::Start(BytesStart::new("ANNOTATION_VALUE")))?;
    emit(writer, Event::Text(BytesText::new(&segment.text)))?;
    emit(writer, Event::End(BytesEnd::new("ANNOTATION_VALUE")))?;
    emit(writer, Event::End(BytesEnd::new(name)))?;

    emit(writer, Event::End(BytesEnd::new("ANNOTATION")))
}
