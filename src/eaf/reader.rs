/*!
 * Streaming `.eaf` parser.
 *
 * Walks the quick-xml event stream once, collecting the header, time slots,
 * tiers, linguistic types and annotations, then resolves annotation times.
 */

use std::collections::HashMap;
use std::path::PathBuf;

use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use super::Header;
use crate::errors::{xml_error, EafError};
use crate::segments::{Segment, Segmentations};
use crate::tiers::{Tier, TierType};

// @const: Property rewritten on every save
pub(crate) const LAST_USED_ANNOTATION_ID: &str = "lastUsedAnnotationId";

/// Collect the attributes of a tag as unescaped `(name, value)` pairs, in file order
pub(crate) fn read_attributes(tag: &BytesStart) -> Result<Vec<(String, String)>, EafError> {
    tag.attributes()
        .map(|attribute| {
            let attribute = attribute.map_err(xml_error)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(xml_error)?.into_owned();
            Ok((key, value))
        })
        .collect()
}

/// Value of an attribute that must be present
pub(crate) fn require(attributes: &[(String, String)], element: &str, attribute: &str) -> Result<String, EafError> {
    attribute_value(attributes, attribute)
        .map(str::to_string)
        .ok_or_else(|| EafError::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        })
}

fn attribute_value<'a>(attributes: &'a [(String, String)], attribute: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == attribute)
        .map(|(_, value)| value.as_str())
}

/// Convert a `MEDIA_URL` into a local path
///
/// `file://` URIs are decoded properly; anything else falls back to stripping
/// a leading `file:`.
pub(crate) fn media_path(media_url: &str) -> Option<PathBuf> {
    if media_url.trim().is_empty() {
        return None;
    }

    let decoded = Some(media_url)
        .filter(|url| url.starts_with("file://"))
        .and_then(|url| Url::parse(url).ok())
        .and_then(|url| url.to_file_path().ok());

    Some(decoded.unwrap_or_else(|| PathBuf::from(media_url.strip_prefix("file:").unwrap_or(media_url))))
}

/// Everything read out of a document
#[derive(Debug, Default)]
pub(crate) struct ParsedDocument {
    pub header: Header,
    pub audio: Option<PathBuf>,
    pub tiers: Vec<Tier>,
    pub tier_types: Vec<TierType>,
    pub segments: Segmentations,
}

#[derive(Debug)]
enum Anchor {
    Aligned { slot1: String, slot2: String },
    Reference(String),
}

#[derive(Debug)]
struct RawAnnotation {
    id: String,
    tier: String,
    anchor: Anchor,
    text: String,
}

#[derive(Debug, Default)]
struct Parser {
    document: ParsedDocument,
    time_slots: HashMap<String, Option<u64>>,
    annotations: Vec<RawAnnotation>,
    current_tier: Option<String>,
    current_annotation: Option<RawAnnotation>,
    current_property: Option<(String, String)>,
    in_value: bool,
}

impl Parser {
    fn open(&mut self, tag: &BytesStart, empty: bool) -> Result<(), EafError> {
        match tag.name().as_ref() {
            b"ANNOTATION_DOCUMENT" => {
                let attributes = read_attributes(tag)?;
                self.document.header.author = attribute_value(&attributes, "AUTHOR").unwrap_or_default().to_string();
                self.document.header.date = attribute_value(&attributes, "DATE").unwrap_or_default().to_string();
            }
            b"HEADER" => {
                let attributes = read_attributes(tag)?;
                self.document.header.media_file =
                    attribute_value(&attributes, "MEDIA_FILE").unwrap_or_default().to_string();
                if let Some(units) = attribute_value(&attributes, "TIME_UNITS") {
                    self.document.header.time_units = units.to_string();
                }
            }
            b"MEDIA_DESCRIPTOR" => {
                // Only the first descriptor is the primary media
                if self.document.audio.is_none() {
                    let attributes = read_attributes(tag)?;
                    self.document.audio = attribute_value(&attributes, "MEDIA_URL").and_then(media_path);
                }
            }
            b"PROPERTY" => {
                let attributes = read_attributes(tag)?;
                let name = attribute_value(&attributes, "NAME").unwrap_or_default().to_string();
                if empty {
                    self.push_property(name, String::new());
                } else {
                    self.current_property = Some((name, String::new()));
                }
            }
            b"TIME_SLOT" => {
                let attributes = read_attributes(tag)?;
                let id = require(&attributes, "TIME_SLOT", "TIME_SLOT_ID")?;
                let value = attribute_value(&attributes, "TIME_VALUE").and_then(|v| v.trim().parse().ok());
                self.time_slots.insert(id, value);
            }
            b"TIER" => {
                let tier = Tier::from_xml(tag)?;
                if !empty {
                    self.current_tier = Some(tier.name.clone());
                }
                self.document.tiers.push(tier);
            }
            b"ALIGNABLE_ANNOTATION" => {
                let attributes = read_attributes(tag)?;
                let anchor = Anchor::Aligned {
                    slot1: require(&attributes, "ALIGNABLE_ANNOTATION", "TIME_SLOT_REF1")?,
                    slot2: require(&attributes, "ALIGNABLE_ANNOTATION", "TIME_SLOT_REF2")?,
                };
                self.begin_annotation(require(&attributes, "ALIGNABLE_ANNOTATION", "ANNOTATION_ID")?, anchor, empty);
            }
            b"REF_ANNOTATION" => {
                let attributes = read_attributes(tag)?;
                let anchor = Anchor::Reference(require(&attributes, "REF_ANNOTATION", "ANNOTATION_REF")?);
                self.begin_annotation(require(&attributes, "REF_ANNOTATION", "ANNOTATION_ID")?, anchor, empty);
            }
            b"ANNOTATION_VALUE" => self.in_value = !empty,
            b"LINGUISTIC_TYPE" => self.document.tier_types.push(TierType::from_xml(tag)?),
            other => debug!("Skipping <{}>", String::from_utf8_lossy(other)),
        }

        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"TIER" => self.current_tier = None,
            b"ANNOTATION_VALUE" => self.in_value = false,
            b"ALIGNABLE_ANNOTATION" | b"REF_ANNOTATION" => {
                if let Some(annotation) = self.current_annotation.take() {
                    self.annotations.push(annotation);
                }
            }
            b"PROPERTY" => {
                if let Some((name, value)) = self.current_property.take() {
                    self.push_property(name, value);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_value {
            if let Some(annotation) = self.current_annotation.as_mut() {
                annotation.text.push_str(text);
            }
        } else if let Some((_, value)) = self.current_property.as_mut() {
            value.push_str(text);
        }
    }

    fn begin_annotation(&mut self, id: String, anchor: Anchor, empty: bool) {
        let Some(tier) = self.current_tier.clone() else {
            warn!("Annotation {} is outside of any tier, skipping it", id);
            return;
        };

        let annotation = RawAnnotation {
            id,
            tier,
            anchor,
            text: String::new(),
        };

        if empty {
            self.annotations.push(annotation);
        } else {
            self.current_annotation = Some(annotation);
        }
    }

    fn push_property(&mut self, name: String, value: String) {
        if name != LAST_USED_ANNOTATION_ID {
            self.document.header.properties.push((name, value));
        }
    }

    /// Check tier references and turn raw annotations into segments
    fn finish(mut self) -> Result<ParsedDocument, EafError> {
        for tier in &self.document.tiers {
            if !self.document.tier_types.iter().any(|t| t.name == tier.tier_type) {
                return Err(EafError::UnknownTierType {
                    tier: tier.name.clone(),
                    type_ref: tier.tier_type.clone(),
                });
            }
            if let Some(parent) = &tier.parent {
                if !self.document.tiers.iter().any(|t| &t.name == parent) {
                    return Err(EafError::UnknownParent {
                        tier: tier.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let mut times: HashMap<String, (u64, u64)> = HashMap::new();
        for annotation in &self.annotations {
            if let Anchor::Aligned { slot1, slot2 } = &annotation.anchor {
                let start = self.time_slots.get(slot1).copied().flatten();
                let end = self.time_slots.get(slot2).copied().flatten();
                match (start, end) {
                    (Some(start), Some(end)) => {
                        times.insert(annotation.id.clone(), (start, end));
                    }
                    _ => warn!("Annotation {} has an unaligned time slot, skipping it", annotation.id),
                }
            }
        }

        // Reference annotations may point at other reference annotations
        loop {
            let mut resolved = 0;
            for annotation in &self.annotations {
                if let Anchor::Reference(parent) = &annotation.anchor {
                    if times.contains_key(&annotation.id) {
                        continue;
                    }
                    if let Some(&bounds) = times.get(parent) {
                        times.insert(annotation.id.clone(), bounds);
                        resolved += 1;
                    }
                }
            }
            if resolved == 0 {
                break;
            }
        }

        for annotation in self.annotations {
            let Some(&(start, end)) = times.get(&annotation.id) else {
                if let Anchor::Reference(parent) = &annotation.anchor {
                    warn!("Annotation {} references unknown annotation {}, skipping it", annotation.id, parent);
                }
                continue;
            };

            let reference = match annotation.anchor {
                Anchor::Reference(parent) => Some(parent),
                Anchor::Aligned { .. } => None,
            };

            self.document.segments.insert(Segment {
                id: annotation.id,
                tier: annotation.tier,
                start,
                end,
                text: annotation.text,
                reference,
            });
        }

        debug!(
            "Parsed {} tiers, {} tier types and {} segments",
            self.document.tiers.len(),
            self.document.tier_types.len(),
            self.document.segments.len()
        );

        Ok(self.document)
    }
}

/// Parse a complete `.eaf` document
pub(crate) fn parse_document(xml: &str) -> Result<ParsedDocument, EafError> {
    let mut reader = Reader::from_str(xml);
    let mut parser = Parser::default();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(tag) => parser.open(&tag, false)?,
            Event::Empty(tag) => parser.open(&tag, true)?,
            Event::End(tag) => parser.close(tag.name().as_ref()),
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?;
                parser.text(&text);
            }
            Event::CData(data) => {
                let data = data.into_inner();
                parser.text(&String::from_utf8_lossy(&data));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    parser.finish()
}
