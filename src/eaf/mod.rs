/*!
 * The ELAN document.
 *
 * `ElanData` holds everything read from an `.eaf` file: header metadata, the
 * associated audio, tiers, tier types and the tier table of segments. Every
 * effective edit flips the `modified` flag; saving clears it.
 */

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::EafError;
use crate::segments::{Segment, Segmentations};
use crate::tiers::{Tier, TierType, DEFAULT_TIER, DEFAULT_TIER_TYPE};

pub(crate) mod reader;
mod writer;

// @const: Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// @const: Encoding of every `.eaf` file
pub const ELAN_ENCODING: &str = "UTF-8";

// @const: Smallest document ELAN opens; the starting point of every new document
pub const MINIMUM_ELAN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ANNOTATION_DOCUMENT AUTHOR="" DATE=""
    FORMAT="3.0" VERSION="3.0"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="http://www.mpi.nl/tools/elan/EAFv3.0.xsd">
    <HEADER MEDIA_FILE="" TIME_UNITS="milliseconds">
    </HEADER>
    <TIME_ORDER/>
    <TIER LINGUISTIC_TYPE_REF="default-lt" TIER_ID="default"/>
    <LINGUISTIC_TYPE GRAPHIC_REFERENCES="false"
        LINGUISTIC_TYPE_ID="default-lt" TIME_ALIGNABLE="true"/>
    <CONSTRAINT
        DESCRIPTION="Time subdivision of parent annotation's time interval, no time gaps allowed within this interval" STEREOTYPE="Time_Subdivision"/>
    <CONSTRAINT
        DESCRIPTION="Symbolic subdivision of a parent annotation. Annotations refering to the same parent are ordered" STEREOTYPE="Symbolic_Subdivision"/>
    <CONSTRAINT DESCRIPTION="1-1 association with a parent annotation" STEREOTYPE="Symbolic_Association"/>
    <CONSTRAINT
        DESCRIPTION="Time alignable annotations within the parent annotation's time interval, gaps are allowed" STEREOTYPE="Included_In"/>
</ANNOTATION_DOCUMENT>
"#;

/// Library version string
pub fn version() -> String {
    format!("version {}", VERSION)
}

// @struct: Document metadata from the root element and `HEADER`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    // @field: AUTHOR
    pub author: String,

    // @field: DATE
    pub date: String,

    // @field: MEDIA_FILE
    pub media_file: String,

    // @field: TIME_UNITS
    pub time_units: String,

    // @field: PROPERTY name/value pairs
    pub properties: Vec<(String, String)>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            author: String::new(),
            date: String::new(),
            media_file: String::new(),
            time_units: "milliseconds".to_string(),
            properties: Vec::new(),
        }
    }
}

/// An ELAN transcription document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElanData {
    file: PathBuf,
    audio: Option<PathBuf>,
    header: Header,
    tiers: Vec<Tier>,
    tier_types: Vec<TierType>,
    segments: Segmentations,
    modified: bool,
}

impl ElanData {
    /// Create a minimal document with a single `default` tier
    pub fn new(file: impl AsRef<Path>) -> Result<Self, EafError> {
        Self::from_xml_str(file, MINIMUM_ELAN)
    }

    /// Read an existing `.eaf` file
    pub fn from_file(file: impl AsRef<Path>) -> Result<Self, EafError> {
        let file = file.as_ref();
        if file.as_os_str().is_empty() {
            return Err(EafError::NoFile);
        }

        let xml = fs::read_to_string(file)?;
        let data = Self::from_xml_str(file, &xml)?;

        info!("Loaded {} ({} tiers, {} segments)", file.display(), data.tiers.len(), data.segments.len());

        Ok(data)
    }

    /// Parse a document from EAF text, associating it with `file`
    pub fn from_xml_str(file: impl AsRef<Path>, xml: &str) -> Result<Self, EafError> {
        let file = file.as_ref();
        if file.as_os_str().is_empty() {
            return Err(EafError::NoFile);
        }

        let document = reader::parse_document(xml)?;

        Ok(Self {
            file: file.to_path_buf(),
            audio: document.audio,
            header: document.header,
            tiers: document.tiers,
            tier_types: document.tier_types,
            segments: document.segments,
            modified: false,
        })
    }

    /// Build a document whose tiers are exactly the tiers used by `table`
    ///
    /// Segment IDs are kept.
    pub fn from_segments(table: &Segmentations, file: impl AsRef<Path>, audio: Option<&Path>) -> Result<Self, EafError> {
        let mut data = Self::new(file)?;

        let names = table.tier_names();
        if !names.iter().any(|name| name == DEFAULT_TIER) {
            data.tiers.retain(|tier| tier.name != DEFAULT_TIER);
        }

        for segment in table {
            if segment.tier.is_empty() {
                return Err(EafError::NoTier);
            }
            if segment.start > segment.end {
                return Err(EafError::InvalidBounds {
                    start: segment.start,
                    end: segment.end,
                });
            }
            data.add_tier(&segment.tier);
            data.segments.insert(segment.clone());
        }

        if let Some(audio) = audio {
            data.add_audio(audio)?;
        }

        data.modified = false;
        Ok(data)
    }

    /// Create a new document with the given tiers and audio
    pub fn create_eaf<S: AsRef<str>>(
        file: impl AsRef<Path>,
        audio: Option<&Path>,
        tiers: &[S],
        remove_default: bool,
    ) -> Result<Self, EafError> {
        let mut data = Self::new(file)?;

        if remove_default {
            data.remove_tiers(&[DEFAULT_TIER]);
        }
        data.add_tiers(tiers);
        if let Some(audio) = audio {
            data.add_audio(audio)?;
        }

        data.modified = false;
        Ok(data)
    }

    // ===================== Accessors =====================

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// File name without its directory
    pub fn filename(&self) -> String {
        self.file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn audio(&self) -> Option<&Path> {
        self.audio.as_deref()
    }

    /// Whether the document changed since it was created, loaded or saved
    pub fn modified(&self) -> bool {
        self.modified
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Every tier and subtier name, in document order
    pub fn tier_names(&self) -> Vec<String> {
        self.tiers.iter().map(|tier| tier.name.clone()).collect()
    }

    /// Top-level tiers
    pub fn tiers(&self) -> impl Iterator<Item = &Tier> {
        self.tiers.iter().filter(|tier| !tier.is_subtier())
    }

    /// Tiers with a parent
    pub fn subtiers(&self) -> impl Iterator<Item = &Tier> {
        self.tiers.iter().filter(|tier| tier.is_subtier())
    }

    pub fn tier_types(&self) -> &[TierType] {
        &self.tier_types
    }

    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.name == name)
    }

    pub fn segments(&self) -> &Segmentations {
        &self.segments
    }

    /// Text of the segment with the given ID
    pub fn get_segment(&self, id: &str) -> Option<&str> {
        self.segments.get_segment(id).map(|segment| segment.text.as_str())
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `name` is a tier, subtier or tier type of this document
    pub fn contains(&self, name: &str) -> bool {
        self.tier(name).is_some() || self.tier_types.iter().any(|tier_type| tier_type.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Segments on other tiers overlapping the segment `id`
    pub fn overlaps(&self, id: &str, tiers: Option<&[String]>, suprasegments: bool) -> Result<Vec<&Segment>, EafError> {
        self.segments.overlaps(id, tiers, suprasegments)
    }

    // ===================== Tier mutators =====================

    /// Add a top-level tier with the default tier type
    ///
    /// Empty or already existing names are ignored.
    pub fn add_tier(&mut self, name: &str) {
        if name.is_empty() || self.tier(name).is_some() {
            debug!("Tier {:?} not added: empty or already present", name);
            return;
        }

        self.ensure_default_tier_type();
        self.tiers.push(Tier::new(name));
        self.modified = true;
    }

    /// Add a fully described tier or subtier
    pub fn add_tier_with(&mut self, tier: Tier) -> Result<(), EafError> {
        if self.tier(&tier.name).is_some() {
            return Err(EafError::DuplicateTier(tier.name));
        }
        let default_type = tier.tier_type == DEFAULT_TIER_TYPE;
        if !default_type && !self.tier_types.iter().any(|tier_type| tier_type.name == tier.tier_type) {
            return Err(EafError::UnknownTierType {
                tier: tier.name,
                type_ref: tier.tier_type,
            });
        }
        if let Some(parent) = &tier.parent {
            if self.tier(parent).is_none() {
                return Err(EafError::UnknownParent {
                    parent: parent.clone(),
                    tier: tier.name,
                });
            }
        }

        if default_type {
            self.ensure_default_tier_type();
        }
        self.tiers.push(tier);
        self.modified = true;
        Ok(())
    }

    /// Add a tier type; an existing name is left untouched
    pub fn add_tier_type(&mut self, tier_type: TierType) {
        if self.tier_types.iter().any(|existing| existing.name == tier_type.name) {
            return;
        }
        self.tier_types.push(tier_type);
        self.modified = true;
    }

    pub fn add_tiers<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            self.add_tier(name.as_ref());
        }
    }

    /// Rename a tier, its subtiers' parent references and its segments
    pub fn rename_tier(&mut self, old: &str, new: &str) -> Result<(), EafError> {
        if new.is_empty() || old == new || self.tier(old).is_none() {
            warn!("Tier {:?} not renamed to {:?}", old, new);
            return Ok(());
        }
        if self.tier(new).is_some() {
            return Err(EafError::DuplicateTier(new.to_string()));
        }

        for tier in &mut self.tiers {
            if tier.name == old {
                tier.name = new.to_string();
            }
            if tier.parent.as_deref() == Some(old) {
                tier.parent = Some(new.to_string());
            }
        }
        self.segments.rename_tier(old, new);

        self.modified = true;
        Ok(())
    }

    /// Remove tiers, every subtier below them and all their segments
    pub fn remove_tiers<S: AsRef<str>>(&mut self, names: &[S]) {
        let mut doomed: Vec<String> = names
            .iter()
            .map(|name| name.as_ref().to_string())
            .filter(|name| self.tier(name).is_some())
            .collect();

        // Cascade down the subtier hierarchy
        loop {
            let children: Vec<String> = self
                .tiers
                .iter()
                .filter(|tier| !doomed.contains(&tier.name))
                .filter(|tier| tier.parent.as_ref().is_some_and(|parent| doomed.contains(parent)))
                .map(|tier| tier.name.clone())
                .collect();
            if children.is_empty() {
                break;
            }
            doomed.extend(children);
        }

        if doomed.is_empty() {
            return;
        }

        self.tiers.retain(|tier| !doomed.contains(&tier.name));
        for name in &doomed {
            self.segments.remove_tier(name);
        }

        debug!("Removed tiers {:?}", doomed);
        self.modified = true;
    }

    /// Set the PARTICIPANT of a tier
    pub fn add_participant(&mut self, tier: &str, participant: &str) {
        self.add_tier_metadata(tier, [("PARTICIPANT", participant)]);
    }

    /// Set arbitrary `TIER` attributes
    pub fn add_tier_metadata<K, V>(&mut self, tier: &str, attributes: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let Some(target) = self.tiers.iter_mut().find(|t| t.name == tier) else {
            warn!("No tier named {:?}, metadata ignored", tier);
            return;
        };

        let mut changed = false;
        for (key, value) in attributes {
            target.set_attribute(key.as_ref(), value);
            changed = true;
        }

        self.modified |= changed;
    }

    /// Set the document AUTHOR and DATE
    pub fn add_metadata(&mut self, author: &str, date: &str) {
        if self.header.author == author && self.header.date == date {
            return;
        }
        self.header.author = author.to_string();
        self.header.date = date.to_string();
        self.modified = true;
    }

    /// Associate an audio file, stored as an absolute path
    pub fn add_audio(&mut self, audio: impl AsRef<Path>) -> Result<(), EafError> {
        let audio = audio.as_ref();
        if audio.as_os_str().is_empty() {
            return Ok(());
        }

        let absolute = std::path::absolute(audio)?;
        if self.audio.as_deref() == Some(absolute.as_path()) {
            return Ok(());
        }

        self.audio = Some(absolute);
        self.modified = true;
        Ok(())
    }

    /// Point the document at a different `.eaf` path
    pub fn change_file(&mut self, file: impl AsRef<Path>) -> Result<(), EafError> {
        let file = file.as_ref();
        if file.as_os_str().is_empty() {
            return Err(EafError::NoFile);
        }
        if self.file != file {
            self.file = file.to_path_buf();
            self.modified = true;
        }
        Ok(())
    }

    // ===================== Segment mutators =====================

    /// Add a segment, creating the tier when needed, and return its ID
    pub fn add_segment(&mut self, tier: &str, start: u64, end: u64, text: &str) -> Result<String, EafError> {
        if tier.is_empty() {
            return Err(EafError::NoTier);
        }
        if start > end {
            return Err(EafError::InvalidBounds { start, end });
        }

        self.add_tier(tier);
        let id = self.segments.add_segment(tier, start, end, text)?;

        self.modified = true;
        Ok(id)
    }

    /// Remove a segment and every REF annotation depending on it
    pub fn remove_segment(&mut self, id: &str) -> Option<Segment> {
        let removed = self.segments.remove_segment(id);
        self.modified |= removed.is_some();
        removed
    }

    pub fn split_segment(&mut self, id: &str, splits: &[u64]) -> Result<Vec<String>, EafError> {
        let ids = self.segments.split_segment(id, splits)?;
        self.modified |= !ids.is_empty();
        Ok(ids)
    }

    pub fn merge_segments(&mut self, tier: &str, ids: &[String]) -> Result<Option<String>, EafError> {
        let merged = self.segments.merge_segments(tier, ids)?;
        self.modified |= merged.is_some();
        Ok(merged)
    }

    // ===================== Output =====================

    /// Serialise the document as EAF 3.0
    pub fn to_xml_string(&self) -> Result<String, EafError> {
        writer::write_document(self)
    }

    /// Write the document to its file (or to `rename`)
    ///
    /// An existing file is only replaced when `overwrite` is set. The write
    /// goes through a temporary file in the same directory.
    pub fn save(&mut self, rename: Option<&Path>, overwrite: bool) -> Result<(), EafError> {
        if let Some(rename) = rename {
            self.change_file(rename)?;
        }

        if self.file.exists() && !overwrite {
            return Err(EafError::FileExists(self.file.clone()));
        }

        let xml = self.to_xml_string()?;

        let directory = self
            .file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut temp = tempfile::NamedTempFile::new_in(directory)?;
        temp.write_all(xml.as_bytes())?;
        temp.persist(&self.file).map_err(|e| EafError::Io(e.error))?;

        info!("Saved {}", self.file.display());
        self.modified = false;
        Ok(())
    }

    /// Deep copy with a cleared `modified` flag
    pub fn duplicate(&self) -> Self {
        Self {
            modified: false,
            ..self.clone()
        }
    }

    /// Write a JSON snapshot, by default next to the `.eaf` file
    pub fn to_snapshot(&self, path: Option<&Path>) -> Result<PathBuf, EafError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.file.with_extension("json"));

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;

        debug!("Snapshot written to {}", path.display());
        Ok(path)
    }

    /// Restore a document from a JSON snapshot
    pub fn from_snapshot(path: impl AsRef<Path>) -> Result<Self, EafError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn ensure_default_tier_type(&mut self) {
        if !self.tier_types.iter().any(|tier_type| tier_type.name == DEFAULT_TIER_TYPE) {
            self.tier_types.push(TierType::default());
        }
    }
}

impl fmt::Display for ElanData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = std::path::absolute(&self.file).unwrap_or_else(|_| self.file.clone());

        writeln!(f, "name: {}", self.filename())?;
        writeln!(f, "located at: {}", location.display())?;
        writeln!(f, "tiers: {}", self.tier_names().join(", "))?;
        match &self.audio {
            Some(audio) => {
                let name = audio.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                writeln!(f, "associated audio file: {}", name)?;
                writeln!(f, "associated audio location: {}", audio.display())?;
            }
            None => {
                writeln!(f, "associated audio file: None")?;
                writeln!(f, "associated audio location: None")?;
            }
        }
        writeln!(f, "modified: {}", self.modified)
    }
}

impl PartialEq for ElanData {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file
            && self.audio == other.audio
            && self.tier_names() == other.tier_names()
            && self.segments == other.segments
            && self.modified == other.modified
    }
}

impl<'a> IntoIterator for &'a ElanData {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
