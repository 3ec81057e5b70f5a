/*!
 * Tier and tier type records.
 *
 * A tier type (`LINGUISTIC_TYPE` in an `.eaf` file) carries the stereotype
 * constraint shared by every tier that refers to it. A tier (`TIER`) is a named
 * track of annotations; a tier with a parent is a subtier.
 */

use std::fmt;
use std::str::FromStr;

use quick_xml::events::BytesStart;
use serde::{Deserialize, Serialize};

use crate::eaf::reader::{read_attributes, require};
use crate::errors::EafError;

// @const: Default linguistic type of a new document
pub const DEFAULT_TIER_TYPE: &str = "default-lt";

// @const: Default tier of a new document
pub const DEFAULT_TIER: &str = "default";

/// Stereotype constraint of a tier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stereotype {
    #[default]
    None,
    #[serde(rename = "Time_Subdivision")]
    TimeSubdivision,
    #[serde(rename = "Symbolic_Subdivision")]
    SymbolicSubdivision,
    #[serde(rename = "Symbolic_Association")]
    SymbolicAssociation,
    #[serde(rename = "Included_In")]
    IncludedIn,
}

impl Stereotype {
    /// Every stereotype, in the order ELAN lists its constraints
    pub const ALL: [Stereotype; 5] = [
        Self::None,
        Self::TimeSubdivision,
        Self::SymbolicSubdivision,
        Self::SymbolicAssociation,
        Self::IncludedIn,
    ];

    // @returns: EAF spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::TimeSubdivision => "Time_Subdivision",
            Self::SymbolicSubdivision => "Symbolic_Subdivision",
            Self::SymbolicAssociation => "Symbolic_Association",
            Self::IncludedIn => "Included_In",
        }
    }

    /// Whether annotations on tiers of this stereotype carry their own time slots
    pub fn time_alignable(&self) -> bool {
        !matches!(self, Self::SymbolicSubdivision | Self::SymbolicAssociation)
    }

    /// Description written into the matching `CONSTRAINT` tag
    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::TimeSubdivision => Some(
                "Time subdivision of parent annotation's time interval, no time gaps allowed within this interval",
            ),
            Self::SymbolicSubdivision => Some(
                "Symbolic subdivision of a parent annotation. Annotations refering to the same parent are ordered",
            ),
            Self::SymbolicAssociation => Some("1-1 association with a parent annotation"),
            Self::IncludedIn => Some(
                "Time alignable annotations within the parent annotation's time interval, gaps are allowed",
            ),
        }
    }

    /// `CONSTRAINT` tag for this stereotype; `None` has no constraint
    pub fn constraint_xml(&self) -> Option<BytesStart<'static>> {
        let description = self.description()?;
        let mut element = BytesStart::new("CONSTRAINT");
        element.push_attribute(("DESCRIPTION", description));
        element.push_attribute(("STEREOTYPE", self.as_str()));
        Some(element)
    }
}

impl fmt::Display for Stereotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stereotype {
    type Err = EafError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|stereotype| stereotype.as_str() == s)
            .copied()
            .ok_or_else(|| EafError::InvalidStereotype(s.to_string()))
    }
}

/// Settings shared by tiers (`LINGUISTIC_TYPE`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TierType {
    // @field: LINGUISTIC_TYPE_ID
    pub name: String,

    // @field: CONSTRAINTS (and TIME_ALIGNABLE)
    pub stereotype: Stereotype,
}

impl Default for TierType {
    fn default() -> Self {
        Self {
            name: DEFAULT_TIER_TYPE.to_string(),
            stereotype: Stereotype::None,
        }
    }
}

impl TierType {
    pub fn new(name: impl Into<String>, stereotype: Stereotype) -> Self {
        Self {
            name: name.into(),
            stereotype,
        }
    }

    /// Create a `TierType` from a `LINGUISTIC_TYPE` tag
    pub fn from_xml(tag: &BytesStart) -> Result<Self, EafError> {
        let attributes = read_attributes(tag)?;
        let name = require(&attributes, "LINGUISTIC_TYPE", "LINGUISTIC_TYPE_ID")?;

        let stereotype = match attributes.iter().find(|(key, _)| key == "CONSTRAINTS") {
            Some((_, value)) => value.parse()?,
            None => Stereotype::None,
        };

        Ok(Self { name, stereotype })
    }

    /// The tier type as a `LINGUISTIC_TYPE` tag
    pub fn as_xml(&self) -> BytesStart<'static> {
        let mut element = BytesStart::new("LINGUISTIC_TYPE");

        // No support for graphic references yet
        element.push_attribute(("GRAPHIC_REFERENCES", "false"));
        element.push_attribute(("LINGUISTIC_TYPE_ID", self.name.as_str()));
        element.push_attribute((
            "TIME_ALIGNABLE",
            if self.stereotype.time_alignable() { "true" } else { "false" },
        ));

        if self.stereotype != Stereotype::None {
            element.push_attribute(("CONSTRAINTS", self.stereotype.as_str()));
        }

        element
    }
}

impl fmt::Display for TierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", self.name)?;
        writeln!(f, "stereotype: {}", self.stereotype)
    }
}

/// A tier (`TIER`); subtiers carry the name of their parent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tier {
    // @field: TIER_ID
    pub name: String,

    // @field: PARTICIPANT
    #[serde(default)]
    pub participant: String,

    // @field: ANNOTATOR
    #[serde(default)]
    pub annotator: String,

    // @field: LINGUISTIC_TYPE_REF
    pub tier_type: String,

    // @field: PARENT_REF
    #[serde(default)]
    pub parent: Option<String>,

    /// Any other `TIER` attributes (e.g. `DEFAULT_LOCALE`, `LANG_REF`), kept in file order
    #[serde(default)]
    pub extra: Vec<(String, String)>,
}

impl Default for Tier {
    fn default() -> Self {
        Self::new(DEFAULT_TIER)
    }
}

impl Tier {
    /// Create a top-level tier with the default tier type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            participant: String::new(),
            annotator: String::new(),
            tier_type: DEFAULT_TIER_TYPE.to_string(),
            parent: None,
            extra: Vec::new(),
        }
    }

    /// Create a subtier of `parent` using the given tier type
    pub fn subtier(name: impl Into<String>, parent: impl Into<String>, tier_type: impl Into<String>) -> Self {
        Self {
            tier_type: tier_type.into(),
            parent: Some(parent.into()),
            ..Self::new(name)
        }
    }

    pub fn with_participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = participant.into();
        self
    }

    pub fn with_annotator(mut self, annotator: impl Into<String>) -> Self {
        self.annotator = annotator.into();
        self
    }

    pub fn is_subtier(&self) -> bool {
        self.parent.is_some()
    }

    /// Set a `TIER` attribute by its XML name
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match key {
            "PARTICIPANT" => self.participant = value,
            "ANNOTATOR" => self.annotator = value,
            _ => match self.extra.iter_mut().find(|(k, _)| k == key) {
                Some((_, existing)) => *existing = value,
                None => self.extra.push((key.to_string(), value)),
            },
        }
    }

    /// Create a `Tier` from a `TIER` tag
    pub fn from_xml(tag: &BytesStart) -> Result<Self, EafError> {
        let attributes = read_attributes(tag)?;
        let name = require(&attributes, "TIER", "TIER_ID")?;
        let tier_type = require(&attributes, "TIER", "LINGUISTIC_TYPE_REF")?;

        let mut tier = Self {
            tier_type,
            ..Self::new(name)
        };

        for (key, value) in attributes {
            match key.as_str() {
                "TIER_ID" | "LINGUISTIC_TYPE_REF" => {}
                "PARENT_REF" => tier.parent = Some(value),
                _ => tier.set_attribute(&key, value),
            }
        }

        Ok(tier)
    }

    /// The tier as a `TIER` tag (annotations are written by the document writer)
    pub fn as_xml(&self) -> BytesStart<'static> {
        let mut element = BytesStart::new("TIER");

        element.push_attribute(("LINGUISTIC_TYPE_REF", self.tier_type.as_str()));
        element.push_attribute(("TIER_ID", self.name.as_str()));

        if let Some(parent) = &self.parent {
            element.push_attribute(("PARENT_REF", parent.as_str()));
        }
        if !self.participant.is_empty() {
            element.push_attribute(("PARTICIPANT", self.participant.as_str()));
        }
        if !self.annotator.is_empty() {
            element.push_attribute(("ANNOTATOR", self.annotator.as_str()));
        }
        for (key, value) in &self.extra {
            element.push_attribute((key.as_str(), value.as_str()));
        }

        element
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", self.name)?;
        if let Some(parent) = &self.parent {
            writeln!(f, "parent: {}", parent)?;
        }
        writeln!(f, "tier type: {}", self.tier_type)
    }
}
