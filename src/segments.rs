use std::fmt;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::EafError;

// @module: Timed annotation segments and the tier table

// @const: Annotation ID regex, ELAN writes `a1`, `a2`, ...
static ANNOTATION_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^a(\d+)$").expect("valid annotation id regex"));

// @struct: Single annotation segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    // @field: ANNOTATION_ID
    pub id: String,

    // @field: TIER_ID of the owning tier
    pub tier: String,

    // @field: Start time in ms
    pub start: u64,

    // @field: End time in ms
    pub end: u64,

    // @field: Annotation text
    pub text: String,

    // @field: ANNOTATION_REF for symbolic annotations
    #[serde(default)]
    pub reference: Option<String>,
}

impl Segment {
    /// Creates a new time-aligned segment
    pub fn new(id: impl Into<String>, tier: impl Into<String>, start: u64, end: u64, text: impl Into<String>) -> Self {
        Segment {
            id: id.into(),
            tier: tier.into(),
            start,
            end,
            text: text.into(),
            reference: None,
        }
    }

    /// Length of the segment in ms
    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Numeric part of an `aN` annotation ID
    pub fn numeric_id(id: &str) -> Option<u64> {
        ANNOTATION_ID_REGEX
            .captures(id)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}-{}: {}", self.id, self.tier, self.start, self.end, self.text)
    }
}

/// The tier table: every segment of a document, in insertion order
///
/// Columns mirror the segment fields: TIER, START, END, TEXT, ID and the
/// derived DURATION.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmentations {
    segments: Vec<Segment>,
}

impl Segmentations {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Find a segment by annotation ID
    pub fn get_segment(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.id == id)
    }

    /// All segments on one tier
    pub fn tier_segments<'a>(&'a self, tier: &'a str) -> impl Iterator<Item = &'a Segment> + 'a {
        self.segments.iter().filter(move |segment| segment.tier == tier)
    }

    /// Distinct tier names in order of first appearance
    pub fn tier_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for segment in &self.segments {
            if !names.contains(&segment.tier) {
                names.push(segment.tier.clone());
            }
        }
        names
    }

    /// Next free `aN` annotation ID
    pub fn next_id(&self) -> String {
        format!("a{}", self.last_used_id() + 1)
    }

    /// Largest numeric annotation ID in use (0 when none)
    pub fn last_used_id(&self) -> u64 {
        self.segments
            .iter()
            .filter_map(|segment| Segment::numeric_id(&segment.id))
            .max()
            .unwrap_or(0)
    }

    /// Add a time-aligned segment and return its new annotation ID
    pub fn add_segment(&mut self, tier: &str, start: u64, end: u64, text: &str) -> Result<String, EafError> {
        if start > end {
            return Err(EafError::InvalidBounds { start, end });
        }

        let id = self.next_id();
        self.segments.push(Segment::new(id.clone(), tier, start, end, text));

        Ok(id)
    }

    /// Insert a segment keeping its ID
    pub fn insert(&mut self, segment: Segment) {
        if self.get_segment(&segment.id).is_some() {
            warn!("Duplicate annotation ID {}, keeping both segments", segment.id);
        }
        self.segments.push(segment);
    }

    /// Remove a segment by ID, returning it if it existed
    ///
    /// REF segments pointing at it are removed too, down the whole chain.
    pub fn remove_segment(&mut self, id: &str) -> Option<Segment> {
        let position = self.segments.iter().position(|segment| segment.id == id)?;
        let removed = self.segments.remove(position);
        self.remove_dependents(&removed.id);
        Some(removed)
    }

    /// Drop every segment whose reference chain ends at `id`
    fn remove_dependents(&mut self, id: &str) {
        let mut parents = vec![id.to_string()];
        while let Some(parent) = parents.pop() {
            // A duplicate ID still anchors its children
            if self.get_segment(&parent).is_some() {
                continue;
            }
            let (orphans, kept): (Vec<Segment>, Vec<Segment>) = std::mem::take(&mut self.segments)
                .into_iter()
                .partition(|segment| segment.reference.as_deref() == Some(parent.as_str()));
            self.segments = kept;
            for orphan in orphans {
                debug!("Removed {} along with its parent {}", orphan.id, parent);
                parents.push(orphan.id);
            }
        }
    }

    /// Remove every segment on a tier, returning how many were removed
    pub fn remove_tier(&mut self, tier: &str) -> usize {
        let before = self.segments.len();
        self.segments.retain(|segment| segment.tier != tier);
        before - self.segments.len()
    }

    /// Move every segment of `old` to `new`
    pub fn rename_tier(&mut self, old: &str, new: &str) {
        for segment in self.segments.iter_mut().filter(|segment| segment.tier == old) {
            segment.tier = new.to_string();
        }
    }

    /// Rows ordered by start, end and tier
    pub fn sorted(&self) -> Vec<&Segment> {
        let mut rows: Vec<&Segment> = self.segments.iter().collect();
        rows.sort_by(|a, b| (a.start, a.end, &a.tier).cmp(&(b.start, b.end, &b.tier)));
        rows
    }

    /// Find all segments on other tiers which overlap the given segment
    ///
    /// `tiers` restricts the search (all tiers when `None` or empty); the
    /// segment's own tier is always excluded. With `suprasegments`, segments
    /// that completely contain the given one are included too.
    pub fn overlaps(&self, id: &str, tiers: Option<&[String]>, suprasegments: bool) -> Result<Vec<&Segment>, EafError> {
        let target = self
            .get_segment(id)
            .ok_or_else(|| EafError::SegmentNotFound(id.to_string()))?;

        let (start, stop) = (target.start, target.end);

        let overlapping = self
            .segments
            .iter()
            .filter(|segment| segment.tier != target.tier)
            .filter(|segment| match tiers {
                Some(tiers) if !tiers.is_empty() => tiers.contains(&segment.tier),
                _ => true,
            })
            .filter(|segment| {
                // Start or end falls inside the segment's bounds
                let partial = (segment.start >= start && segment.start < stop)
                    || (segment.end > start && segment.end <= stop);
                let containing = suprasegments && segment.start < start && segment.end > stop;
                partial || containing
            })
            .collect();

        Ok(overlapping)
    }

    /// Split a segment at the given times (ms), returning the new IDs
    ///
    /// Every split point must fall strictly inside the segment. Each piece keeps
    /// the original text.
    pub fn split_segment(&mut self, id: &str, splits: &[u64]) -> Result<Vec<String>, EafError> {
        if splits.is_empty() {
            return Ok(Vec::new());
        }

        let segment = self
            .get_segment(id)
            .cloned()
            .ok_or_else(|| EafError::SegmentNotFound(id.to_string()))?;

        let mut points = splits.to_vec();
        points.sort_unstable();
        points.dedup();

        if points.iter().any(|&point| point <= segment.start || point >= segment.end) {
            return Err(EafError::SplitOutOfBounds(id.to_string()));
        }

        self.remove_segment(id);

        let mut bounds = Vec::with_capacity(points.len() + 2);
        bounds.push(segment.start);
        bounds.extend(points);
        bounds.push(segment.end);

        let mut ids = Vec::with_capacity(bounds.len() - 1);
        for window in bounds.windows(2) {
            ids.push(self.add_segment(&segment.tier, window[0], window[1], &segment.text)?);
        }

        debug!("Split segment {} into {:?}", id, ids);

        Ok(ids)
    }

    /// Merge segments of one tier into a single segment
    ///
    /// Returns the new ID, or `None` when no listed segment lives on `tier`.
    pub fn merge_segments(&mut self, tier: &str, ids: &[String]) -> Result<Option<String>, EafError> {
        let mut selected: Vec<Segment> = self
            .segments
            .iter()
            .filter(|segment| segment.tier == tier && ids.contains(&segment.id))
            .cloned()
            .collect();

        if selected.is_empty() {
            return Ok(None);
        }

        selected.sort_by_key(|segment| (segment.start, segment.end));

        let start = selected.iter().map(|segment| segment.start).min().unwrap_or(0);
        let end = selected.iter().map(|segment| segment.end).max().unwrap_or(start);
        let text = selected
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        for segment in &selected {
            self.remove_segment(&segment.id);
        }

        self.add_segment(tier, start, end, &text).map(Some)
    }
}

impl<'a> IntoIterator for &'a Segmentations {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl FromIterator<Segment> for Segmentations {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}
