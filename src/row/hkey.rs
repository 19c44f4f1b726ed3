//! Hierarchical keys
//!
//! An hkey locates a row inside its group: one segment per level from the
//! root table down to the row's own table. A descendant's hkey always has
//! its ancestor's hkey as a strict prefix, and hkey order is the physical
//! order of a group scan.

use std::cmp::Ordering;
use std::fmt;

use super::value::Value;

/// One level of an hkey: the table ordinal and that table's key values
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HKeySegment {
    /// Ordinal of the table at this level
    pub ordinal: u32,
    /// Primary key values of the row at this level
    pub values: Vec<Value>,
}

impl HKeySegment {
    /// Creates a segment
    pub fn new(ordinal: u32, values: Vec<Value>) -> Self {
        Self { ordinal, values }
    }
}

/// Composite, variable-depth hierarchical key
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HKey {
    segments: Vec<HKeySegment>,
}

impl HKey {
    /// Creates an hkey from root-first segments
    pub fn new(segments: Vec<HKeySegment>) -> Self {
        Self { segments }
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Root-first segments
    pub fn segments(&self) -> &[HKeySegment] {
        &self.segments
    }

    /// Ordinal of the deepest segment
    pub fn leaf_ordinal(&self) -> Option<u32> {
        self.segments.last().map(|s| s.ordinal)
    }

    /// Returns the ancestor hkey with the given number of segments.
    ///
    /// A depth at or beyond this key's depth returns a copy.
    pub fn truncate(&self, depth: usize) -> HKey {
        let depth = depth.min(self.segments.len());
        HKey {
            segments: self.segments[..depth].to_vec(),
        }
    }

    /// Appends a segment, producing a child hkey
    pub fn child(&self, segment: HKeySegment) -> HKey {
        let mut segments = self.segments.clone();
        segments.push(segment);
        HKey { segments }
    }

    /// True if `self` equals `other` or is an ancestor of it
    pub fn is_prefix_of(&self, other: &HKey) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments[..] == other.segments[..self.segments.len()]
    }

    /// True if `self` is an ancestor of `other` (prefix and shorter)
    pub fn is_strict_prefix_of(&self, other: &HKey) -> bool {
        self.segments.len() < other.segments.len() && self.is_prefix_of(other)
    }

    /// All key values flattened root-first
    pub fn key_values(&self) -> Vec<Value> {
        self.segments
            .iter()
            .flat_map(|s| s.values.iter().cloned())
            .collect()
    }
}

impl PartialOrd for HKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HKey {
    /// Lexicographic over segments; a prefix sorts before its extensions.
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.cmp(&other.segments)
    }
}

impl fmt::Display for HKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{{{}", segment.ordinal)?;
            for value in &segment.values {
                write!(f, ", {}", value)?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}
