//! Core types for the shape store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a shape.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(pub String);

impl ShapeId {
    pub fn new(id: impl Into<String>) -> Self {
        ShapeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeId({})", self.0)
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ShapeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShapeId {
    fn from(s: &str) -> Self {
        ShapeId(s.to_string())
    }
}

impl From<String> for ShapeId {
    fn from(s: String) -> Self {
        ShapeId(s)
    }
}

/// The kind of a shape. Fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Square,
    Circle,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Square => "square",
            ShapeKind::Circle => "circle",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "square" => Ok(ShapeKind::Square),
            "circle" => Ok(ShapeKind::Circle),
            other => Err(format!("unknown shape kind: {}", other)),
        }
    }
}

/// A single shape held by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub color: String,
}

impl Shape {
    pub fn new(id: impl Into<ShapeId>, kind: ShapeKind, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            color: color.into(),
        }
    }

    pub fn square(id: impl Into<ShapeId>, color: impl Into<String>) -> Self {
        Self::new(id, ShapeKind::Square, color)
    }

    pub fn circle(id: impl Into<ShapeId>, color: impl Into<String>) -> Self {
        Self::new(id, ShapeKind::Circle, color)
    }
}

/// The document written to the storage slot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub records: Vec<Shape>,
}

/// Point-in-time copy of the store: records plus every derived property.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub records: Vec<Shape>,
    pub square_count: usize,
    pub circle_count: usize,
}

impl StateSnapshot {
    /// Build a snapshot by copying `records` and computing the counts.
    pub fn from_records(records: &[Shape]) -> Self {
        Self {
            records: records.to_vec(),
            square_count: count_kind(records, ShapeKind::Square),
            circle_count: count_kind(records, ShapeKind::Circle),
        }
    }
}

/// Number of records of the given kind.
pub fn count_kind(records: &[Shape], kind: ShapeKind) -> usize {
    records.iter().filter(|s| s.kind == kind).count()
}
