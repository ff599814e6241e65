//! The thing being reserved.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Category of bookable subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// Hotel room, booked per stay.
    Room,
    /// Any other bookable asset (meeting room, parking spot, equipment).
    Resource,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Room => "room",
            SubjectKind::Resource => "resource",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "room" => Ok(SubjectKind::Room),
            "resource" => Ok(SubjectKind::Resource),
            other => Err(ValidationError::invalid_format(
                "subject_kind",
                format!("unknown subject kind '{}'", other),
            )),
        }
    }
}

/// A room or resource that reservations are made against.
///
/// Availability is always evaluated per subject; two reservations only
/// compete when both kind and id match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    kind: SubjectKind,
    id: String,
}

impl Subject {
    pub fn new(kind: SubjectKind, id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("subject_id"));
        }
        Ok(Self { kind, id })
    }

    pub fn room(id: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(SubjectKind::Room, id)
    }

    pub fn resource(id: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(SubjectKind::Resource, id)
    }

    pub fn kind(&self) -> SubjectKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
