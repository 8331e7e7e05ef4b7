//! Data models for notesync
//!
//! Defines the note entity, the in-progress creation draft, and the
//! payloads carried by remote mutations.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::OriginTag;

/// Note identifier
///
/// Assigned client-side at creation so optimistic inserts have a stable
/// identity before the backend confirms them. Ids received from the backend
/// are taken as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Generate a new random id
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A to-do note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier, immutable after creation
    pub id: NoteId,
    /// Short name
    pub name: String,
    /// Description text
    pub description: String,
    /// Whether the note is done
    #[serde(default)]
    pub completed: bool,
    /// Tag of the client that created this note
    #[serde(alias = "clientId")]
    pub origin_tag: OriginTag,
}

impl Note {
    /// Create a new, not yet completed note owned by `origin_tag`
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        origin_tag: OriginTag,
    ) -> Self {
        Self {
            id: NoteId::new(),
            name: name.into(),
            description: description.into(),
            completed: false,
            origin_tag,
        }
    }

    /// Create a note with a specific ID (for data received from elsewhere)
    pub fn with_id(
        id: impl Into<NoteId>,
        name: impl Into<String>,
        description: impl Into<String>,
        origin_tag: OriginTag,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            completed: false,
            origin_tag,
        }
    }

    /// Copy of this note with `completed` inverted
    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }
}

/// Editable fields of the creation form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormField {
    Name,
    Description,
}

/// The in-progress draft for note creation
///
/// Not an entity until submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub name: String,
    pub description: String,
}

impl NoteDraft {
    /// Create a draft with both fields set
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Copy of this draft with one field replaced
    pub fn with_field(&self, field: FormField, value: impl Into<String>) -> Self {
        let mut draft = self.clone();
        match field {
            FormField::Name => draft.name = value.into(),
            FormField::Description => draft.description = value.into(),
        }
        draft
    }

    /// Whether both required fields are filled in
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.description.is_empty()
    }

    /// Turn the draft into a new note owned by `origin_tag`
    pub fn into_note(self, origin_tag: OriginTag) -> Note {
        Note::new(self.name, self.description, origin_tag)
    }
}

/// Payload of the update mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteUpdate {
    pub id: NoteId,
    pub completed: bool,
}

impl From<&Note> for NoteUpdate {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            completed: note.completed,
        }
    }
}
