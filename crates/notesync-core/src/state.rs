//! Application state and reducer
//!
//! [`AppState`] is the single root snapshot of the client. It only ever
//! changes by applying an [`Action`] through [`reduce`], which returns a
//! new snapshot and leaves its input untouched. Notes are held behind
//! `Arc` so entries an action does not touch are shared between snapshots.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{FormField, Note, NoteDraft, NoteId};

/// One immutable snapshot of the full application state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    /// Notes, newest local insert first; bulk fetch order is kept as received
    pub notes: Vec<Arc<Note>>,
    /// True until the first bulk fetch completes, successfully or not
    pub loading: bool,
    /// True once the bulk fetch has failed; never cleared
    pub error: bool,
    /// Draft for the next note to create
    pub form: NoteDraft,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            notes: Vec::new(),
            loading: true,
            error: false,
            form: NoteDraft::default(),
        }
    }
}

impl AppState {
    /// Find a note by id
    pub fn note(&self, id: &NoteId) -> Option<&Arc<Note>> {
        self.notes.iter().find(|n| &n.id == id)
    }

    /// Whether a note with this id is present
    pub fn contains(&self, id: &NoteId) -> bool {
        self.note(id).is_some()
    }

    /// Notes without the entry for `id`
    ///
    /// Remaining entries are shared with this snapshot.
    pub fn notes_without(&self, id: &NoteId) -> Vec<Arc<Note>> {
        self.notes
            .iter()
            .filter(|n| &n.id != id)
            .cloned()
            .collect()
    }

    /// Notes with the entry for `id` replaced by `f(entry)`
    ///
    /// Every other entry is shared with this snapshot.
    pub fn notes_mapped(&self, id: &NoteId, f: impl Fn(&Note) -> Note) -> Vec<Arc<Note>> {
        self.notes
            .iter()
            .map(|n| {
                if &n.id == id {
                    Arc::new(f(n))
                } else {
                    Arc::clone(n)
                }
            })
            .collect()
    }
}

/// State transitions
///
/// Serialized with a `type` tag (`{"type": "ADD_NOTE", "note": {...}}`).
/// Any unrecognised `type` decodes to [`Action::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Replace the note list wholesale and finish loading
    SetNotes { notes: Vec<Arc<Note>> },
    /// Insert a note at the front
    AddNote { note: Note },
    /// Remove the note with this note's id
    DeleteNote { note: Note },
    /// Replace the note with this note's id
    UpdateNote { note: Note },
    /// Clear the creation form
    ResetForm,
    /// Set one form field
    SetInput { field: FormField, value: String },
    /// The bulk fetch failed
    Error,
    /// Unrecognised action, ignored
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Build a `SetNotes` from owned notes
    pub fn set_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        Action::SetNotes {
            notes: notes.into_iter().map(Arc::new).collect(),
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Action::SetNotes { .. } => "SET_NOTES",
            Action::AddNote { .. } => "ADD_NOTE",
            Action::DeleteNote { .. } => "DELETE_NOTE",
            Action::UpdateNote { .. } => "UPDATE_NOTE",
            Action::ResetForm => "RESET_FORM",
            Action::SetInput { .. } => "SET_INPUT",
            Action::Error => "ERROR",
            Action::Unknown => "UNKNOWN",
        }
    }
}

/// Apply `action` to `state`, producing the next snapshot
///
/// Total: never fails and never panics. `SetNotes` keeps only the first
/// entry for each id, and `AddNote` for an id that is already present
/// replaces that entry in place, so the list never holds two entries with
/// the same id.
pub fn reduce(state: &AppState, action: Action) -> AppState {
    match action {
        Action::SetNotes { notes } => AppState {
            notes: dedup_by_id(notes),
            loading: false,
            ..state.clone()
        },
        Action::AddNote { note } => {
            let notes = if state.contains(&note.id) {
                replace_by_id(&state.notes, note)
            } else {
                let mut notes = Vec::with_capacity(state.notes.len() + 1);
                notes.push(Arc::new(note));
                notes.extend(state.notes.iter().cloned());
                notes
            };
            AppState {
                notes,
                ..state.clone()
            }
        }
        Action::DeleteNote { note } => {
            if !state.contains(&note.id) {
                return state.clone();
            }
            AppState {
                notes: state.notes_without(&note.id),
                ..state.clone()
            }
        }
        Action::UpdateNote { note } => {
            if !state.contains(&note.id) {
                return state.clone();
            }
            AppState {
                notes: replace_by_id(&state.notes, note),
                ..state.clone()
            }
        }
        Action::ResetForm => AppState {
            form: NoteDraft::default(),
            ..state.clone()
        },
        Action::SetInput { field, value } => AppState {
            form: state.form.with_field(field, value),
            ..state.clone()
        },
        Action::Error => AppState {
            loading: false,
            error: true,
            ..state.clone()
        },
        Action::Unknown => state.clone(),
    }
}

/// Drop repeated ids, keeping the first occurrence and the given order
fn dedup_by_id(notes: Vec<Arc<Note>>) -> Vec<Arc<Note>> {
    let mut seen = HashSet::with_capacity(notes.len());
    notes
        .into_iter()
        .filter(|n| seen.insert(n.id.clone()))
        .collect()
}

fn replace_by_id(notes: &[Arc<Note>], note: Note) -> Vec<Arc<Note>> {
    let note = Arc::new(note);
    notes
        .iter()
        .map(|n| {
            if n.id == note.id {
                Arc::clone(&note)
            } else {
                Arc::clone(n)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::OriginTag;

    fn note(id: &str) -> Note {
        Note::with_id(id, format!("name-{}", id), "desc", OriginTag::from("other"))
    }

    fn state_with(ids: &[&str]) -> AppState {
        reduce(&AppState::default(), Action::set_notes(ids.iter().map(|id| note(id))))
    }

    fn ids(state: &AppState) -> Vec<&str> {
        state.notes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_initial_state() {
        let state = AppState::default();
        assert!(state.notes.is_empty());
        assert!(state.loading);
        assert!(!state.error);
        assert_eq!(state.form, NoteDraft::default());
    }

    #[test]
    fn test_set_notes_finishes_loading() {
        let state = state_with(&["a", "b"]);
        assert!(!state.loading);
        assert_eq!(ids(&state), vec!["a", "b"]);
    }

    #[test]
    fn test_add_note_prepends() {
        let state = state_with(&["a"]);
        let next = reduce(&state, Action::AddNote { note: note("b") });
        assert_eq!(ids(&next), vec!["b", "a"]);
        // Input snapshot is untouched
        assert_eq!(ids(&state), vec!["a"]);
    }

    #[test]
    fn test_add_note_with_existing_id_replaces() {
        let state = state_with(&["a", "b"]);
        let mut changed = note("b");
        changed.name = "renamed".to_string();

        let next = reduce(&state, Action::AddNote { note: changed });
        assert_eq!(ids(&next), vec!["a", "b"]);
        assert_eq!(next.notes[1].name, "renamed");
        assert!(Arc::ptr_eq(&state.notes[0], &next.notes[0]));
    }

    #[test]
    fn test_delete_note() {
        let state = state_with(&["a", "b", "c"]);
        let next = reduce(&state, Action::DeleteNote { note: note("b") });
        assert_eq!(ids(&next), vec!["a", "c"]);
    }

    #[test]
    fn test_delete_twice_is_idempotent() {
        let state = state_with(&["a", "b"]);
        let once = reduce(&state, Action::DeleteNote { note: note("a") });
        let twice = reduce(&once, Action::DeleteNote { note: note("a") });
        assert_eq!(once, twice);
        assert_eq!(ids(&twice), vec!["b"]);
    }

    #[test]
    fn test_update_note_replaces_payload() {
        let state = state_with(&["a", "b"]);
        let updated = note("a").toggled();
        let next = reduce(&state, Action::UpdateNote { note: updated });
        assert!(next.notes[0].completed);
        assert!(!next.notes[1].completed);
        assert!(Arc::ptr_eq(&state.notes[1], &next.notes[1]));
    }

    #[test]
    fn test_update_missing_note_is_noop() {
        let state = state_with(&["a"]);
        let next = reduce(&state, Action::UpdateNote { note: note("zzz") });
        assert_eq!(next, state);
        assert!(Arc::ptr_eq(&state.notes[0], &next.notes[0]));
    }

    #[test]
    fn test_form_input_and_reset() {
        let state = AppState::default();
        let state = reduce(
            &state,
            Action::SetInput {
                field: FormField::Name,
                value: "Milk".to_string(),
            },
        );
        let state = reduce(
            &state,
            Action::SetInput {
                field: FormField::Description,
                value: "2%".to_string(),
            },
        );
        assert_eq!(state.form, NoteDraft::new("Milk", "2%"));

        let state = reduce(&state, Action::ResetForm);
        assert_eq!(state.form, NoteDraft::default());
    }

    #[test]
    fn test_error_is_sticky() {
        let state = reduce(&AppState::default(), Action::Error);
        assert!(state.error);
        assert!(!state.loading);

        let state = reduce(&state, Action::set_notes(vec![note("a")]));
        let state = reduce(&state, Action::ResetForm);
        assert!(state.error);
    }

    #[test]
    fn test_unknown_action_is_identity() {
        let action: Action = serde_json::from_str(r#"{"type":"SOMETHING_ELSE"}"#).unwrap();
        assert_eq!(action, Action::Unknown);

        let state = state_with(&["a"]);
        assert_eq!(reduce(&state, action), state);
    }

    #[test]
    fn test_action_wire_format() {
        let action = Action::SetInput {
            field: FormField::Description,
            value: "2%".to_string(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "SET_INPUT");
        assert_eq!(json["field"], "description");

        let decoded: Action = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, action);
    }

    #[test]
    fn test_notes_mapped_shares_untouched_entries() {
        let state = state_with(&["a", "b", "c"]);
        let notes = state.notes_mapped(&NoteId::from("b"), Note::toggled);

        assert!(notes[1].completed);
        assert!(Arc::ptr_eq(&state.notes[0], &notes[0]));
        assert!(!Arc::ptr_eq(&state.notes[1], &notes[1]));
        assert!(Arc::ptr_eq(&state.notes[2], &notes[2]));
    }

    #[test]
    fn test_no_duplicate_ids_for_mixed_sequence() {
        let sequence = vec![
            Action::set_notes(vec![note("a"), note("a")]),
            Action::set_notes(vec![note("a"), note("b")]),
            Action::AddNote { note: note("c") },
            Action::AddNote { note: note("a") },
            Action::UpdateNote { note: note("c").toggled() },
            Action::DeleteNote { note: note("b") },
            Action::AddNote { note: note("b") },
            Action::AddNote { note: note("b") },
            Action::DeleteNote { note: note("missing") },
            Action::Unknown,
        ];

        let mut state = AppState::default();
        for action in sequence {
            state = reduce(&state, action);
            let unique: HashSet<_> = state.notes.iter().map(|n| n.id.clone()).collect();
            assert_eq!(unique.len(), state.notes.len());
        }
        assert_eq!(ids(&state), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_set_notes_keeps_first_of_repeated_ids() {
        let mut second = note("a");
        second.name = "later copy".to_string();

        let state = reduce(
            &AppState::default(),
            Action::set_notes(vec![note("a"), note("b"), second]),
        );
        assert_eq!(ids(&state), vec!["a", "b"]);
        assert_eq!(state.notes[0].name, "name-a");
    }
}
