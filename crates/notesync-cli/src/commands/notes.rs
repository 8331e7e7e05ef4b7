//! Note command handlers

use anyhow::{anyhow, bail, Context, Result};

use notesync_core::{AppState, FormField, NoteId, SyncEngine};

use crate::output::{short_id, Output};

/// Fetch and print every note
pub async fn list(engine: &mut SyncEngine, output: &Output) -> Result<()> {
    engine.load().await.context("Failed to fetch notes")?;
    output.print_notes(&engine.state().notes);
    Ok(())
}

/// Create a note
pub async fn add(
    engine: &mut SyncEngine,
    name: String,
    description: String,
    output: &Output,
) -> Result<()> {
    engine.set_input(FormField::Name, name);
    engine.set_input(FormField::Description, description);

    let pending = engine.submit_form()?;
    let id = pending.id().clone();
    pending.wait().await.context("Failed to create note")?;

    output.success(&format!("Created note: {}", id));
    if let Some(note) = engine.state().note(&id) {
        output.print_note(note);
    }
    Ok(())
}

/// Flip a note between open and done
pub async fn toggle(engine: &mut SyncEngine, id: String, output: &Output) -> Result<()> {
    engine.load().await.context("Failed to fetch notes")?;
    let note_id = resolve_note_id(&id, engine.state())?;

    let pending = engine
        .toggle_completed(&note_id)
        .ok_or_else(|| anyhow!("Note not found: {}", id))?;
    pending.wait().await.context("Failed to update note")?;

    let completed = engine
        .state()
        .note(&note_id)
        .map(|note| note.completed)
        .unwrap_or_default();
    output.success(&format!(
        "Marked {} as {}",
        short_id(&note_id),
        if completed { "done" } else { "open" }
    ));
    Ok(())
}

/// Delete a note
pub async fn delete(engine: &mut SyncEngine, id: String, output: &Output) -> Result<()> {
    engine.load().await.context("Failed to fetch notes")?;
    let note_id = resolve_note_id(&id, engine.state())?;

    let pending = engine
        .delete_note(&note_id)
        .ok_or_else(|| anyhow!("Note not found: {}", id))?;
    pending.wait().await.context("Failed to delete note")?;

    output.success(&format!("Deleted note: {}", note_id));
    Ok(())
}

/// Resolve a note ID (supports full ID or unique prefix)
fn resolve_note_id(id: &str, state: &AppState) -> Result<NoteId> {
    // Exact match first
    let exact = NoteId::from(id);
    if state.contains(&exact) {
        return Ok(exact);
    }

    let matches: Vec<_> = state
        .notes
        .iter()
        .filter(|n| n.id.as_str().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No note found matching: {}", id),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple notes match '{}':", id);
            for note in &matches {
                eprintln!("  {} - {}", note.id, note.name);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
