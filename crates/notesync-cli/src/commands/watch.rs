//! Watch command handler

use anyhow::{Context, Result};
use tracing::info;

use notesync_core::{EventOutcome, SyncEngine};

use crate::output::Output;

/// Print the current notes, then every change made elsewhere until Ctrl-C
pub async fn run(engine: &mut SyncEngine, output: &Output) -> Result<()> {
    engine.load().await.context("Failed to fetch notes")?;
    output.print_notes(&engine.state().notes);

    let mut subs = engine
        .subscribe()
        .await
        .context("Failed to subscribe to note events")?;
    output.message("Watching for changes (Ctrl-C to stop)...");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                break;
            }
            event = subs.next_event() => {
                let Some(event) = event else {
                    output.warn("Connection to server closed");
                    break;
                };
                let kind = event.kind;
                let note = event.note.clone();
                if engine.apply_remote_event(event) == EventOutcome::Applied {
                    output.print_event(kind, &note);
                }
            }
        }
    }

    subs.cancel();
    Ok(())
}
