use anyhow::Result;
use tracing::debug;

use super::query::{AnchorDirection, ParsedQuery, TimeWindow};
use crate::daemon::storage::{
    entities::Event,
    event_store::{EventSelection, EventStore},
};

/// Maximum number of events a single search returns.
pub const RESULT_LIMIT: usize = 100;

/// Runs `query` against `store`, newest events first.
pub fn execute(query: &ParsedQuery, store: &EventStore) -> Result<Vec<Event>> {
    let mut selection = EventSelection {
        limit: RESULT_LIMIT,
        ..Default::default()
    };

    if let Some(window) = query.window() {
        apply_window(&mut selection, window);
    }

    if let Some(anchor) = query.anchor() {
        let Some(occurrence) = store.latest_occurrence_of(&anchor.app)? else {
            debug!("No occurrence of anchor app, nothing to return");
            return Ok(vec![]);
        };
        match anchor.direction {
            AnchorDirection::After => selection.strictly_after = Some(occurrence),
        }
    }

    let terms = query.terms();
    if !terms.is_empty() {
        let Some(expression) = match_expression(terms) else {
            debug!("Search terms have nothing to match");
            return Ok(vec![]);
        };
        selection.text_match = Some(expression);
    }

    store.select_events(&selection)
}

fn apply_window(selection: &mut EventSelection, window: &TimeWindow) {
    selection.not_before = window.start;
    selection.before = window.end;
}

/// Builds an FTS5 expression matching any of `terms`. Each term is quoted so FTS operators
/// and punctuation typed by the user are taken literally.
fn match_expression(terms: &[String]) -> Option<String> {
    let phrases = terms
        .iter()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>();
    if phrases.is_empty() {
        None
    } else {
        Some(phrases.join(" OR "))
    }
}
