use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::warn;

use crate::{
    daemon::storage::{entities::Event, event_store::EventStore},
    search::run_search,
};

#[derive(Debug, Parser)]
pub struct SearchCommand {
    #[arg(
        help = "Query. Supports free text, after:YYYY-MM-DD, before:YYYY-MM-DD, \"today\", \"yesterday\", \"last hour\", \"last 24 hours\", \"this week\", \"last week\" and \"after <app>\""
    )]
    query: Vec<String>,
    #[arg(long, help = "Print results as json")]
    json: bool,
}

#[derive(Debug, Parser)]
pub struct TagCommand {
    #[arg(help = "Id of the event, as printed by search")]
    id: i64,
    #[arg(help = "Tag to attach")]
    tag: String,
}

pub fn process_search_command(
    mut store: EventStore,
    SearchCommand { query, json }: SearchCommand,
) -> Result<()> {
    let raw = query.join(" ");
    let events = run_search(&store, &raw, &Local::now())?;

    // Results are still useful when the history can't be updated.
    if let Err(e) = store.record_search(&raw) {
        warn!("Failed to remember search {e:?}");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        print_events(&events);
    }
    Ok(())
}

pub fn print_recent_searches(store: &EventStore) -> Result<()> {
    for query in store.recent_searches()? {
        println!("{query}");
    }
    Ok(())
}

pub fn process_tag_command(mut store: EventStore, TagCommand { id, tag }: TagCommand) -> Result<()> {
    if store.append_tag(id, &tag)?.is_none() {
        println!("no event with id {id}");
        return Ok(());
    }
    if let Some(event) = store.get_event(id)? {
        println!("{}", format_event(&event));
    }
    Ok(())
}

pub fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("Nothing found");
        return;
    }
    for event in events {
        println!("{}", format_event(event));
    }
}

fn format_event(event: &Event) -> String {
    let time = event.timestamp.with_timezone(&Local);
    let mut line = format!(
        "{}\t{}\t{}\t{}",
        event.id,
        time.format("%x %H:%M:%S"),
        event.app,
        event.title
    );
    if !event.tags.is_empty() {
        line.push_str(&format!("\t[{}]", event.tags.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::format_event;
    use crate::daemon::storage::entities::Event;

    #[test]
    fn test_format_event_lists_tags() {
        let event = Event {
            id: 7,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap(),
            app: "code".into(),
            title: "main.rs".into(),
            tags: vec!["work".into(), "rust".into()],
        };

        let line = format_event(&event);

        assert!(line.starts_with("7\t"));
        assert!(line.ends_with("\tcode\tmain.rs\t[work, rust]"));
    }
}
