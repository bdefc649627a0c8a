//! Query language and search over the event log.

use anyhow::Result;
use chrono::{DateTime, TimeZone};

use crate::daemon::storage::{entities::Event, event_store::EventStore};

pub mod executor;
pub mod query;

/// Parses `raw` relative to `now` and runs it against `store`.
pub fn run_search<Tz: TimeZone>(store: &EventStore, raw: &str, now: &DateTime<Tz>) -> Result<Vec<Event>> {
    let query = query::parse(raw, now);
    executor::execute(&query, store)
}
