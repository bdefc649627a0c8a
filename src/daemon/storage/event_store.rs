use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::{
    Connection, OptionalExtension, Row, TransactionBehavior, params, params_from_iter,
    types::{Type, Value},
};
use tracing::{debug, info};

use crate::utils::time::{from_micros, to_micros};

use super::{
    entities::{AppStatistic, Event, NewEvent},
    schema::run_migrations,
};

/// How long a connection waits on a lock held by another connection before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const EVENT_COLUMNS: &str = "e.id, e.timestamp, e.app, e.title, e.tags";

/// Read filter used by the search executor. Bounds are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSelection {
    /// FTS5 match expression over app and title.
    pub text_match: Option<String>,
    /// Inclusive lower bound.
    pub not_before: Option<DateTime<Utc>>,
    /// Exclusive lower bound.
    pub strictly_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub before: Option<DateTime<Utc>>,
    pub limit: usize,
}

/// The event log. Each instance owns one SQLite connection; the database runs in WAL mode so
/// a writer and any number of readers can work from separate instances at the same time.
pub struct EventStore {
    conn: Connection,
}

impl EventStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        let store = Self::from_connection(conn)?;
        info!("Opened event store at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("failed to set busy timeout")?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .context("failed to enable WAL mode")?;
        debug!("Journal mode is {mode}");
        run_migrations(&mut conn).context("failed to run database migrations")?;
        Ok(Self { conn })
    }

    pub(super) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(super) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Writes the event row and its full-text entry as one transaction. The timestamp is
    /// raised to the newest stored one if the wall clock went backwards.
    pub fn record_event(&mut self, event: NewEvent) -> Result<Event> {
        if event.app.trim().is_empty() {
            bail!("event app name must not be empty");
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin event transaction")?;

        let newest: Option<i64> = tx
            .query_row("SELECT MAX(timestamp) FROM events", [], |row| row.get(0))
            .context("failed to read newest event timestamp")?;
        let micros = newest.map_or(to_micros(event.timestamp), |newest| {
            newest.max(to_micros(event.timestamp))
        });

        tx.execute(
            "INSERT INTO events (timestamp, app, title) VALUES (?1, ?2, ?3)",
            params![micros, &*event.app, &*event.title],
        )
        .context("failed to insert event")?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO events_fts (rowid, app, title) VALUES (?1, ?2, ?3)",
            params![id, &*event.app, &*event.title],
        )
        .context("failed to index event")?;

        tx.commit().context("failed to commit event")?;

        Ok(Event {
            id,
            timestamp: from_micros(micros).unwrap_or(event.timestamp),
            app: event.app,
            title: event.title,
            tags: vec![],
        })
    }

    /// Adds `tag` to an event. Returns the updated tag list, or `None` when the event doesn't
    /// exist. Adding a tag that is already present changes nothing.
    pub fn append_tag(&mut self, id: i64, tag: &str) -> Result<Option<Vec<String>>> {
        let tag = tag.trim();
        if tag.is_empty() {
            bail!("tag must not be empty");
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin tag transaction")?;

        let stored: Option<String> = tx
            .query_row("SELECT tags FROM events WHERE id = ?1", [id], |row| row.get(0))
            .optional()
            .with_context(|| format!("failed to read tags of event {id}"))?;
        let Some(stored) = stored else {
            return Ok(None);
        };

        let mut tags: Vec<String> = serde_json::from_str(&stored)
            .with_context(|| format!("tags of event {id} are not valid json"))?;
        if !tags.iter().any(|v| v == tag) {
            tags.push(tag.to_string());
            tx.execute(
                "UPDATE events SET tags = ?1 WHERE id = ?2",
                params![serde_json::to_string(&tags)?, id],
            )
            .with_context(|| format!("failed to update tags of event {id}"))?;
        }

        tx.commit().context("failed to commit tags")?;
        Ok(Some(tags))
    }

    pub fn get_event(&self, id: i64) -> Result<Option<Event>> {
        let event = self
            .conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = ?1"),
                [id],
                row_to_event,
            )
            .optional()
            .with_context(|| format!("failed to read event {id}"))?;
        Ok(event)
    }

    /// Timestamp of the most recent event whose app contains `app`, ignoring case.
    ///
    /// Case folding happens in Rust because SQLite's `LIKE` and `lower` only fold ASCII. The
    /// distinct app names are few, so they are matched first and the newest event among them
    /// is read through `idx_events_app`.
    pub fn latest_occurrence_of(&self, app: &str) -> Result<Option<DateTime<Utc>>> {
        let needle = app.to_lowercase();
        let mut stmt = self.conn.prepare("SELECT DISTINCT app FROM events")?;
        let apps = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read app names")?
            .into_iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .map(Value::Text)
            .collect::<Vec<_>>();
        if apps.is_empty() {
            return Ok(None);
        }

        let placeholders = vec!["?"; apps.len()].join(", ");
        let micros: Option<i64> = self
            .conn
            .query_row(
                &format!(
                    "SELECT timestamp FROM events
                     WHERE app IN ({placeholders})
                     ORDER BY timestamp DESC, id DESC
                     LIMIT 1"
                ),
                params_from_iter(apps),
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to look up latest occurrence of {app}"))?;
        Ok(micros.and_then(from_micros))
    }

    /// Returns the newest events passing `selection`, newest first.
    pub fn select_events(&self, selection: &EventSelection) -> Result<Vec<Event>> {
        let mut conditions = vec![];
        let mut values: Vec<Value> = vec![];

        if let Some(expression) = &selection.text_match {
            values.push(Value::Text(expression.clone()));
            conditions.push(format!(
                "e.id IN (SELECT rowid FROM events_fts WHERE events_fts MATCH ?{})",
                values.len()
            ));
        }
        let bounds = [
            (selection.not_before, ">="),
            (selection.strictly_after, ">"),
            (selection.before, "<"),
        ];
        for (bound, operator) in bounds {
            if let Some(bound) = bound {
                values.push(Value::Integer(to_micros(bound)));
                conditions.push(format!("e.timestamp {operator} ?{}", values.len()));
            }
        }

        let filter = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        values.push(Value::Integer(selection.limit as i64));
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events e {filter}
             ORDER BY e.timestamp DESC, e.id DESC
             LIMIT ?{}",
            values.len()
        );
        debug!("Selecting events with {sql}");

        let mut stmt = self.conn.prepare(&sql).context("failed to prepare search")?;
        let events = stmt
            .query_map(params_from_iter(values), row_to_event)
            .context("failed to run search")?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read search results")?;
        Ok(events)
    }

    /// Every event, grouped by app and newest first inside each app.
    pub fn events_by_app(&self) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e ORDER BY e.app ASC, e.timestamp DESC, e.id DESC"
        ))?;
        let events = stmt
            .query_map([], row_to_event)?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read events by app")?;
        Ok(events)
    }

    /// Per-app counts, most frequent first. Ties keep alphabetical order.
    pub fn app_statistics(&self, limit: usize) -> Result<Vec<AppStatistic>> {
        let mut stmt = self.conn.prepare(
            "SELECT app, COUNT(*), MIN(timestamp), MAX(timestamp) FROM events
             GROUP BY app
             ORDER BY COUNT(*) DESC, app ASC
             LIMIT ?1",
        )?;
        let stats = stmt
            .query_map([limit as i64], row_to_statistic)?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read app statistics")?;
        Ok(stats)
    }

    /// Events in `[start, end)`, oldest first.
    pub fn events_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e
             WHERE e.timestamp >= ?1 AND e.timestamp < ?2
             ORDER BY e.timestamp ASC, e.id ASC"
        ))?;
        let events = stmt
            .query_map(params![to_micros(start), to_micros(end)], row_to_event)?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read timeline")?;
        Ok(events)
    }

    pub fn count_events(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn timestamp_column(row: &Row, index: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let micros: i64 = row.get(index)?;
    from_micros(micros).ok_or(rusqlite::Error::IntegralValueOutOfRange(index, micros))
}

fn row_to_statistic(row: &Row) -> Result<AppStatistic, rusqlite::Error> {
    let app: String = row.get(0)?;
    let count: i64 = row.get(1)?;
    Ok(AppStatistic {
        app: Arc::from(app),
        count: count.max(0) as u64,
        first_seen: timestamp_column(row, 2)?,
        last_seen: timestamp_column(row, 3)?,
    })
}

fn row_to_event(row: &Row) -> Result<Event, rusqlite::Error> {
    let timestamp = timestamp_column(row, 1)?;
    let app: String = row.get(2)?;
    let title: String = row.get(3)?;
    let tags: String = row.get(4)?;
    let tags = serde_json::from_str(&tags)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(Event {
        id: row.get(0)?,
        timestamp,
        app: Arc::from(app),
        title: Arc::from(title),
        tags,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;

    use super::{EventSelection, EventStore};
    use crate::daemon::storage::entities::NewEvent;

    pub const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), NaiveTime::MIN);

    pub fn at(offset: Duration) -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE) + offset
    }

    pub fn new_event(app: &str, title: &str, timestamp: DateTime<Utc>) -> NewEvent {
        NewEvent {
            timestamp,
            app: app.into(),
            title: title.into(),
        }
    }

    fn indexed_rows(store: &EventStore, term: &str) -> Result<i64> {
        Ok(store.connection().query_row(
            "SELECT COUNT(*) FROM events_fts WHERE events_fts MATCH ?1",
            [term],
            |row| row.get(0),
        )?)
    }

    #[test]
    fn test_record_event_assigns_increasing_ids() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;
        let first = store.record_event(new_event("firefox", "Rust docs", at(Duration::zero())))?;
        let second =
            store.record_event(new_event("code", "main.rs", at(Duration::seconds(2))))?;

        assert!(second.id > first.id);
        assert_eq!(store.get_event(first.id)?, Some(first));
        assert_eq!(store.count_events()?, 2);
        Ok(())
    }

    #[test]
    fn test_record_event_indexes_app_and_title() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;
        store.record_event(new_event("firefox", "Quarterly report", at(Duration::zero())))?;

        assert_eq!(indexed_rows(&store, "firefox")?, 1);
        assert_eq!(indexed_rows(&store, "quarterly")?, 1);
        assert_eq!(indexed_rows(&store, "slack")?, 0);
        Ok(())
    }

    #[test]
    fn test_record_event_rejects_empty_app() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;

        assert!(store.record_event(new_event("  ", "title", at(Duration::zero()))).is_err());
        assert_eq!(store.count_events()?, 0);
        let index_rows: i64 =
            store
                .connection()
                .query_row("SELECT COUNT(*) FROM events_fts", [], |row| row.get(0))?;
        assert_eq!(index_rows, 0);
        Ok(())
    }

    #[test]
    fn test_record_event_never_goes_back_in_time() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;
        store.record_event(new_event("code", "a", at(Duration::seconds(10))))?;
        let late = store.record_event(new_event("code", "b", at(Duration::seconds(5))))?;

        assert_eq!(late.timestamp, at(Duration::seconds(10)));
        Ok(())
    }

    #[test]
    fn test_append_tag_is_idempotent() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;
        let event = store.record_event(new_event("code", "main.rs", at(Duration::zero())))?;

        assert_eq!(store.append_tag(event.id, "work")?, Some(vec!["work".to_string()]));
        assert_eq!(
            store.append_tag(event.id, " review ")?,
            Some(vec!["work".to_string(), "review".to_string()])
        );
        assert_eq!(
            store.append_tag(event.id, "work")?,
            Some(vec!["work".to_string(), "review".to_string()])
        );
        assert_eq!(
            store.get_event(event.id)?.map(|v| v.tags),
            Some(vec!["work".to_string(), "review".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_append_tag_to_missing_event() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;

        assert_eq!(store.append_tag(42, "work")?, None);
        assert!(store.append_tag(42, "   ").is_err());
        Ok(())
    }

    #[test]
    fn test_latest_occurrence_ignores_case_and_wildcards() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;
        store.record_event(new_event("Google Chrome", "a", at(Duration::seconds(1))))?;
        store.record_event(new_event("slack", "b", at(Duration::seconds(2))))?;
        store.record_event(new_event("google chrome", "c", at(Duration::seconds(3))))?;

        assert_eq!(
            store.latest_occurrence_of("CHROME")?,
            Some(at(Duration::seconds(3)))
        );
        assert_eq!(store.latest_occurrence_of("zoom")?, None);
        assert_eq!(store.latest_occurrence_of("%")?, None);
        Ok(())
    }

    #[test]
    fn test_select_events_applies_bounds() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;
        for i in 0..5 {
            store.record_event(new_event("code", &format!("file {i}"), at(Duration::hours(i))))?;
        }

        let selected = store.select_events(&EventSelection {
            not_before: Some(at(Duration::hours(1))),
            before: Some(at(Duration::hours(4))),
            limit: 100,
            ..Default::default()
        })?;
        let titles = selected.iter().map(|v| &*v.title).collect::<Vec<_>>();
        assert_eq!(titles, vec!["file 3", "file 2", "file 1"]);

        let after = store.select_events(&EventSelection {
            strictly_after: Some(at(Duration::hours(3))),
            limit: 100,
            ..Default::default()
        })?;
        assert_eq!(after.len(), 1);
        assert_eq!(&*after[0].title, "file 4");
        Ok(())
    }

    #[test]
    fn test_events_by_app_and_timeline() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;
        store.record_event(new_event("slack", "general", at(Duration::minutes(0))))?;
        store.record_event(new_event("code", "main.rs", at(Duration::minutes(1))))?;
        store.record_event(new_event("slack", "random", at(Duration::minutes(2))))?;

        let by_app = store.events_by_app()?;
        let order = by_app.iter().map(|v| &*v.title).collect::<Vec<_>>();
        assert_eq!(order, vec!["main.rs", "random", "general"]);

        let stats = store.app_statistics(20)?;
        assert_eq!(&*stats[0].app, "slack");
        assert_eq!(stats[0].count, 2);

        let timeline = store.events_between(at(Duration::minutes(1)), at(Duration::minutes(3)))?;
        let order = timeline.iter().map(|v| &*v.title).collect::<Vec<_>>();
        assert_eq!(order, vec!["main.rs", "random"]);
        Ok(())
    }

    #[test]
    fn test_app_statistics_counts_and_bounds() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;
        let events = [
            ("code", 0),
            ("slack", 10),
            ("firefox", 20),
            ("code", 30),
            ("slack", 40),
            ("slack", 50),
            ("zoom", 60),
        ];
        for (app, minute) in events {
            store.record_event(new_event(app, "", at(Duration::minutes(minute))))?;
        }

        let stats = store.app_statistics(3)?;

        let summary = stats
            .iter()
            .map(|v| (&*v.app, v.count))
            .collect::<Vec<_>>();
        assert_eq!(summary, vec![("slack", 3), ("code", 2), ("firefox", 1)]);
        assert_eq!(stats[1].first_seen, at(Duration::minutes(0)));
        assert_eq!(stats[1].last_seen, at(Duration::minutes(30)));
        assert!(store.app_statistics(0)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_reader_sees_writes_of_another_connection() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("memtrail.db");
        let mut writer = EventStore::open(&path)?;
        let reader = EventStore::open(&path)?;

        writer.record_event(new_event("code", "main.rs", at(Duration::zero())))?;

        assert_eq!(reader.count_events()?, 1);
        assert_eq!(
            reader.latest_occurrence_of("code")?,
            Some(at(Duration::zero()))
        );
        Ok(())
    }

    #[test]
    fn test_latest_occurrence_folds_non_ascii_case() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;
        store.record_event(new_event("ärger", "notes", at(Duration::seconds(1))))?;
        store.record_event(new_event("ÉDITEUR", "draft", at(Duration::seconds(2))))?;

        assert_eq!(store.latest_occurrence_of("Ärger")?, Some(at(Duration::seconds(1))));
        assert_eq!(store.latest_occurrence_of("éditeur")?, Some(at(Duration::seconds(2))));
        assert_eq!(store.latest_occurrence_of("a_g")?, None);
        Ok(())
    }
}
