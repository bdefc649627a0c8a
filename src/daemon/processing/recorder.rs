use anyhow::Result;
use tracing::{debug, trace, warn};

use crate::daemon::{
    collection::sample::WindowSample,
    storage::{
        entities::{Event, NewEvent},
        event_store::EventStore,
    },
};

use super::{
    blacklist::is_allowed,
    dedup::DedupGuard,
    module::EventProcessor,
};

#[derive(Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded(Event),
    Blacklisted,
    Repeated,
}

/// Bridges [ProcessingModule](super::ProcessingModule) and [EventStore]. Owns the dedup state
/// for the lifetime of the daemon.
pub struct EventRecorder {
    store: EventStore,
    guard: DedupGuard,
    keywords: Vec<String>,
}

impl EventRecorder {
    pub fn new(store: EventStore) -> Self {
        Self {
            store,
            guard: DedupGuard::new(),
            keywords: vec![],
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Picks up blacklist edits made by other processes. On failure the previous keywords
    /// stay in effect.
    fn refresh_keywords(&mut self) {
        match self.store.blacklist() {
            Ok(keywords) => self.keywords = keywords,
            Err(e) => warn!("Failed to reload blacklist, keeping previous keywords: {e:?}"),
        }
    }

    pub fn record(&mut self, sample: WindowSample) -> Result<RecordOutcome> {
        self.refresh_keywords();

        if !is_allowed(&sample.app, &sample.title, &self.keywords) {
            // The guard sees blacklisted windows too, so removing a keyword while that window
            // stays focused doesn't produce an event for it.
            self.guard.remember(&sample.app, &sample.title);
            trace!("Window is blacklisted");
            return Ok(RecordOutcome::Blacklisted);
        }
        if self.guard.is_repeat(&sample.app, &sample.title) {
            trace!("Window didn't change");
            return Ok(RecordOutcome::Repeated);
        }

        // A failed write leaves the guard alone so the next sample of this window retries.
        let event = self.store.record_event(NewEvent {
            timestamp: sample.timestamp,
            app: sample.app,
            title: sample.title,
        })?;
        self.guard.remember(&event.app, &event.title);
        debug!(id = event.id, app = %event.app, "Recorded event");
        Ok(RecordOutcome::Recorded(event))
    }
}

impl EventProcessor for EventRecorder {
    async fn process_next(&mut self, sample: WindowSample) -> Result<()> {
        self.record(sample)?;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Duration;

    use super::{EventRecorder, RecordOutcome};
    use crate::daemon::{
        collection::sample::WindowSample,
        storage::event_store::{EventStore, tests::at},
    };

    fn sample(app: &str, title: &str, seconds: i64) -> WindowSample {
        WindowSample {
            app: app.into(),
            title: title.into(),
            timestamp: at(Duration::seconds(seconds)),
        }
    }

    #[test]
    fn test_consecutive_identical_samples_write_once() -> Result<()> {
        let mut recorder = EventRecorder::new(EventStore::open_in_memory()?);

        for i in 0..10 {
            recorder.record(sample("code", "main.rs", i * 2))?;
        }

        assert_eq!(recorder.store().count_events()?, 1);
        Ok(())
    }

    #[test]
    fn test_switching_back_writes_again() -> Result<()> {
        let mut recorder = EventRecorder::new(EventStore::open_in_memory()?);

        recorder.record(sample("code", "main.rs", 0))?;
        recorder.record(sample("slack", "general", 2))?;
        let outcome = recorder.record(sample("code", "main.rs", 4))?;

        assert!(matches!(outcome, RecordOutcome::Recorded(ref e) if &*e.app == "code"));
        assert_eq!(recorder.store().count_events()?, 3);
        Ok(())
    }

    #[test]
    fn test_blacklisted_window_is_not_written() -> Result<()> {
        let mut store = EventStore::open_in_memory()?;
        store.set_blacklist(["bank"])?;
        let mut recorder = EventRecorder::new(store);

        assert_eq!(
            recorder.record(sample("firefox", "My Bank", 0))?,
            RecordOutcome::Blacklisted
        );
        assert_eq!(recorder.store().count_events()?, 0);
        Ok(())
    }

    #[test]
    fn test_unblacklisting_still_deduplicates() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("memtrail.db");
        let mut settings = EventStore::open(&path)?;
        settings.set_blacklist(["bank"])?;
        let mut recorder = EventRecorder::new(EventStore::open(&path)?);

        recorder.record(sample("firefox", "My Bank", 0))?;
        settings.set_blacklist(Vec::<String>::new())?;

        assert_eq!(
            recorder.record(sample("firefox", "My Bank", 2))?,
            RecordOutcome::Repeated
        );
        assert!(matches!(
            recorder.record(sample("code", "main.rs", 4))?,
            RecordOutcome::Recorded(_)
        ));
        assert_eq!(recorder.store().count_events()?, 1);
        Ok(())
    }

    #[test]
    fn test_window_is_recorded_after_failed_write() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("memtrail.db");
        let mut recorder = EventRecorder::new(EventStore::open(&path)?);
        let blocker = rusqlite::Connection::open(&path)?;

        // Holds the write lock past the busy timeout.
        blocker.execute_batch("BEGIN IMMEDIATE")?;
        assert!(recorder.record(sample("code", "main.rs", 0)).is_err());
        blocker.execute_batch("COMMIT")?;

        assert!(matches!(
            recorder.record(sample("code", "main.rs", 2))?,
            RecordOutcome::Recorded(ref e) if &*e.app == "code"
        ));
        assert_eq!(
            recorder.record(sample("code", "main.rs", 4))?,
            RecordOutcome::Repeated
        );
        assert_eq!(recorder.store().count_events()?, 1);
        Ok(())
    }
}
