use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded activity sample. Everything except `tags` is fixed once the event is written.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub app: Arc<str>,
    pub title: Arc<str>,
    pub tags: Vec<String>,
}

/// An event that hasn't been assigned an id yet.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct NewEvent {
    pub timestamp: DateTime<Utc>,
    pub app: Arc<str>,
    pub title: Arc<str>,
}

/// How much a single application shows up in the event log.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct AppStatistic {
    pub app: Arc<str>,
    pub count: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}
