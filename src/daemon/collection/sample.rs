use std::sync::Arc;

use chrono::{DateTime, Utc};

/// The foreground window at one sampling tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSample {
    pub app: Arc<str>,
    pub title: Arc<str>,
    pub timestamp: DateTime<Utc>,
}
