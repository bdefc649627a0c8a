//! Records which window is in focus throughout the day and makes that history searchable.
//! A small daemon samples the active window into a local SQLite database, and the cli
//! searches it with free text, dates, relative periods, or "what happened after I left
//! this app".
//!

pub mod cli;
pub mod daemon;
pub mod search;
pub mod utils;
pub mod window_api;
