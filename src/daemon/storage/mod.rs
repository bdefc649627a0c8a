//!  Storage is organized through [event_store::EventStore].
//!  The basic idea is:
//!   - There is a single SQLite database per application directory.
//!   - Every sampled window switch becomes one row of the `events` table.
//!   - An FTS5 table over app and title is written in the same transaction as the row.
//!   - Small pieces of user configuration live as JSON in the `config` table.

pub mod entities;
pub mod event_store;
pub mod schema;
pub mod settings;
