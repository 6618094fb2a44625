//! passage-store - SQLite metadata store
//!
//! This crate provides the durable record of ingested passages. The store
//! is the source of truth for passage content and session scoping; the
//! vector and lexical indices are derived caches keyed by the same ids.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

// Re-export schema for testing/migrations
pub use schema::SCHEMA;
