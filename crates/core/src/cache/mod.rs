//! SQLite-backed versioned cache store.
//!
//! This module provides named cache stores (one per cache version) holding
//! request→response entries, with async access via tokio-rusqlite. It supports:
//!
//! - Request keys hashed with SHA-256 over method and URL
//! - `Vary`-aware matching against the stored request headers
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - En-masse invalidation by deleting a whole named store

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheEntryMeta, StoredResponse};
