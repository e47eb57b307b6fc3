//! Cache maintenance tools.
//!
//! These read and prune the SQLite-backed stores directly, outside the
//! fetch strategies.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
