//! Offline cache controller for offcache.
//!
//! This crate provides the request classifier, the network fetch client,
//! the caching strategies and the worker lifecycle shared by the server.

pub mod classify;
pub mod fetch;
pub mod request;
pub mod strategy;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{BypassReason, RequestClass, Scope, classify};
pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use request::{CacheMode, Destination, RequestDescriptor, RequestMode};
pub use strategy::{FetchOutcome, StrategyExecutor, offline_response};
pub use reqwest::Method;
pub use worker::{ControlMessage, MessageOutcome, PrecacheReport, Worker, WorkerConfig, WorkerState, WorkerStatus};
