//! Offline-first VIN lookup: fetches a vehicle dataset, falls back to the
//! last durable copy or a built-in sample, and answers last-8 / unit /
//! plate queries against an index that is swapped atomically on reload.

pub mod app;
pub mod config;
pub mod fetch;
pub mod freshness;
pub mod index;
pub mod normalize;
pub mod process;
pub mod recognize;
pub mod snapshot;
