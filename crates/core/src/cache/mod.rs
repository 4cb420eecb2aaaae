//! File-backed cache for fetched documents.
//!
//! This module provides a persistent, content-addressed cache on the local
//! filesystem. It supports:
//!
//! - SHA-256 keys over the exact URL string
//! - Pluggable directory layouts (per-host or flat)
//! - Atomic temp-file-and-rename writes
//! - TTL-gated reads where stale or corrupt entries read as misses
//! - Manual removal and purging (no automatic eviction)

pub mod hash;
pub mod layout;
pub mod store;

pub use crate::Error;

pub use hash::compute_cache_key;
pub use layout::{CacheLayout, Flat, HostScoped, sanitize_host};
pub use store::{CacheLookup, CacheMeta, CacheStore, EntryPaths, unix_now};
