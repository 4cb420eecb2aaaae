//! Core types and shared functionality for onionfetch.
//!
//! This crate provides:
//! - On-disk document cache with atomic writes and TTL-gated reads
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheLayout, CacheLookup, CacheMeta, CacheStore, Flat, HostScoped};
pub use config::{AppConfig, ConfigError, LayoutKind};
pub use error::Error;
