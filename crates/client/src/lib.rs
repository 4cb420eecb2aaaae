//! Client code for onionfetch.
//!
//! This crate provides the proxied HTTP fetch pipeline and the cache-aware
//! document fetcher used by the CLI.

pub mod document;
pub mod fetch;

#[cfg(test)]
mod testing;

pub use document::{Document, DocumentFetcher, FetchOptions, Origin};
pub use fetch::{FetchClient, FetchConfig, FetchResponse};
