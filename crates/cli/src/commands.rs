//! Command implementations.
//!
//! Each command writes its normal output to the given writer so the binary
//! can hand it stdout and tests can hand it a buffer.

use std::fmt::Write as _;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use onionfetch_client::{DocumentFetcher, FetchOptions, Origin};
use onionfetch_core::cache::unix_now;
use onionfetch_core::{AppConfig, CacheLookup, CacheStore};

use crate::cli::{CacheCommand, FetchArgs};

/// Fetch one document and emit it to `out` or `args.out`.
pub async fn fetch(config: &AppConfig, args: FetchArgs, out: &mut impl Write) -> Result<()> {
    let url = args.url.context("a URL is required")?;
    let fetcher = DocumentFetcher::from_config(config)?;
    let options = FetchOptions {
        use_cache: !args.no_cache,
        ttl_secs: args.ttl,
        timeout: args.timeout.map(Duration::from_secs),
    };

    let doc = fetcher.fetch_document(&url, &options).await?;
    tracing::info!(url = %doc.url, from_cache = doc.origin == Origin::Cache, bytes = doc.content.len(), "fetched");

    if let Some(e) = &doc.cache_error {
        eprintln!("[warn] {e}");
    }

    match args.out {
        Some(path) => {
            std::fs::write(&path, &doc.content).with_context(|| format!("failed to write {}", path.display()))?;
            writeln!(out, "[ok] wrote {}", path.display())?;
        }
        None => writeln!(out, "{}", doc.content)?,
    }

    Ok(())
}

/// Run a `cache` subcommand.
pub fn cache(config: &AppConfig, command: CacheCommand, out: &mut impl Write) -> Result<()> {
    let store = config.cache_store();

    match command {
        CacheCommand::Show { url, ttl } => {
            let ttl = ttl.unwrap_or(config.cache_ttl_secs);
            write!(out, "{}", describe_entry(&store, &url, ttl)?)?;
        }
        CacheCommand::Remove { url } => {
            if store.remove(&url)? {
                writeln!(out, "[ok] removed {url}")?;
            } else {
                writeln!(out, "[ok] no cache entry for {url}")?;
            }
        }
        CacheCommand::Purge { host } => {
            let removed = match host.as_deref() {
                Some(host) => store.purge_host(host)?,
                None => store.purge_all()?,
            };
            writeln!(out, "[ok] removed {removed} entries from {}", store.root().display())?;
        }
    }

    Ok(())
}

/// Human-readable report of `url`'s cache entry.
fn describe_entry(store: &CacheStore, url: &str, ttl: u64) -> Result<String> {
    let paths = store.paths_for(url)?;
    let lookup = store.lookup(url, ttl);

    let mut report = String::new();
    writeln!(report, "url:      {url}")?;
    writeln!(report, "key:      {}", paths.key)?;
    writeln!(report, "content:  {}", paths.content.display())?;
    writeln!(report, "metadata: {}", paths.meta.display())?;
    writeln!(report, "state:    {} (ttl {ttl}s)", lookup.state())?;

    let meta = match &lookup {
        CacheLookup::Fresh { meta, .. } | CacheLookup::Stale { meta, .. } => Some(meta),
        CacheLookup::Corrupt { reason } => {
            writeln!(report, "reason:   {reason}")?;
            None
        }
        CacheLookup::Absent => None,
    };

    if let Some(meta) = meta {
        if let Some(at) = meta.cached_at_utc() {
            writeln!(report, "cached:   {}", at.to_rfc3339_opts(SecondsFormat::Secs, true))?;
        }
        writeln!(report, "age:      {:.1}s", meta.age_secs(unix_now()))?;
        writeln!(report, "length:   {} bytes", meta.length)?;
    }

    Ok(report)
}
