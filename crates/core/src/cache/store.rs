//! Document cache store.
//!
//! Each entry is a pair of files in the directory chosen by the store's
//! [`CacheLayout`]: `{key}.html` holds the document verbatim and
//! `{key}.meta.json` holds [`CacheMeta`]. Both are written through a temp
//! file in the same directory and renamed into place, content first, so a
//! reader never sees a half-written file and never sees metadata whose
//! content is not yet complete.

use std::collections::BTreeSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hash::compute_cache_key;
use super::layout::{CacheLayout, host_of};
use crate::Error;

const CONTENT_EXT: &str = ".html";
const META_EXT: &str = ".meta.json";
const TMP_EXT: &str = ".tmp";

/// Metadata stored next to each cached document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    /// The exact URL the entry was fetched from.
    pub url: String,
    /// Write time in seconds since the Unix epoch.
    pub cached_at: f64,
    /// Byte length of the stored content.
    pub length: u64,
}

impl CacheMeta {
    /// Age in seconds relative to `now` (seconds since epoch).
    pub fn age_secs(&self, now: f64) -> f64 {
        now - self.cached_at
    }

    /// Write time as a UTC timestamp, `None` if out of chrono's range.
    pub fn cached_at_utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.cached_at.floor();
        let nanos = ((self.cached_at - secs) * 1e9) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }
}

/// Outcome of a cache read.
///
/// Only [`CacheLookup::Fresh`] carries content; every other variant is a
/// miss for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Fresh { content: String, meta: CacheMeta },
    Stale { meta: CacheMeta, age_secs: f64 },
    Corrupt { reason: String },
    Absent,
}

impl CacheLookup {
    pub fn into_content(self) -> Option<String> {
        match self {
            CacheLookup::Fresh { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Fresh { .. })
    }

    /// Short label for logs and CLI output.
    pub fn state(&self) -> &'static str {
        match self {
            CacheLookup::Fresh { .. } => "fresh",
            CacheLookup::Stale { .. } => "stale",
            CacheLookup::Corrupt { .. } => "corrupt",
            CacheLookup::Absent => "absent",
        }
    }
}

/// Resolved file locations for one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPaths {
    pub key: String,
    pub dir: PathBuf,
    pub content: PathBuf,
    pub meta: PathBuf,
}

/// On-disk document cache handle.
///
/// Holds no open files; every operation opens and releases its own handles,
/// so clones can be used freely across threads and processes.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    layout: Arc<dyn CacheLayout>,
}

impl CacheStore {
    /// Create a store rooted at `root` using `layout` for entry directories.
    ///
    /// Nothing is created on disk until the first [`CacheStore::save`].
    pub fn new(root: impl Into<PathBuf>, layout: impl CacheLayout + 'static) -> Self {
        Self { root: root.into(), layout: Arc::new(layout) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File locations for `url`'s entry.
    pub fn paths_for(&self, url: &str) -> Result<EntryPaths, Error> {
        let key = compute_cache_key(url);
        let dir = self.layout.entry_dir(&self.root, url)?;
        let content = dir.join(format!("{key}{CONTENT_EXT}"));
        let meta = dir.join(format!("{key}{META_EXT}"));
        Ok(EntryPaths { key, dir, content, meta })
    }

    /// Return the cached document if present and no older than `max_age_secs`.
    ///
    /// Missing, stale and corrupt entries all come back as `None`.
    pub fn load(&self, url: &str, max_age_secs: u64) -> Option<String> {
        self.lookup(url, max_age_secs).into_content()
    }

    /// Inspectable form of [`CacheStore::load`].
    pub fn lookup(&self, url: &str, max_age_secs: u64) -> CacheLookup {
        self.lookup_at(url, max_age_secs, unix_now())
    }

    /// [`CacheStore::lookup`] against an explicit clock reading.
    ///
    /// An entry whose age equals `max_age_secs` is still fresh.
    pub fn lookup_at(&self, url: &str, max_age_secs: u64, now: f64) -> CacheLookup {
        let paths = match self.paths_for(url) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::debug!("no cache location for {}: {}", url, e);
                return CacheLookup::Absent;
            }
        };

        if !paths.content.is_file() || !paths.meta.is_file() {
            return CacheLookup::Absent;
        }

        let meta = match read_meta(&paths.meta) {
            Ok(meta) => meta,
            Err(reason) => return CacheLookup::Corrupt { reason },
        };

        if meta.url != url {
            return CacheLookup::Corrupt { reason: format!("metadata belongs to {}", meta.url) };
        }

        let age_secs = meta.age_secs(now);
        if age_secs > max_age_secs as f64 {
            return CacheLookup::Stale { meta, age_secs };
        }

        let content = match fs::read_to_string(&paths.content) {
            Ok(content) => content,
            Err(e) => return CacheLookup::Corrupt { reason: format!("unreadable content: {e}") },
        };

        if content.len() as u64 != meta.length {
            return CacheLookup::Corrupt {
                reason: format!("content is {} bytes, metadata says {}", content.len(), meta.length),
            };
        }

        CacheLookup::Fresh { content, meta }
    }

    /// Metadata for `url`'s entry, if both files exist and it parses.
    pub fn meta(&self, url: &str) -> Option<CacheMeta> {
        let paths = self.paths_for(url).ok()?;
        if !paths.content.is_file() {
            return None;
        }
        read_meta(&paths.meta).ok()
    }

    /// Store `content` for `url`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the layout cannot place the URL, and
    /// `Error::Io` for any filesystem failure. Nothing is swallowed.
    pub fn save(&self, url: &str, content: &str) -> Result<CacheMeta, Error> {
        let paths = self.paths_for(url)?;
        fs::create_dir_all(&paths.dir).map_err(|e| Error::io(&paths.dir, e))?;

        write_atomic(&paths.dir, &paths.content, &paths.key, content.as_bytes())?;

        let meta = CacheMeta { url: url.to_string(), cached_at: unix_now(), length: content.len() as u64 };
        let encoded = serde_json::to_vec(&meta)?;
        write_atomic(&paths.dir, &paths.meta, &paths.key, &encoded)?;

        tracing::debug!("cached {} -> {} ({} bytes)", url, paths.content.display(), meta.length);

        Ok(meta)
    }

    /// Delete `url`'s entry. Returns whether anything was on disk.
    pub fn remove(&self, url: &str) -> Result<bool, Error> {
        let paths = self.paths_for(url)?;
        let had_meta = remove_if_exists(&paths.meta)?;
        let had_content = remove_if_exists(&paths.content)?;
        Ok(had_meta || had_content)
    }

    /// Delete every entry whose recorded URL has host `host`.
    ///
    /// Works for any layout since it reads each entry's metadata. Entries
    /// with unreadable metadata are left alone. Returns the number removed.
    pub fn purge_host(&self, host: &str) -> Result<u64, Error> {
        let host = host.to_ascii_lowercase();
        let mut removed = 0;

        for path in self.entry_files()? {
            if entry_file_kind(&path) != Some(EntryFile::Meta) {
                continue;
            }
            let Ok(meta) = read_meta(&path) else {
                continue;
            };
            if host_of(&meta.url).as_deref() != Some(host.as_str()) {
                continue;
            }

            remove_if_exists(&path)?;
            remove_if_exists(&content_path_for(&path))?;
            removed += 1;
        }

        tracing::info!(host = %host, removed, "purged cache entries by host");
        Ok(removed)
    }

    /// Delete every entry, orphaned entry file and leftover temp file under the root.
    ///
    /// Only files named like cache entries are touched. A subdirectory is
    /// removed only if this pass deleted something from it and it is now
    /// empty. Returns the number of metadata files removed.
    pub fn purge_all(&self) -> Result<u64, Error> {
        let mut removed = 0;
        let mut emptied = BTreeSet::new();

        for path in self.entry_files()? {
            let Some(kind) = entry_file_kind(&path) else {
                continue;
            };
            if !remove_if_exists(&path)? {
                continue;
            }
            if kind == EntryFile::Meta {
                removed += 1;
            }
            if let Some(parent) = path.parent().filter(|p| *p != self.root) {
                emptied.insert(parent.to_path_buf());
            }
        }

        for dir in emptied {
            match fs::remove_dir(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::debug!("keeping {}: {}", dir.display(), e),
            }
        }

        tracing::info!(root = %self.root.display(), removed, "purged cache");
        Ok(removed)
    }

    /// Files directly under the root and one directory level below it.
    fn entry_files(&self) -> Result<Vec<PathBuf>, Error> {
        let mut files = Vec::new();

        let top = match fs::read_dir(&self.root) {
            Ok(top) => top,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(Error::io(&self.root, e)),
        };

        for entry in top {
            let entry = entry.map_err(|e| Error::io(&self.root, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;

            if file_type.is_file() {
                files.push(path);
            } else if file_type.is_dir() {
                for sub in fs::read_dir(&path).map_err(|e| Error::io(&path, e))? {
                    let sub = sub.map_err(|e| Error::io(&path, e))?;
                    if sub.file_type().is_ok_and(|t| t.is_file()) {
                        files.push(sub.path());
                    }
                }
            }
        }

        Ok(files)
    }
}

/// Current wall-clock time in seconds since the Unix epoch.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn read_meta(path: &Path) -> Result<CacheMeta, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("unreadable metadata: {e}"))?;
    serde_json::from_str(&raw).map_err(|e| format!("malformed metadata: {e}"))
}

/// Write `bytes` to a unique temp file in `dir`, sync it, then rename it over `target`.
fn write_atomic(dir: &Path, target: &Path, key: &str, bytes: &[u8]) -> Result<(), Error> {
    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{key}."))
        .suffix(TMP_EXT)
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;

    tmp.write_all(bytes).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;

    tmp.persist(target).map_err(|e| Error::io(target, e.error))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<bool, Error> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Kinds of file the store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryFile {
    Content,
    Meta,
    Temp,
}

/// Classify `path` by name. Anything not shaped like a store file is `None`.
fn entry_file_kind(path: &Path) -> Option<EntryFile> {
    let name = file_name(path);

    if let Some(key) = name.strip_suffix(META_EXT) {
        return is_cache_key(key).then_some(EntryFile::Meta);
    }
    if let Some(key) = name.strip_suffix(CONTENT_EXT) {
        return is_cache_key(key).then_some(EntryFile::Content);
    }

    // .{key}.{random}.tmp
    let rest = name.strip_prefix('.')?.strip_suffix(TMP_EXT)?;
    let (key, random) = rest.split_once('.')?;
    (is_cache_key(key) && !random.is_empty()).then_some(EntryFile::Temp)
}

fn is_cache_key(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn content_path_for(meta_path: &Path) -> PathBuf {
    let key = file_name(meta_path).trim_end_matches(META_EXT);
    meta_path.with_file_name(format!("{key}{CONTENT_EXT}"))
}
