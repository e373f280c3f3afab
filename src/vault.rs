//! # Vault File Accessor
//!
//! Every read and write of the backend goes through a [`Vault`] rooted at the
//! configured directory.
//!
//! - Logical paths are resolved under the root; segments that would escape it
//!   (`..`, absolute paths) are rejected before any I/O happens.
//! - A missing file or directory is "no data" (`Ok(None)` / empty list).
//! - A file that is not valid JSON (or not valid UTF-8) is reported as absent
//!   and logged, so one corrupt file never aborts a scan.
//! - Anything else (permissions, disk errors) propagates as an error.
//! - Writes land in a temp sibling first and are renamed over the target, so
//!   concurrent readers see either the old or the new document.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::warn;

use crate::metrics::ensure_metrics_described;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
}

impl Vault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `segments` under the vault root. Pure path composition.
    ///
    /// A segment may contain separators (`"07_system/reports"`), but it may not
    /// climb out of the root.
    pub fn resolve<I, S>(&self, segments: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = self.root.clone();
        for seg in segments {
            let seg = seg.as_ref();
            for comp in Path::new(seg).components() {
                match comp {
                    Component::Normal(part) => out.push(part),
                    Component::CurDir => {}
                    Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                        bail!("path segment {seg:?} escapes the vault root");
                    }
                }
            }
        }
        Ok(out)
    }

    /// Create `path` and its parents. No-op when it already exists.
    pub async fn ensure_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .with_context(|| format!("creating directory {}", path.display()))
    }

    /// Names of the entries in `path`, sorted ascending. Missing directory → empty.
    pub async fn list_entries(&self, path: &Path) -> Result<Vec<String>> {
        let mut rd = match fs::read_dir(path).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("listing directory {}", path.display()))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = rd
            .next_entry()
            .await
            .with_context(|| format!("reading entry of {}", path.display()))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Filesystem metadata, or `None` when `path` does not exist.
    pub async fn metadata(&self, path: &Path) -> Result<Option<std::fs::Metadata>> {
        match fs::metadata(path).await {
            Ok(m) => Ok(Some(m)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("stat {}", path.display())),
        }
    }

    /// `true` only for an existing regular file.
    pub async fn is_file(&self, path: &Path) -> Result<bool> {
        Ok(self.metadata(path).await?.is_some_and(|m| m.is_file()))
    }

    /// Parse the JSON document at `path`.
    ///
    /// Returns `Ok(None)` when the file is missing, not UTF-8, not JSON, or does
    /// not match `T`.
    pub async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let bytes = match fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };

        match serde_json::from_slice::<T>(&bytes) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                ensure_metrics_described();
                counter!("vault_malformed_json_total").increment(1);
                warn!(path = %path.display(), error = %e, "skipping malformed JSON file");
                Ok(None)
            }
        }
    }

    /// Serialize `value` (pretty, two-space indent) and atomically replace `path`.
    pub async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let Some(parent) = path.parent() else {
            bail!("cannot write JSON to {}: no parent directory", path.display());
        };
        self.ensure_dir(parent).await?;

        let body = serde_json::to_vec_pretty(value)
            .with_context(|| format!("serializing JSON for {}", path.display()))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = parent.join(format!(".{file_name}.tmp.{}.{seq}", std::process::id()));

        fs::write(&tmp, &body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("replacing {}", path.display()));
        }
        Ok(())
    }
}

/// Filesystem modification time as ISO-8601 with millisecond precision (`...T10:00:00.000Z`).
pub fn mtime_iso(meta: &std::fs::Metadata) -> Option<String> {
    let modified = meta.modified().ok()?;
    let dt: DateTime<Utc> = modified.into();
    Some(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}
