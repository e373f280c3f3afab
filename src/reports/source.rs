//! Prefix/date lookups over a directory of dated report files.
//!
//! Callers depend on [`ReportSource`], not on the filename convention, so the
//! directory scan can later be replaced by a real index keyed by date.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use metrics::counter;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use crate::clock::{iso_date, Clock};
use crate::metrics::ensure_metrics_described;
use crate::reports::naming::{embedded_date, matches_prefix, JSON_EXT};
use crate::vault::Vault;

#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    /// Newest report whose name starts with `<prefix>-`.
    async fn latest(&self, prefix: &str) -> Result<Option<Value>>;

    /// Newest report of `date` (last run of the day when several exist).
    async fn latest_for_date(&self, prefix: &str, date: NaiveDate) -> Result<Option<Value>>;

    /// Reports dated within the last `days` days (today − days inclusive), newest first.
    async fn history(&self, prefix: &str, days: u32) -> Result<Vec<Value>>;
}

/// [`ReportSource`] backed by `<prefix>-<YYYY-MM-DD>[-<suffix>].json` files in one directory.
#[derive(Debug, Clone)]
pub struct FileReportSource {
    vault: Vault,
    dir: PathBuf,
    clock: Clock,
}

impl FileReportSource {
    pub fn new(vault: Vault, dir: PathBuf, clock: Clock) -> Self {
        Self { vault, dir, clock }
    }

    /// Matching names, newest first (ISO dates sort as strings).
    async fn matching_desc(&self, starts_with: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .vault
            .list_entries(&self.dir)
            .await?
            .into_iter()
            .filter(|n| n.starts_with(starts_with) && n.ends_with(JSON_EXT))
            .collect();
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// First name that is a regular file; a directory with a report-like name is not a report.
    async fn read_first(&self, names: &[String]) -> Result<Option<Value>> {
        for name in names {
            let path = self.dir.join(name);
            if self.vault.is_file(&path).await? {
                return self.vault.read_json(&path).await;
            }
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
impl ReportSource for FileReportSource {
    async fn latest(&self, prefix: &str) -> Result<Option<Value>> {
        let names = self.matching_desc(&format!("{prefix}-")).await?;
        self.read_first(&names).await
    }

    async fn latest_for_date(&self, prefix: &str, date: NaiveDate) -> Result<Option<Value>> {
        let names = self
            .matching_desc(&format!("{prefix}-{}", iso_date(date)))
            .await?;
        self.read_first(&names).await
    }

    async fn history(&self, prefix: &str, days: u32) -> Result<Vec<Value>> {
        let cutoff = self
            .clock
            .today()
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        let mut names = self.vault.list_entries(&self.dir).await?;
        names.sort_unstable_by(|a, b| b.cmp(a));

        // Full scan: a name whose date does not parse must not end the walk early.
        let mut out = Vec::new();
        for name in names.iter().filter(|n| matches_prefix(n, prefix)) {
            let Some(date) = embedded_date(name, prefix) else {
                continue;
            };
            if date < cutoff {
                continue;
            }
            let path = self.dir.join(name);
            if !self.vault.is_file(&path).await? {
                continue;
            }
            ensure_metrics_described();
            counter!("report_files_scanned_total").increment(1);
            if let Some(doc) = self.vault.read_json(&path).await? {
                out.push(doc);
            }
        }

        debug!(
            dir = %self.dir.display(),
            prefix,
            days,
            found = out.len(),
            "report history scan"
        );
        Ok(out)
    }
}
