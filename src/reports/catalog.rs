//! Catalog of every report under the reports directory.
//!
//! Top-level files get an inferred type; files one level down take the
//! subdirectory name as their type (`weekly/`, `portfolio/`, ...).

use anyhow::{bail, Result};
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::metrics::ensure_metrics_described;
use crate::reports::naming::{infer_type, stem, title_from_filename, JSON_EXT};
use crate::vault::{mtime_iso, Vault};

pub const WEEKLY_DIR: &str = "weekly";
pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const DEFAULT_WEEKLY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReportCatalog {
    vault: Vault,
    base: PathBuf,
}

impl ReportCatalog {
    pub fn new(vault: Vault, base: PathBuf) -> Self {
        Self { vault, base }
    }

    /// Summaries of all top-level and one-level-nested reports, newest `created_at` first.
    pub async fn list_all_reports(&self) -> Result<Vec<ReportSummary>> {
        let mut out = Vec::new();
        self.scan_directory(&self.base, None, &mut out).await?;

        for sub in self.subdirectories().await? {
            let dir = self.base.join(&sub);
            self.scan_directory(&dir, Some(&sub), &mut out).await?;
        }

        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(dir = %self.base.display(), found = out.len(), "report catalog scan");
        Ok(out)
    }

    pub async fn list_reports(&self, kind: Option<&str>, limit: usize) -> Result<Vec<ReportSummary>> {
        let all = self.list_all_reports().await?;
        Ok(filter_summaries(all, kind, limit))
    }

    /// Distinct report types, sorted.
    pub async fn report_types(&self) -> Result<Vec<String>> {
        let types: BTreeSet<String> = self
            .list_all_reports()
            .await?
            .into_iter()
            .map(|s| s.kind)
            .collect();
        Ok(types.into_iter().collect())
    }

    /// `<id>.json` at the top level first, then in each subdirectory.
    pub async fn get_report_by_id(&self, id: &str) -> Result<Option<Value>> {
        validate_id(id)?;
        let file = format!("{id}{JSON_EXT}");

        let mut candidates = vec![self.base.join(&file)];
        for sub in self.subdirectories().await? {
            candidates.push(self.base.join(&sub).join(&file));
        }
        for path in candidates {
            if !self.vault.is_file(&path).await? {
                continue;
            }
            if let Some(doc) = self.vault.read_json(&path).await? {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }

    pub async fn latest_weekly(&self) -> Result<Option<Value>> {
        Ok(self.weekly_reports(1).await?.into_iter().next())
    }

    /// Reports in `weekly/`, newest `created_at` first.
    pub async fn weekly_reports(&self, limit: usize) -> Result<Vec<Value>> {
        let dir = self.base.join(WEEKLY_DIR);
        let mut docs = Vec::new();
        for name in self.vault.list_entries(&dir).await? {
            let path = dir.join(&name);
            if !name.ends_with(JSON_EXT) || !self.vault.is_file(&path).await? {
                continue;
            }
            if let Some(doc) = self.vault.read_json::<Value>(&path).await? {
                docs.push(doc);
            }
        }
        docs.sort_by(|a, b| created_at_of(b).cmp(created_at_of(a)));
        docs.truncate(limit);
        Ok(docs)
    }

    async fn subdirectories(&self) -> Result<Vec<String>> {
        let mut dirs = Vec::new();
        for name in self.vault.list_entries(&self.base).await? {
            let is_dir = self
                .vault
                .metadata(&self.base.join(&name))
                .await?
                .is_some_and(|m| m.is_dir());
            if is_dir {
                dirs.push(name);
            }
        }
        Ok(dirs)
    }

    async fn scan_directory(
        &self,
        dir: &Path,
        sub_type: Option<&str>,
        out: &mut Vec<ReportSummary>,
    ) -> Result<()> {
        ensure_metrics_described();
        for name in self.vault.list_entries(dir).await? {
            if !name.ends_with(JSON_EXT) {
                continue;
            }
            let path = dir.join(&name);
            let Some(meta) = self.vault.metadata(&path).await? else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            counter!("report_files_scanned_total").increment(1);

            let Some(doc) = self.vault.read_json::<Value>(&path).await? else {
                continue;
            };

            let kind = match sub_type {
                Some(t) => t.to_string(),
                None => infer_type(&name),
            };
            out.push(ReportSummary {
                id: id_field(&doc).unwrap_or_else(|| stem(&name).to_string()),
                kind,
                title: str_field(&doc, "title")
                    .or_else(|| str_field(&doc, "report_title"))
                    .unwrap_or_else(|| title_from_filename(&name)),
                status: str_field(&doc, "status").unwrap_or_else(|| "completed".to_string()),
                created_at: str_field(&doc, "created_at")
                    .or_else(|| mtime_iso(&meta))
                    .unwrap_or_default(),
                project_id: str_field(&doc, "project_id"),
            });
        }
        Ok(())
    }
}

/// Keep summaries of `kind` (all when `None`), at most `limit`.
pub fn filter_summaries(
    summaries: Vec<ReportSummary>,
    kind: Option<&str>,
    limit: usize,
) -> Vec<ReportSummary> {
    summaries
        .into_iter()
        .filter(|s| kind.is_none_or(|k| s.kind == k))
        .take(limit)
        .collect()
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        bail!("invalid report id {id:?}");
    }
    Ok(())
}

fn str_field(doc: &Value, key: &str) -> Option<String> {
    doc.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn id_field(doc: &Value) -> Option<String> {
    match doc.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn created_at_of(doc: &Value) -> &str {
    doc.get("created_at").and_then(Value::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn summary(id: &str, kind: &str) -> ReportSummary {
        ReportSummary {
            id: id.into(),
            kind: kind.into(),
            title: id.into(),
            status: "completed".into(),
            created_at: "2026-02-17T00:00:00.000Z".into(),
            project_id: None,
        }
    }

    #[test]
    fn filter_by_type_then_limit() {
        let all = vec![
            summary("a", "weekly"),
            summary("b", "general"),
            summary("c", "weekly"),
            summary("d", "weekly"),
        ];
        let got = filter_summaries(all.clone(), Some("weekly"), 2);
        let ids: Vec<&str> = got.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(filter_summaries(all, None, 10).len(), 4);
    }

    #[test]
    fn ids_with_separators_are_rejected() {
        assert!(validate_id("../secrets").is_err());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id("").is_err());
        assert!(validate_id("wr-20260216-090068").is_ok());
    }

    #[tokio::test]
    async fn summary_fields_fall_back_to_filename() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("reports");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("portfolio-analysis-2026-02-17.json"), r#"{"score": 3}"#).unwrap();

        let cat = ReportCatalog::new(Vault::new(tmp.path()), base);
        let all = cat.list_all_reports().await.unwrap();
        assert_eq!(all.len(), 1);
        let s = &all[0];
        assert_eq!(s.id, "portfolio-analysis-2026-02-17");
        assert_eq!(s.kind, "portfolio-analysis");
        assert_eq!(s.title, "Portfolio Analysis 2026 02 17");
        assert_eq!(s.status, "completed");
        assert!(s.created_at.ends_with('Z'), "mtime fallback: {}", s.created_at);
        assert!(s.project_id.is_none());
    }
}
