//! Morning briefings (`morning-briefing-<date>[-<run>].json`).

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::clock::Clock;
use crate::reports::ReportSource;

pub const BRIEFING_PREFIX: &str = "morning-briefing";
pub const DEFAULT_HISTORY_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingSection {
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BriefingSections {
    #[serde(default)]
    pub what_changed: Vec<BriefingSection>,
    #[serde(default)]
    pub focus_today: Vec<BriefingSection>,
    #[serde(default)]
    pub decisions_needed: Vec<BriefingSection>,
    #[serde(default)]
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingReport {
    pub task_type: String,
    pub status: String,
    pub generated_at: String,
    #[serde(default)]
    pub sections: BriefingSections,
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub sources_consulted: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone)]
pub struct BriefingService {
    source: Arc<dyn ReportSource>,
    clock: Clock,
}

impl BriefingService {
    pub fn new(source: Arc<dyn ReportSource>, clock: Clock) -> Self {
        Self { source, clock }
    }

    pub async fn today(&self) -> Result<Option<BriefingReport>> {
        self.for_date(self.clock.today()).await
    }

    pub async fn for_date(&self, date: NaiveDate) -> Result<Option<BriefingReport>> {
        let doc = self.source.latest_for_date(BRIEFING_PREFIX, date).await?;
        Ok(doc.and_then(decode))
    }

    pub async fn history(&self, days: u32) -> Result<Vec<BriefingReport>> {
        let docs = self.source.history(BRIEFING_PREFIX, days).await?;
        Ok(docs.into_iter().filter_map(decode).collect())
    }

    /// TTS-ready text of today's briefing; `None` if there is none or it is empty.
    pub async fn narrative(&self) -> Result<Option<String>> {
        Ok(self
            .today()
            .await?
            .map(|b| b.narrative)
            .filter(|n| !n.is_empty()))
    }
}

fn decode(doc: Value) -> Option<BriefingReport> {
    match serde_json::from_value(doc) {
        Ok(b) => Some(b),
        Err(e) => {
            tracing::warn!(error = %e, "skipping briefing with unexpected shape");
            None
        }
    }
}
