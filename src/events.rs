//! # Event Correlation
//! Read paths over `event-detect-<date>.json` scan reports: the latest scan,
//! its urgent subset, a day-window history, and a per-project view that
//! collapses the same event reported by several consecutive scans.

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use crate::reports::ReportSource;

pub const EVENT_PREFIX: &str = "event-detect";
pub const DEFAULT_HISTORY_DAYS: u32 = 7;
pub const DEFAULT_PROJECT_DAYS: u32 = 14;

/// Urgency tier of a detected event. Tiers this service does not know keep
/// their original label so the report round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Urgency {
    ThisWeek,
    ThisMonth,
    ThisQuarter,
    Other(String),
}

impl From<String> for Urgency {
    fn from(s: String) -> Self {
        match s.as_str() {
            "this-week" => Urgency::ThisWeek,
            "this-month" => Urgency::ThisMonth,
            "this-quarter" => Urgency::ThisQuarter,
            _ => Urgency::Other(s),
        }
    }
}

impl From<Urgency> for String {
    fn from(u: Urgency) -> Self {
        match u {
            Urgency::ThisWeek => "this-week".to_string(),
            Urgency::ThisMonth => "this-month".to_string(),
            Urgency::ThisQuarter => "this-quarter".to_string(),
            Urgency::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedEvent {
    pub category: String,
    pub entity_name: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_relevance: Vec<String>,
    pub urgency: Urgency,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggested_action: String,
}

impl DetectedEvent {
    /// Identity used for de-duplication across scans.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.category, &self.entity_name, &self.title)
    }

    pub fn is_relevant_to(&self, project_id: &str) -> bool {
        self.project_relevance.iter().any(|p| p == project_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanCoverage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub competitors_checked: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub markets_checked: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contacts_checked: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects_checked: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub task_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_scan: Option<String>,
    /// Events that fit the schema; malformed entries are dropped one by one.
    #[serde(default, deserialize_with = "lenient_events")]
    pub events: Vec<DetectedEvent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub events_new: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub events_carried_over: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scan_coverage: ScanCoverage,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn lenient_events<'de, D>(d: D) -> Result<Vec<DetectedEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Value::deserialize(d)? {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            warn!(found = %kind_of(&other), "event report `events` is not an array; ignoring it");
            return Ok(Vec::new());
        }
    };

    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<DetectedEvent>(item) {
            Ok(ev) => Some(ev),
            Err(e) => {
                warn!(index = i, error = %e, "skipping malformed detected event");
                None
            }
        })
        .collect())
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Clone)]
pub struct EventCorrelation {
    source: Arc<dyn ReportSource>,
}

impl EventCorrelation {
    pub fn new(source: Arc<dyn ReportSource>) -> Self {
        Self { source }
    }

    pub async fn latest(&self) -> Result<Option<EventReport>> {
        Ok(self.source.latest(EVENT_PREFIX).await?.and_then(decode))
    }

    /// Events of the latest scan due this week.
    pub async fn urgent(&self) -> Result<Vec<DetectedEvent>> {
        let Some(report) = self.latest().await? else {
            return Ok(Vec::new());
        };
        Ok(report
            .events
            .into_iter()
            .filter(|e| e.urgency == Urgency::ThisWeek)
            .collect())
    }

    pub async fn history(&self, days: u32) -> Result<Vec<EventReport>> {
        let docs = self.source.history(EVENT_PREFIX, days).await?;
        Ok(docs.into_iter().filter_map(decode).collect())
    }

    /// Events relevant to `project_id` over the window, newest occurrence of each kept.
    pub async fn by_project(&self, project_id: &str, days: u32) -> Result<Vec<DetectedEvent>> {
        let history = self.history(days).await?;
        Ok(dedup_for_project(history, project_id))
    }
}

/// Walks reports in the given (newest-first) order; the first occurrence of a
/// `(category, entity_name, title)` wins.
pub fn dedup_for_project(reports: Vec<EventReport>, project_id: &str) -> Vec<DetectedEvent> {
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut out = Vec::new();
    for report in reports {
        for event in report.events {
            if !event.is_relevant_to(project_id) {
                continue;
            }
            let (c, e, t) = event.key();
            if seen.insert((c.to_string(), e.to_string(), t.to_string())) {
                out.push(event);
            }
        }
    }
    out
}

fn decode(doc: Value) -> Option<EventReport> {
    match serde_json::from_value(doc) {
        Ok(r) => Some(r),
        Err(e) => {
            warn!(error = %e, "skipping event report with unexpected shape");
            None
        }
    }
}
