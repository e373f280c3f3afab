//! # Budget Aggregator
//!
//! Reads the persisted spend budget (`cost-budget.json`) and sums the per-day
//! spend logs written by the external cost tracker.
//!
//! - Missing budget file → the default supplied at construction.
//! - Updates are a shallow merge over the current config; unknown keys in the
//!   persisted file survive. The read-merge-write is unguarded: concurrent
//!   updates race and the last writer wins.
//! - Percentages are derived on read and are `0` whenever the budget is `0`.

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::clock::{iso_date, Clock};
use crate::metrics::ensure_metrics_described;
use crate::vault::Vault;

pub const BUDGET_PATH: &str = "07_system/agent/cost-budget.json";
pub const SPEND_LOG_DIR: &str = "07_system/agent/cost-logs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub daily_budget_usd: f64,
    pub weekly_budget_usd: f64,
    pub alert_threshold_pct: f64,
    pub hard_stop: bool,
    /// Keys this service does not know about, preserved across updates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BudgetConfig {
    pub fn new(daily: f64, weekly: f64, alert_threshold_pct: f64, hard_stop: bool) -> Self {
        Self {
            daily_budget_usd: daily,
            weekly_budget_usd: weekly,
            alert_threshold_pct,
            hard_stop,
            extra: Map::new(),
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self::new(20.0, 100.0, 80.0, true)
    }
}

/// Partial update; only `Some` fields overwrite.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BudgetUpdate {
    pub daily_budget_usd: Option<f64>,
    pub weekly_budget_usd: Option<f64>,
    pub alert_threshold_pct: Option<f64>,
    pub hard_stop: Option<bool>,
}

impl BudgetUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(&self, cfg: &mut BudgetConfig) {
        if let Some(v) = self.daily_budget_usd {
            cfg.daily_budget_usd = v;
        }
        if let Some(v) = self.weekly_budget_usd {
            cfg.weekly_budget_usd = v;
        }
        if let Some(v) = self.alert_threshold_pct {
            cfg.alert_threshold_pct = v;
        }
        if let Some(v) = self.hard_stop {
            cfg.hard_stop = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendWindow {
    pub spent: f64,
    pub budget: f64,
    pub pct: i64,
    /// `pct` reached the alert threshold.
    pub alert: bool,
    /// Spend reached the budget.
    pub exceeded: bool,
}

impl SpendWindow {
    fn new(spent: f64, budget: f64, alert_threshold_pct: f64) -> Self {
        let pct = percent_of(spent, budget);
        Self {
            spent: round2(spent),
            budget,
            pct,
            alert: budget > 0.0 && pct as f64 >= alert_threshold_pct,
            exceeded: budget > 0.0 && spent >= budget,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub config: BudgetConfig,
    pub today: SpendWindow,
    pub week: SpendWindow,
    pub alert_threshold_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetGate {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BudgetAggregator {
    vault: Vault,
    defaults: BudgetConfig,
    week_start: Weekday,
    clock: Clock,
}

impl BudgetAggregator {
    pub fn new(vault: Vault, defaults: BudgetConfig, week_start: Weekday, clock: Clock) -> Self {
        Self {
            vault,
            defaults,
            week_start,
            clock,
        }
    }

    /// Persisted config; fields that are missing or mistyped come from the default.
    pub async fn get_config(&self) -> Result<BudgetConfig> {
        let path = self.vault.resolve([BUDGET_PATH])?;
        match self.vault.read_json::<Map<String, Value>>(&path).await? {
            Some(stored) => Ok(complete_config(&self.defaults, stored)),
            None => Ok(self.defaults.clone()),
        }
    }

    pub async fn update_config(&self, update: &BudgetUpdate) -> Result<BudgetConfig> {
        let mut cfg = self.get_config().await?;
        update.apply(&mut cfg);

        let path = self.vault.resolve([BUDGET_PATH])?;
        self.vault
            .write_json(&path, &cfg)
            .await
            .context("persisting budget config")?;

        ensure_metrics_described();
        counter!("budget_config_updates_total").increment(1);
        info!(
            daily = cfg.daily_budget_usd,
            weekly = cfg.weekly_budget_usd,
            alert_pct = cfg.alert_threshold_pct,
            hard_stop = cfg.hard_stop,
            "budget config updated"
        );
        Ok(cfg)
    }

    /// Sum of `cost_usd` in the spend log of `date`; `0` when there is no log.
    pub async fn spend_on_date(&self, date: NaiveDate) -> Result<f64> {
        let file = format!("{}.json", iso_date(date));
        let path = self.vault.resolve([SPEND_LOG_DIR, file.as_str()])?;
        // Entries are read loosely: one odd line must not zero the whole day.
        let entries = self.vault.read_json::<Vec<Value>>(&path).await?;
        Ok(entries
            .unwrap_or_default()
            .iter()
            .map(|e| e.get("cost_usd").and_then(Value::as_f64).unwrap_or(0.0))
            .sum())
    }

    pub async fn spend_today(&self) -> Result<f64> {
        self.spend_on_date(self.clock.today()).await
    }

    /// Spend from the start of the current week through today, inclusive.
    pub async fn spend_this_week(&self) -> Result<f64> {
        let today = self.clock.today();
        let mut total = 0.0;
        for i in 0..=days_since_week_start(today, self.week_start) {
            total += self.spend_on_date(today - Duration::days(i64::from(i))).await?;
        }
        Ok(total)
    }

    pub async fn get_status(&self) -> Result<BudgetStatus> {
        let config = self.get_config().await?;
        let today = self.spend_today().await?;
        let week = self.spend_this_week().await?;
        let threshold = config.alert_threshold_pct;

        Ok(BudgetStatus {
            today: SpendWindow::new(today, config.daily_budget_usd, threshold),
            week: SpendWindow::new(week, config.weekly_budget_usd, threshold),
            alert_threshold_pct: threshold,
            config,
        })
    }

    /// Whether new paid work may start today.
    pub async fn gate(&self) -> Result<BudgetGate> {
        let config = self.get_config().await?;
        let spent = self.spend_today().await?;
        Ok(gate_decision(&config, spent))
    }
}

/// Overlay a stored budget document on `defaults`, field by field.
///
/// Known fields of the wrong type keep the default value; unknown keys are
/// carried in `extra` so they survive the next write.
pub fn complete_config(defaults: &BudgetConfig, stored: Map<String, Value>) -> BudgetConfig {
    let mut cfg = defaults.clone();
    for (key, value) in stored {
        let slot = match key.as_str() {
            "daily_budget_usd" => &mut cfg.daily_budget_usd,
            "weekly_budget_usd" => &mut cfg.weekly_budget_usd,
            "alert_threshold_pct" => &mut cfg.alert_threshold_pct,
            "hard_stop" => {
                match value.as_bool() {
                    Some(b) => cfg.hard_stop = b,
                    None => warn!(field = %key, %value, "budget field is not a boolean; using default"),
                }
                continue;
            }
            _ => {
                cfg.extra.insert(key, value);
                continue;
            }
        };
        match value.as_f64() {
            Some(n) => *slot = n,
            None => warn!(field = %key, %value, "budget field is not a number; using default"),
        }
    }
    cfg
}

pub fn gate_decision(config: &BudgetConfig, spent_today: f64) -> BudgetGate {
    let limit = config.daily_budget_usd;
    if config.hard_stop && limit > 0.0 && spent_today >= limit {
        return BudgetGate {
            allowed: false,
            reason: Some(format!(
                "Daily budget exceeded: ${spent_today:.2} / ${limit:.2}"
            )),
        };
    }
    BudgetGate {
        allowed: true,
        reason: None,
    }
}

/// 0 when `today` is the week start, up to 6 on its last day.
pub fn days_since_week_start(today: NaiveDate, week_start: Weekday) -> u32 {
    let t = today.weekday().num_days_from_monday();
    let s = week_start.num_days_from_monday();
    (t + 7 - s) % 7
}

/// `round(spent / budget * 100)`, or `0` for a zero budget.
pub fn percent_of(spent: f64, budget: f64) -> i64 {
    if budget > 0.0 {
        (spent / budget * 100.0).round() as i64
    } else {
        0
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
