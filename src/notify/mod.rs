pub mod antiflutter;
pub mod telegram;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use antiflutter::AntiFlutter;
pub use telegram::TelegramNotifier;

/// Severity of a budget alert; ordered so escalation can be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Spend reached the alert threshold percentage.
    Warning,
    /// Spend reached the budget.
    Exceeded,
}

/// Which budget window the alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetWindow {
    Daily,
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAlert {
    pub window: BudgetWindow,
    pub level: AlertLevel,
    pub spent: f64,
    pub budget: f64,
    pub pct: i64,
    pub ts: DateTime<Utc>,
}

impl BudgetAlert {
    pub fn message(&self) -> String {
        let window = match self.window {
            BudgetWindow::Daily => "Daily",
            BudgetWindow::Weekly => "Weekly",
        };
        let headline = match self.level {
            AlertLevel::Warning => "budget warning",
            AlertLevel::Exceeded => "budget exceeded",
        };
        format!(
            "{window} {headline}: ${:.2} / ${:.2} ({}%)\n@ {}",
            self.spent,
            self.budget,
            self.pct,
            self.ts.to_rfc3339()
        )
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, alert: &BudgetAlert) -> Result<()>;
}

/// Fans an alert out to every configured channel. Always logs.
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Telegram when `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID` are set; otherwise log only.
    pub fn from_env() -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        match TelegramNotifier::from_env() {
            Some(t) => channels.push(Box::new(t)),
            None => tracing::info!("Telegram disabled (no TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID)"),
        }
        Self { channels }
    }

    /// Returns how many channels accepted the alert.
    pub async fn notify(&self, alert: &BudgetAlert) -> usize {
        tracing::info!(
            window = ?alert.window,
            level = ?alert.level,
            spent = alert.spent,
            budget = alert.budget,
            pct = alert.pct,
            "budget alert"
        );
        let mut delivered = 0;
        for ch in &self.channels {
            match ch.send(alert).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!("notifier failed: {e:#}"),
            }
        }
        delivered
    }
}
