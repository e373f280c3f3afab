//! Budget watcher: polls the aggregator and pushes alerts when daily or weekly
//! spend crosses the alert threshold or the budget itself.

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::time;

use crate::budget::{BudgetAggregator, BudgetStatus, SpendWindow};
use crate::metrics::ensure_metrics_described;
use crate::notify::{AlertLevel, AntiFlutter, BudgetAlert, BudgetWindow, NotifierMux};

fn level_for(w: &SpendWindow) -> Option<AlertLevel> {
    if w.exceeded {
        Some(AlertLevel::Exceeded)
    } else if w.alert {
        Some(AlertLevel::Warning)
    } else {
        None
    }
}

/// Alert candidates for the current status, daily first.
pub fn evaluate_alerts(status: &BudgetStatus, now: DateTime<Utc>) -> Vec<(BudgetWindow, Option<BudgetAlert>)> {
    [
        (BudgetWindow::Daily, &status.today),
        (BudgetWindow::Weekly, &status.week),
    ]
    .into_iter()
    .map(|(window, w)| {
        let alert = level_for(w).map(|level| BudgetAlert {
            window,
            level,
            spent: w.spent,
            budget: w.budget,
            pct: w.pct,
            ts: now,
        });
        (window, alert)
    })
    .collect()
}

/// One watcher pass. Returns the number of alerts pushed.
pub async fn tick(
    agg: &BudgetAggregator,
    mux: &NotifierMux,
    af: &mut AntiFlutter,
    now: DateTime<Utc>,
) -> Result<usize> {
    let status = agg.get_status().await?;
    let mut pushed = 0;

    for (window, alert) in evaluate_alerts(&status, now) {
        let Some(alert) = alert else {
            af.clear(window);
            continue;
        };
        if !af.should_alert(window, alert.level, now) {
            tracing::debug!("suppressed by antiflutter: {:?} {:?}", window, alert.level);
            continue;
        }
        let delivered = mux.notify(&alert).await;
        ensure_metrics_described();
        counter!("budget_alerts_sent_total").increment(delivered as u64);
        af.record_alert(window, alert.level, now);
        pushed += 1;
    }
    Ok(pushed)
}

pub async fn run_budget_watch(
    agg: BudgetAggregator,
    mux: NotifierMux,
    interval_secs: u64,
    cooldown_secs: i64,
) -> Result<()> {
    let mut ticker = time::interval(time::Duration::from_secs(interval_secs.max(1)));
    let mut af = AntiFlutter::new(cooldown_secs);

    loop {
        ticker.tick().await;
        match tick(&agg, &mux, &mut af, Utc::now()).await {
            Ok(0) => tracing::trace!("budget within limits"),
            Ok(n) => tracing::debug!(alerts = n, "budget watch tick"),
            Err(e) => tracing::warn!("budget watch tick failed: {e:#}"),
        }
    }
}
