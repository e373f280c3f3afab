// src/notify/antiflutter.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;

use super::{AlertLevel, BudgetWindow};

/// Cooldown gate to prevent alert spam, tracked per budget window.
/// - First alert for a window always allowed.
/// - Inside cooldown, alerts of the same or lower level are suppressed;
///   escalation (warning → exceeded) passes.
/// - State is updated explicitly via `record_alert` after a send.
#[derive(Debug, Clone)]
pub struct AntiFlutter {
    cooldown: ChronoDuration,
    last: HashMap<BudgetWindow, (DateTime<Utc>, AlertLevel)>,
}

impl AntiFlutter {
    /// `cooldown_secs` < 0 is treated as 0 (no cooldown).
    pub fn new(cooldown_secs: i64) -> Self {
        Self {
            cooldown: ChronoDuration::seconds(cooldown_secs.max(0)),
            last: HashMap::new(),
        }
    }

    /// Check if we may alert at `now`. Does NOT mutate state.
    pub fn should_alert(&self, window: BudgetWindow, level: AlertLevel, now: DateTime<Utc>) -> bool {
        match self.last.get(&window) {
            None => true,
            Some(&(ts, last_level)) => {
                now.signed_duration_since(ts) >= self.cooldown || level > last_level
            }
        }
    }

    pub fn record_alert(&mut self, window: BudgetWindow, level: AlertLevel, now: DateTime<Utc>) {
        self.last.insert(window, (now, level));
    }

    /// Forget a window once its spend drops back under the threshold (new day/week).
    pub fn clear(&mut self, window: BudgetWindow) {
        self.last.remove(&window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const D: BudgetWindow = BudgetWindow::Daily;

    #[test]
    fn first_alert_passes() {
        let af = AntiFlutter::new(10_800);
        let now = Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap();
        assert!(af.should_alert(D, AlertLevel::Warning, now));
    }

    #[test]
    fn inside_cooldown_same_level_blocked_escalation_passes() {
        let mut af = AntiFlutter::new(10_800);
        let t0 = Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap();
        af.record_alert(D, AlertLevel::Warning, t0);
        let t1 = t0 + ChronoDuration::seconds(120);
        assert!(!af.should_alert(D, AlertLevel::Warning, t1));
        assert!(af.should_alert(D, AlertLevel::Exceeded, t1));
        // other window is independent
        assert!(af.should_alert(BudgetWindow::Weekly, AlertLevel::Warning, t1));

        af.record_alert(D, AlertLevel::Exceeded, t1);
        assert!(!af.should_alert(D, AlertLevel::Warning, t1 + ChronoDuration::seconds(5)));
    }

    #[test]
    fn after_cooldown_or_clear_passes() {
        let mut af = AntiFlutter::new(10_800);
        let t0 = Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap();
        af.record_alert(D, AlertLevel::Exceeded, t0);
        let t_after = t0 + ChronoDuration::seconds(10_800 + 5);
        assert!(af.should_alert(D, AlertLevel::Warning, t_after));

        af.record_alert(D, AlertLevel::Exceeded, t_after);
        af.clear(D);
        assert!(af.should_alert(D, AlertLevel::Warning, t_after));
    }
}
