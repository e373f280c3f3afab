// tests/budget_status.rs
//
// Budget aggregation over a temp vault:
// - default config when nothing is persisted
// - per-day spend sums and the week window
// - partial updates keep untouched and unknown keys, even over mistyped files

use chrono::{NaiveDate, Weekday};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use focus_vault::budget::{BudgetAggregator, BudgetConfig, BudgetUpdate, BUDGET_PATH};
use focus_vault::{Clock, Vault};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn aggregator(root: &Path, today: NaiveDate) -> BudgetAggregator {
    BudgetAggregator::new(
        Vault::new(root),
        BudgetConfig::default(),
        Weekday::Sun,
        Clock::Fixed(today),
    )
}

fn write_log(root: &Path, date: &str, body: Value) {
    let dir = root.join("07_system/agent/cost-logs");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{date}.json")), body.to_string()).unwrap();
}

#[tokio::test]
async fn empty_vault_reports_zero_spend_against_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let agg = aggregator(tmp.path(), d(2026, 2, 20));

    let s = agg.get_status().await.unwrap();
    assert_eq!(s.config.daily_budget_usd, 20.0);
    assert_eq!(s.config.weekly_budget_usd, 100.0);
    assert_eq!(s.alert_threshold_pct, 80.0);
    assert!(s.config.hard_stop);
    assert_eq!(s.today.spent, 0.0);
    assert_eq!(s.today.pct, 0);
    assert_eq!(s.week.spent, 0.0);
    assert_eq!(s.week.pct, 0);
}

#[tokio::test]
async fn spend_on_date_sums_entries_and_tolerates_missing_cost() {
    let tmp = tempfile::tempdir().unwrap();
    write_log(
        tmp.path(),
        "2026-02-17",
        json!([
            {"date": "2026-02-17", "cost_usd": 5, "model": "opus"},
            {"date": "2026-02-17", "cost_usd": 3.5, "caller": "briefing"},
            {"date": "2026-02-17", "model": "haiku"}
        ]),
    );
    let agg = aggregator(tmp.path(), d(2026, 2, 20));

    assert_eq!(agg.spend_on_date(d(2026, 2, 17)).await.unwrap(), 8.5);
    assert_eq!(agg.spend_on_date(d(2026, 2, 18)).await.unwrap(), 0.0);
}

#[tokio::test]
async fn corrupt_spend_log_counts_as_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("07_system/agent/cost-logs");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("2026-02-20.json"), "[{\"cost_usd\": 1,").unwrap();

    let agg = aggregator(tmp.path(), d(2026, 2, 20));
    assert_eq!(agg.spend_today().await.unwrap(), 0.0);
}

#[tokio::test]
async fn week_sums_from_sunday_through_today() {
    let tmp = tempfile::tempdir().unwrap();
    // 2026-02-20 is a Friday; the week started Sunday 2026-02-15.
    write_log(tmp.path(), "2026-02-14", json!([{"cost_usd": 100}])); // previous Saturday
    write_log(tmp.path(), "2026-02-15", json!([{"cost_usd": 10}]));
    write_log(tmp.path(), "2026-02-18", json!([{"cost_usd": 2.25}]));
    write_log(tmp.path(), "2026-02-20", json!([{"cost_usd": 12.5}]));
    write_log(tmp.path(), "2026-02-21", json!([{"cost_usd": 50}])); // tomorrow

    let agg = aggregator(tmp.path(), d(2026, 2, 20));
    let week = agg.spend_this_week().await.unwrap();
    assert_eq!(week, 24.75);

    let s = agg.get_status().await.unwrap();
    assert_eq!(s.today.spent, 12.5);
    assert_eq!(s.today.pct, 63);
    assert_eq!(s.week.spent, 24.75);
    assert_eq!(s.week.pct, 25);
    assert!(!s.today.alert);
}

#[tokio::test]
async fn week_on_week_start_day_is_just_today() {
    let tmp = tempfile::tempdir().unwrap();
    write_log(tmp.path(), "2026-02-14", json!([{"cost_usd": 7}]));
    write_log(tmp.path(), "2026-02-15", json!([{"cost_usd": 3}]));

    let agg = aggregator(tmp.path(), d(2026, 2, 15)); // Sunday
    assert_eq!(agg.spend_this_week().await.unwrap(), 3.0);
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let tmp = tempfile::tempdir().unwrap();
    let agg = aggregator(tmp.path(), d(2026, 2, 20));

    agg.update_config(&BudgetUpdate {
        daily_budget_usd: Some(30.0),
        ..Default::default()
    })
    .await
    .unwrap();

    let cfg = agg
        .update_config(&BudgetUpdate {
            hard_stop: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!cfg.hard_stop);

    let back = agg.get_config().await.unwrap();
    assert_eq!(back.daily_budget_usd, 30.0);
    assert_eq!(back.weekly_budget_usd, 100.0);
    assert!(!back.hard_stop);
}

#[tokio::test]
async fn unknown_keys_survive_updates() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(BUDGET_PATH);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        json!({"daily_budget_usd": 5, "owner": "founder", "models": ["a", "b"]}).to_string(),
    )
    .unwrap();

    let agg = aggregator(tmp.path(), d(2026, 2, 20));
    let cfg = agg.get_config().await.unwrap();
    // missing known fields are completed from the default
    assert_eq!(cfg.daily_budget_usd, 5.0);
    assert_eq!(cfg.weekly_budget_usd, 100.0);

    agg.update_config(&BudgetUpdate {
        alert_threshold_pct: Some(90.0),
        ..Default::default()
    })
    .await
    .unwrap();

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["owner"], "founder");
    assert_eq!(raw["models"], json!(["a", "b"]));
    assert_eq!(raw["alert_threshold_pct"], 90.0);
    assert_eq!(raw["daily_budget_usd"], 5.0);
}

#[tokio::test]
async fn mistyped_field_falls_back_to_its_default() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(BUDGET_PATH);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, r#"{"daily_budget_usd": "twenty"}"#).unwrap();

    let agg = aggregator(tmp.path(), d(2026, 2, 20));
    assert_eq!(agg.get_config().await.unwrap(), BudgetConfig::default());
}

#[tokio::test]
async fn update_over_mistyped_file_keeps_stored_values() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(BUDGET_PATH);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        json!({
            "daily_budget_usd": 5,
            "weekly_budget_usd": 40,
            "hard_stop": "yes",
            "owner": "founder"
        })
        .to_string(),
    )
    .unwrap();

    let agg = aggregator(tmp.path(), d(2026, 2, 20));
    let cfg = agg
        .update_config(&BudgetUpdate {
            hard_stop: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(cfg.daily_budget_usd, 5.0);
    assert_eq!(cfg.weekly_budget_usd, 40.0);
    assert!(!cfg.hard_stop);

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["owner"], "founder");
    assert_eq!(raw["daily_budget_usd"], 5.0);
    assert_eq!(raw["weekly_budget_usd"], 40.0);
    assert_eq!(raw["hard_stop"], false);
    assert_eq!(raw["alert_threshold_pct"], 80.0);
}

#[tokio::test]
async fn odd_spend_entries_do_not_zero_the_day() {
    let tmp = tempfile::tempdir().unwrap();
    write_log(
        tmp.path(),
        "2026-02-20",
        json!([
            {"date": "2026-02-20", "cost_usd": 5},
            {"date": 20260220, "cost_usd": 1.5},
            {"date": "2026-02-20", "cost_usd": "abc"},
            {"cost_usd": null},
            "stray line"
        ]),
    );
    let agg = aggregator(tmp.path(), d(2026, 2, 20));
    assert_eq!(agg.spend_today().await.unwrap(), 6.5);
}

#[tokio::test]
async fn construction_default_is_used_when_absent() {
    let tmp = tempfile::tempdir().unwrap();
    let agg = BudgetAggregator::new(
        Vault::new(tmp.path()),
        BudgetConfig::new(1.0, 2.0, 50.0, false),
        Weekday::Mon,
        Clock::Fixed(d(2026, 2, 20)),
    );
    let cfg = agg.get_config().await.unwrap();
    assert_eq!(cfg.daily_budget_usd, 1.0);
    assert!(!cfg.hard_stop);
    assert!(agg.gate().await.unwrap().allowed);
}

#[tokio::test]
async fn gate_blocks_once_daily_budget_is_spent() {
    let tmp = tempfile::tempdir().unwrap();
    write_log(tmp.path(), "2026-02-20", json!([{"cost_usd": 15}, {"cost_usd": 6}]));
    let agg = aggregator(tmp.path(), d(2026, 2, 20));

    let g = agg.gate().await.unwrap();
    assert!(!g.allowed);
    assert_eq!(g.reason.as_deref(), Some("Daily budget exceeded: $21.00 / $20.00"));

    let s = agg.get_status().await.unwrap();
    assert!(s.today.exceeded);
    assert!(s.today.alert);
    assert_eq!(s.today.pct, 105);
}
