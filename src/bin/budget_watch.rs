//! Polls the vault's spend logs and pushes budget alerts (Telegram when configured, log otherwise).

use focus_vault::budget::BudgetAggregator;
use focus_vault::budget_watch::run_budget_watch;
use focus_vault::notify::NotifierMux;
use focus_vault::{AppConfig, Clock, Vault};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    focus_vault::init_tracing();

    let cfg = AppConfig::load_default()?;
    let agg = BudgetAggregator::new(
        Vault::new(&cfg.vault_root),
        cfg.budget.default_budget(),
        cfg.budget.week_start()?,
        Clock::System,
    );

    tracing::info!(
        interval_secs = cfg.alerts.check_interval_secs,
        cooldown_secs = cfg.alerts.cooldown_secs,
        "budget watch started"
    );
    run_budget_watch(
        agg,
        NotifierMux::from_env(),
        cfg.alerts.check_interval_secs,
        cfg.alerts.cooldown_secs,
    )
    .await
}
