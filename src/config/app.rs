// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use chrono::Weekday;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::budget::BudgetConfig;

pub const ENV_CONFIG_PATH: &str = "FOCUS_VAULT_CONFIG";
pub const ENV_VAULT_ROOT: &str = "VAULT_ROOT";
pub const DEFAULT_CONFIG_PATH: &str = "config/focus-vault.toml";
pub const DEFAULT_VAULT_ROOT: &str = "/srv/focus-flow";

fn default_vault_root() -> PathBuf {
    PathBuf::from(DEFAULT_VAULT_ROOT)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_vault_root")]
    pub vault_root: PathBuf,
    #[serde(default)]
    pub budget: BudgetSection,
    #[serde(default)]
    pub alerts: AlertSection,
}

/// Budget used when `cost-budget.json` is absent, plus the week boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BudgetSection {
    pub daily_budget_usd: f64,
    pub weekly_budget_usd: f64,
    pub alert_threshold_pct: f64,
    pub hard_stop: bool,
    /// Weekday name ("sun", "Monday", ...).
    pub week_start: String,
}

impl Default for BudgetSection {
    fn default() -> Self {
        Self {
            daily_budget_usd: 20.0,
            weekly_budget_usd: 100.0,
            alert_threshold_pct: 80.0,
            hard_stop: true,
            week_start: "sun".to_string(),
        }
    }
}

impl BudgetSection {
    pub fn default_budget(&self) -> BudgetConfig {
        BudgetConfig::new(
            self.daily_budget_usd,
            self.weekly_budget_usd,
            self.alert_threshold_pct,
            self.hard_stop,
        )
    }

    pub fn week_start(&self) -> Result<Weekday> {
        self.week_start
            .trim()
            .parse::<Weekday>()
            .map_err(|_| anyhow!("invalid budget.week_start: {:?}", self.week_start))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertSection {
    pub check_interval_secs: u64,
    pub cooldown_secs: i64,
}

impl Default for AlertSection {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
            cooldown_secs: 10_800, // 3h
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vault_root: default_vault_root(),
            budget: BudgetSection::default(),
            alerts: AlertSection::default(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $FOCUS_VAULT_CONFIG
    /// 2) config/focus-vault.toml
    /// 3) built-in defaults
    ///
    /// `$VAULT_ROOT` overrides `vault_root` in every case.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };

        if let Ok(root) = std::env::var(ENV_VAULT_ROOT) {
            if !root.trim().is_empty() {
                cfg.vault_root = PathBuf::from(root);
            }
        }

        info!(
            vault_root = %cfg.vault_root.display(),
            week_start = %cfg.budget.week_start,
            "config loaded"
        );
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        self.budget.week_start()?;
        let b = &self.budget;
        if b.daily_budget_usd < 0.0 || b.weekly_budget_usd < 0.0 {
            return Err(anyhow!("budget amounts must be >= 0"));
        }
        Ok(())
    }
}
