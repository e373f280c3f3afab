// src/lib.rs
// Public library surface for the server binary, the budget watcher, and integration tests.

pub mod api;
pub mod briefing;
pub mod budget;
pub mod budget_watch;
pub mod clock;
pub mod config;
pub mod events;
pub mod metrics;
pub mod notify;
pub mod reports;
pub mod simulation;
pub mod vault;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::clock::Clock;
pub use crate::config::AppConfig;
pub use crate::vault::Vault;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the full router from the default configuration (env + `config/focus-vault.toml`).
pub async fn app() -> anyhow::Result<axum::Router> {
    let cfg = AppConfig::load_default()?;
    let state = AppState::from_config(&cfg, Clock::System)?;
    Ok(router(state))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` sets the filter (default `focus_vault=info,warn`); `LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("focus_vault=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
