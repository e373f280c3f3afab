//! Focus Vault: binary entrypoint
//! Boots the Axum HTTP server over the configured vault directory.

use focus_vault::{api, metrics::Metrics, AppConfig, AppState, Clock};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    focus_vault::init_tracing();

    let cfg = AppConfig::load_default()?;
    let state = AppState::from_config(&cfg, Clock::System)?;
    let mut router = api::router(state);

    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!("metrics disabled: {e:#}"),
    }

    Ok(router.into())
}
