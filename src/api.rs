use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Weekday;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::briefing::{self, BriefingReport, BriefingService};
use crate::budget::{BudgetAggregator, BudgetConfig, BudgetGate, BudgetStatus, BudgetUpdate};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::events::{self, EventCorrelation, EventReport};
use crate::reports::catalog::{DEFAULT_LIST_LIMIT, DEFAULT_WEEKLY_LIMIT};
use crate::reports::{FileReportSource, ReportCatalog, ReportSource, REPORTS_DIR};
use crate::simulation::{self, SimulationParams, SimulationResult};
use crate::vault::Vault;

#[derive(Clone)]
pub struct AppState {
    pub briefings: BriefingService,
    pub events: EventCorrelation,
    pub budget: BudgetAggregator,
    pub reports: ReportCatalog,
}

impl AppState {
    pub fn new(
        vault: Vault,
        budget_defaults: BudgetConfig,
        week_start: Weekday,
        clock: Clock,
    ) -> Result<Self> {
        let reports_dir = vault.resolve([REPORTS_DIR])?;
        let source: Arc<dyn ReportSource> = Arc::new(FileReportSource::new(
            vault.clone(),
            reports_dir.clone(),
            clock,
        ));

        Ok(Self {
            briefings: BriefingService::new(source.clone(), clock),
            events: EventCorrelation::new(source),
            budget: BudgetAggregator::new(vault.clone(), budget_defaults, week_start, clock),
            reports: ReportCatalog::new(vault, reports_dir),
        })
    }

    pub fn from_config(cfg: &AppConfig, clock: Clock) -> Result<Self> {
        Self::new(
            Vault::new(&cfg.vault_root),
            cfg.budget.default_budget(),
            cfg.budget.week_start()?,
            clock,
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/briefing/today", get(briefing_today))
        .route("/api/briefing/narrative", get(briefing_narrative))
        .route("/api/briefing/history", get(briefing_history))
        .route("/api/events/latest", get(events_latest))
        .route("/api/events/urgent", get(events_urgent))
        .route("/api/events/history", get(events_history))
        .route("/api/events/project/{project_id}", get(events_by_project))
        .route("/api/budget", get(budget_status).patch(budget_update))
        .route("/api/budget/gate", get(budget_gate))
        .route("/api/reports", get(reports_list))
        .route("/api/reports/types", get(report_types))
        .route("/api/reports/weekly", get(weekly_list))
        .route("/api/reports/weekly/latest", get(weekly_latest))
        .route("/api/reports/{id}", get(report_by_id))
        .route("/api/simulations/run", post(simulation_run))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(e) => {
                tracing::error!("request failed: {e:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn found<T>(v: Option<T>, msg: &str) -> ApiResult<T> {
    v.map(Json).ok_or_else(|| ApiError::NotFound(msg.to_string()))
}

/* ----------------------------
Briefings & events
---------------------------- */

#[derive(Deserialize)]
struct DaysQuery {
    days: Option<u32>,
}

async fn briefing_today(State(state): State<AppState>) -> ApiResult<BriefingReport> {
    found(
        state.briefings.today().await?,
        "No briefing generated for today yet",
    )
}

async fn briefing_narrative(State(state): State<AppState>) -> ApiResult<Value> {
    let narrative = found(
        state.briefings.narrative().await?,
        "No briefing available today",
    )?;
    Ok(Json(json!({ "narrative": narrative.0 })))
}

async fn briefing_history(
    State(state): State<AppState>,
    Query(q): Query<DaysQuery>,
) -> ApiResult<Value> {
    let days = q.days.unwrap_or(briefing::DEFAULT_HISTORY_DAYS);
    let history = state.briefings.history(days).await?;
    Ok(Json(json!({ "count": history.len(), "briefings": history })))
}

async fn events_latest(State(state): State<AppState>) -> ApiResult<EventReport> {
    found(state.events.latest().await?, "No event scan available")
}

async fn events_urgent(State(state): State<AppState>) -> ApiResult<Value> {
    let urgent = state.events.urgent().await?;
    Ok(Json(json!({ "count": urgent.len(), "events": urgent })))
}

async fn events_history(
    State(state): State<AppState>,
    Query(q): Query<DaysQuery>,
) -> ApiResult<Value> {
    let days = q.days.unwrap_or(events::DEFAULT_HISTORY_DAYS);
    let reports = state.events.history(days).await?;
    Ok(Json(json!({ "count": reports.len(), "reports": reports })))
}

async fn events_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(q): Query<DaysQuery>,
) -> ApiResult<Value> {
    let days = q.days.unwrap_or(events::DEFAULT_PROJECT_DAYS);
    let events = state.events.by_project(&project_id, days).await?;
    Ok(Json(json!({
        "project_id": project_id,
        "count": events.len(),
        "events": events,
    })))
}

/* ----------------------------
Budget
---------------------------- */

async fn budget_status(State(state): State<AppState>) -> ApiResult<BudgetStatus> {
    Ok(Json(state.budget.get_status().await?))
}

async fn budget_gate(State(state): State<AppState>) -> ApiResult<BudgetGate> {
    Ok(Json(state.budget.gate().await?))
}

async fn budget_update(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Value> {
    let update = parse_budget_update(&body).map_err(ApiError::BadRequest)?;
    let config = state.budget.update_config(&update).await?;
    Ok(Json(json!({ "status": "updated", "config": config })))
}

/// Pick the known budget fields out of a loosely typed body.
///
/// Amounts accept numbers or numeric strings; `hard_stop` follows JavaScript truthiness.
pub fn parse_budget_update(body: &Value) -> Result<BudgetUpdate, String> {
    let Some(obj) = body.as_object() else {
        return Err("request body must be a JSON object".to_string());
    };

    let amount = |key: &str| -> Result<Option<f64>, String> {
        match obj.get(key) {
            None => Ok(None),
            Some(v) => match coerce_number(v) {
                Some(n) if n.is_finite() && n >= 0.0 => Ok(Some(n)),
                _ => Err(format!("{key} must be a non-negative number")),
            },
        }
    };

    Ok(BudgetUpdate {
        daily_budget_usd: amount("daily_budget_usd")?,
        weekly_budget_usd: amount("weekly_budget_usd")?,
        alert_threshold_pct: amount("alert_threshold_pct")?,
        hard_stop: obj.get("hard_stop").map(truthy),
    })
}

fn coerce_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0 && !x.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/* ----------------------------
Reports
---------------------------- */

#[derive(Deserialize)]
struct ListQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    limit: Option<usize>,
}

async fn reports_list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Value> {
    let kind = q.kind.as_deref().filter(|k| !k.is_empty());
    let reports = state
        .reports
        .list_reports(kind, q.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;
    Ok(Json(json!({ "reports": reports, "count": reports.len() })))
}

async fn report_types(State(state): State<AppState>) -> ApiResult<Value> {
    let types = state.reports.report_types().await?;
    Ok(Json(json!({ "types": types })))
}

async fn report_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    found(state.reports.get_report_by_id(&id).await?, "Report not found")
}

async fn weekly_list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Value> {
    let reports = state
        .reports
        .weekly_reports(q.limit.unwrap_or(DEFAULT_WEEKLY_LIMIT))
        .await?;
    Ok(Json(json!({ "reports": reports, "count": reports.len() })))
}

async fn weekly_latest(State(state): State<AppState>) -> ApiResult<Value> {
    found(state.reports.latest_weekly().await?, "No weekly reports found")
}

/* ----------------------------
Simulation
---------------------------- */

async fn simulation_run(Json(params): Json<SimulationParams>) -> Json<SimulationResult> {
    Json(simulation::run(&params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_update_coerces_like_the_ui_expects() {
        let u = parse_budget_update(&json!({
            "daily_budget_usd": "25",
            "weekly_budget_usd": 120,
            "hard_stop": 0,
            "ignored": "x"
        }))
        .unwrap();
        assert_eq!(u.daily_budget_usd, Some(25.0));
        assert_eq!(u.weekly_budget_usd, Some(120.0));
        assert_eq!(u.alert_threshold_pct, None);
        assert_eq!(u.hard_stop, Some(false));

        assert_eq!(
            parse_budget_update(&json!({"hard_stop": "no"})).unwrap().hard_stop,
            Some(true)
        );
        assert!(parse_budget_update(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn budget_update_rejects_garbage() {
        assert!(parse_budget_update(&json!({"daily_budget_usd": "lots"})).is_err());
        assert!(parse_budget_update(&json!({"daily_budget_usd": -1})).is_err());
        assert!(parse_budget_update(&json!([1, 2])).is_err());
    }
}
