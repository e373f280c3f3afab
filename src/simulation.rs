//! What-if simulation: projects experiment velocity and MRR from a daily
//! budget, founder hours and risk appetite. Pure heuristics, no I/O.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskTolerance {
    fn multiplier(self) -> f64 {
        match self {
            RiskTolerance::Low => 0.7,
            RiskTolerance::Medium => 1.0,
            RiskTolerance::High => 1.5,
        }
    }

    fn label(self) -> &'static str {
        match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Medium => "medium",
            RiskTolerance::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationParams {
    pub projects: Vec<String>,
    pub budget_per_day: f64,
    pub founder_hours_per_week: f64,
    pub risk_tolerance: RiskTolerance,
    pub time_horizon_weeks: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            budget_per_day: 20.0,
            founder_hours_per_week: 20.0,
            risk_tolerance: RiskTolerance::Medium,
            time_horizon_weeks: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub scenario: String,
    pub projected_mrr: i64,
    pub experiment_velocity: u32,
    pub validation_timeline: String,
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
}

pub fn run(params: &SimulationParams) -> SimulationResult {
    let budget = params.budget_per_day.max(0.0);
    let hours = params.founder_hours_per_week;
    let weeks = params.time_horizon_weeks;
    let risk = params.risk_tolerance;

    // Each $10/day supports ~2 experiments a week.
    let velocity = ((budget / 10.0).floor() as u32).saturating_mul(2);
    let total_experiments = velocity.saturating_mul(weeks);

    // One in five experiments validates a channel; each channel ~$300 MRR.
    let multiplier = risk.multiplier();
    let channels = (f64::from(total_experiments) / 5.0 * multiplier).floor() as i64;
    let projected_mrr = (channels as f64 * 300.0 * multiplier).round() as i64;

    let validation_timeline = if velocity == 0 {
        format!("No validation expected, {channels} channels by week {weeks}")
    } else {
        let first = (5.0 / f64::from(velocity)).ceil().max(2.0) as u32;
        format!("First validation in ~{first} weeks, {channels} channels by week {weeks}")
    };

    let mut risks = Vec::new();
    if budget > 50.0 {
        risks.push("High daily spend may deplete reserves quickly".to_string());
    }
    if hours < 10.0 {
        risks.push("Low founder involvement limits context for decisions".to_string());
    }
    if risk == RiskTolerance::High {
        risks.push("High risk tolerance may lead to premature scaling".to_string());
    }
    if weeks < 4 {
        risks.push("Short horizon limits experiment iteration cycles".to_string());
    }

    let mut recommendations = Vec::new();
    if velocity < 2 {
        recommendations
            .push("Consider increasing budget to run at least 2 experiments/week".to_string());
    }
    if channels < 1 {
        recommendations.push(
            "Current pace unlikely to validate any channel, increase time or budget".to_string(),
        );
    }
    if hours > 40.0 {
        recommendations.push("Founder time is saturated, delegate more to agents".to_string());
    }

    SimulationResult {
        scenario: format!(
            "${}/day, {}h/week, {} weeks, {} risk",
            params.budget_per_day,
            hours,
            weeks,
            risk.label()
        ),
        projected_mrr,
        experiment_velocity: velocity,
        validation_timeline,
        risks,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_baseline() {
        let r = run(&SimulationParams::default());
        // $20/day → 4/week → 48 experiments → 9 channels → $2700
        assert_eq!(r.experiment_velocity, 4);
        assert_eq!(r.projected_mrr, 2700);
        assert_eq!(
            r.validation_timeline,
            "First validation in ~2 weeks, 9 channels by week 12"
        );
        assert_eq!(r.scenario, "$20/day, 20h/week, 12 weeks, medium risk");
        assert!(r.risks.is_empty());
        assert!(r.recommendations.is_empty());
    }

    #[test]
    fn tiny_budget_short_horizon() {
        let r = run(&SimulationParams {
            budget_per_day: 5.0,
            founder_hours_per_week: 5.0,
            time_horizon_weeks: 2,
            risk_tolerance: RiskTolerance::High,
            ..Default::default()
        });
        assert_eq!(r.experiment_velocity, 0);
        assert_eq!(r.projected_mrr, 0);
        assert!(r.validation_timeline.starts_with("No validation expected"));
        assert_eq!(r.risks.len(), 3);
        assert_eq!(r.recommendations.len(), 2);
    }

    #[test]
    fn params_deserialize_camel_case_with_defaults() {
        let p: SimulationParams =
            serde_json::from_str(r#"{"budgetPerDay": 30, "riskTolerance": "low"}"#).unwrap();
        assert_eq!(p.budget_per_day, 30.0);
        assert_eq!(p.risk_tolerance, RiskTolerance::Low);
        assert_eq!(p.time_horizon_weeks, 12);
    }
}
