//! Scenario generator: conservative / moderate / aggressive variants of one
//! base funnel, each expanded into a per-period revenue series.
//!
//! RULES:
//!   - One transform (`apply_scenario`) produces all three variants; only
//!     its confidence factor differs.
//!   - Touches and responses come from the base projection unchanged.
//!   - Period 0 is the launch month and books no revenue in any scenario,
//!     so every series starts from the same point.

use crate::{
    error::{EngineError, EngineResult},
    funnel::{convert_downstream, FunnelProjection},
    types::{Money, Period},
};
use serde::{Deserialize, Serialize};

/// Upper bound for the conservative haircut; a haircut of 1.0 would zero
/// the funnel outright.
pub const MAX_CONSERVATIVE_REDUCTION: f64 = 0.99;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Conservative,
    Moderate,
    Aggressive,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Conservative, Scenario::Moderate, Scenario::Aggressive];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate     => "moderate",
            Self::Aggressive   => "aggressive",
        }
    }
}

/// Which per-client amount counts as revenue in the timeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RevenueBasis {
    #[default]
    DealSize,
    LifetimeValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioSettings {
    /// Conversion-rate multiplier for the aggressive case. Must be > 1.
    pub aggressive_factor:              f64,
    /// Monthly compounding growth per scenario.
    pub conservative_growth:            f64,
    pub moderate_growth:                f64,
    pub aggressive_growth:              f64,
    pub default_conservative_reduction: f64,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            aggressive_factor:              1.25,
            conservative_growth:            0.01,
            moderate_growth:                0.03,
            aggressive_growth:              0.05,
            default_conservative_reduction: 0.30,
        }
    }
}

impl ScenarioSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.aggressive_factor.is_finite() && self.aggressive_factor > 1.0) {
            return Err(format!("aggressive_factor must be > 1, got {}", self.aggressive_factor));
        }
        let growth = [self.conservative_growth, self.moderate_growth, self.aggressive_growth];
        if growth.iter().any(|g| !(g.is_finite() && *g > -1.0)) {
            return Err("scenario growth rates must be finite and > -1".into());
        }
        if !(self.conservative_growth < self.moderate_growth && self.moderate_growth < self.aggressive_growth) {
            return Err("scenario growth must satisfy conservative < moderate < aggressive".into());
        }
        if !(0.0..=MAX_CONSERVATIVE_REDUCTION).contains(&self.default_conservative_reduction) {
            return Err(format!(
                "default_conservative_reduction must be in [0, {MAX_CONSERVATIVE_REDUCTION}]"
            ));
        }
        Ok(())
    }

    pub fn growth_rate(&self, scenario: Scenario) -> f64 {
        match scenario {
            Scenario::Conservative => self.conservative_growth,
            Scenario::Moderate     => self.moderate_growth,
            Scenario::Aggressive   => self.aggressive_growth,
        }
    }

    /// Multiplier applied to every conversion rate for `scenario`.
    pub fn confidence_factor(&self, scenario: Scenario, conservative_reduction: f64) -> f64 {
        match scenario {
            Scenario::Conservative => 1.0 - clamp_reduction(conservative_reduction),
            Scenario::Moderate     => 1.0,
            Scenario::Aggressive   => self.aggressive_factor.max(1.0),
        }
    }
}

pub fn clamp_reduction(reduction: f64) -> f64 {
    if reduction.is_finite() && (0.0..=MAX_CONSERVATIVE_REDUCTION).contains(&reduction) {
        return reduction;
    }
    let clamped = if reduction.is_finite() {
        reduction.clamp(0.0, MAX_CONSERVATIVE_REDUCTION)
    } else {
        0.0
    };
    log::warn!("scenario: conservative_reduction={reduction} out of range, clamped to {clamped}");
    clamped
}

/// First period that books revenue: the sales cycle, never earlier than 1.
pub fn ramp_start(sales_cycle_months: f64) -> Period {
    let months = if sales_cycle_months.is_finite() && sales_cycle_months > 0.0 {
        sales_cycle_months.ceil() as Period
    } else {
        0
    };
    months.max(1)
}

/// Re-run the downstream stages of `base` with scenario-adjusted rates.
pub fn apply_scenario(
    base: &FunnelProjection,
    scenario: Scenario,
    settings: &ScenarioSettings,
    conservative_reduction: f64,
) -> FunnelProjection {
    let factor = settings.confidence_factor(scenario, conservative_reduction);
    let rates = base.rates.scaled(factor);
    let downstream = convert_downstream(base.responses, &rates, &base.economics);

    FunnelProjection {
        meetings:       downstream.meetings,
        opportunities:  downstream.opportunities,
        clients:        downstream.clients,
        revenue:        downstream.revenue,
        lifetime_value: downstream.lifetime_value,
        rates,
        ..base.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioSeries {
    pub scenario:    Scenario,
    pub projection:  FunnelProjection,
    pub growth_rate: f64,
    pub ramp_start:  Period,
    /// Revenue booked in each period, index 0 = launch month.
    pub revenue:     Vec<Money>,
}

fn revenue_curve(monthly: Money, growth: f64, ramp_start: Period, period_count: usize) -> Vec<Money> {
    (0..period_count)
        .map(|p| {
            if p < ramp_start {
                0.0
            } else {
                monthly * (1.0 + growth).powi((p - ramp_start) as i32)
            }
        })
        .collect()
}

pub fn generate_scenarios(
    base: &FunnelProjection,
    settings: &ScenarioSettings,
    conservative_reduction: f64,
    period_count: usize,
    basis: RevenueBasis,
) -> EngineResult<Vec<ScenarioSeries>> {
    if period_count == 0 {
        return Err(EngineError::InvalidPeriodCount(period_count));
    }
    let ramp = ramp_start(base.economics.sales_cycle_months);

    let series = Scenario::ALL
        .into_iter()
        .map(|scenario| {
            let projection = apply_scenario(base, scenario, settings, conservative_reduction);
            let monthly = match basis {
                RevenueBasis::DealSize      => projection.revenue,
                RevenueBasis::LifetimeValue => projection.lifetime_value,
            };
            let growth_rate = settings.growth_rate(scenario);
            log::debug!(
                "scenario: {} clients={} monthly={monthly:.2} growth={growth_rate}",
                scenario.name(),
                projection.clients,
            );
            ScenarioSeries {
                scenario,
                revenue: revenue_curve(monthly, growth_rate, ramp, period_count),
                projection,
                growth_rate,
                ramp_start: ramp,
            }
        })
        .collect();

    Ok(series)
}
