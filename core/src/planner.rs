//! The projection engine facade.
//!
//! CONTROL FLOW (fixed):
//!   1. Infrastructure cost for the channel mix
//!   2. Base funnel from the knowledge base + request
//!   3. Conservative / moderate / aggressive series from the base funnel
//!   4. One ROI timeline per scenario against the same monthly investment
//!
//! RULES:
//!   - The engine holds only the knowledge base, which is never mutated.
//!   - Identical requests produce identical plans, byte for byte once serialized.

use crate::{
    channel::ChannelConfig,
    error::EngineResult,
    funnel::{project_funnel, ConversionRates, EconomicsInput, FunnelProjection},
    infrastructure::{estimate_infrastructure_costs, InfrastructureCosts, VolumeTargets},
    knowledge_base::{BudgetLevel, BudgetTier, CurrencyCode, CurrencyRate, IcpSelectors, KnowledgeBase},
    roi::{CostSchedule, RoiTimeline, RoiTimelineBuilder},
    scenario::{generate_scenarios, RevenueBasis, Scenario, ScenarioSeries},
    types::{non_negative, Money, Period},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Budget level given by name or derived from a monthly amount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BudgetSelection {
    Level(BudgetLevel),
    Amount(Money),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanRequest {
    pub channels:     ChannelConfig,
    pub signal_tier:  String,
    #[serde(default)]
    pub icp:          IcpSelectors,
    pub economics:    EconomicsInput,
    pub rates:        ConversionRates,
    /// Falls back to the knowledge base default when absent.
    #[serde(default)]
    pub conservative_reduction: Option<f64>,
    pub period_count: usize,
    #[serde(default)]
    pub budget:       Option<BudgetSelection>,
    #[serde(default)]
    pub currency:     Option<CurrencyCode>,
    #[serde(default)]
    pub revenue_basis: RevenueBasis,
    #[serde(default)]
    pub start_month:  Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyInvestment {
    pub infrastructure: Money,
    pub ad_spend:       Money,
    pub retainer:       Money,
    pub total:          Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioTimeline {
    pub scenario: Scenario,
    pub timeline: RoiTimeline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GtmPlan {
    pub infrastructure: InfrastructureCosts,
    pub budget_tier:    Option<BudgetTier>,
    pub investment:     MonthlyInvestment,
    pub base:           FunnelProjection,
    pub scenarios:      Vec<ScenarioSeries>,
    pub timelines:      Vec<ScenarioTimeline>,
    /// Break-even of the moderate timeline.
    pub headline_break_even: Option<Period>,
    /// Display currency for the presentation layer. Amounts stay in base currency.
    pub currency:       Option<CurrencyRate>,
}

impl GtmPlan {
    pub fn timeline(&self, scenario: Scenario) -> Option<&RoiTimeline> {
        self.timelines
            .iter()
            .find(|t| t.scenario == scenario)
            .map(|t| &t.timeline)
    }

    pub fn series(&self, scenario: Scenario) -> Option<&ScenarioSeries> {
        self.scenarios.iter().find(|s| s.scenario == scenario)
    }
}

pub struct GtmEngine {
    kb: KnowledgeBase,
}

impl GtmEngine {
    /// Validates `kb` before accepting it.
    pub fn new(kb: KnowledgeBase) -> EngineResult<Self> {
        kb.validate()?;
        Ok(Self { kb })
    }

    /// Engine over the built-in tables.
    pub fn builtin() -> Self {
        Self { kb: KnowledgeBase::builtin() }
    }

    /// Load failures (missing or unparsable files) surface as
    /// `EngineError::Other`; table problems as `InvalidKnowledgeBase`.
    pub fn from_data_dir(data_dir: &str) -> EngineResult<Self> {
        Self::new(KnowledgeBase::read_tables(data_dir)?)
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn estimate_infrastructure_costs(
        &self,
        channels: &ChannelConfig,
        targets: &VolumeTargets,
    ) -> InfrastructureCosts {
        estimate_infrastructure_costs(channels, targets, &self.kb.infrastructure)
    }

    pub fn project_funnel(
        &self,
        channels: &ChannelConfig,
        tier_id: &str,
        icp: &IcpSelectors,
        economics: &EconomicsInput,
        rates: &ConversionRates,
    ) -> FunnelProjection {
        project_funnel(channels, tier_id, icp, economics, rates, &self.kb)
    }

    pub fn generate_scenarios(
        &self,
        base: &FunnelProjection,
        conservative_reduction: f64,
        period_count: usize,
        basis: RevenueBasis,
    ) -> EngineResult<Vec<ScenarioSeries>> {
        generate_scenarios(base, &self.kb.scenarios, conservative_reduction, period_count, basis)
    }

    pub fn build_roi_timeline(
        &self,
        revenue: &[Money],
        cost: &CostSchedule,
        period_count: usize,
    ) -> EngineResult<RoiTimeline> {
        RoiTimelineBuilder::new().build(revenue, cost, period_count)
    }

    fn resolve_budget_tier(&self, selection: Option<&BudgetSelection>) -> Option<BudgetTier> {
        let tier = match selection? {
            BudgetSelection::Level(level) => self.kb.budget_tier(*level),
            BudgetSelection::Amount(amount) => self.kb.budget_tier_for_amount(*amount),
        };
        if tier.is_none() {
            log::warn!("planner: budget selection {selection:?} matched no budget tier");
        }
        tier.cloned()
    }

    pub fn plan(&self, request: &PlanRequest) -> EngineResult<GtmPlan> {
        let targets = VolumeTargets::from_channels(&request.channels, &self.kb.volume_rules);
        let infrastructure = self.estimate_infrastructure_costs(&request.channels, &targets);

        let budget_tier = self.resolve_budget_tier(request.budget.as_ref());
        let ad_spend = request.channels.ad_spend();
        let retainer = budget_tier.as_ref().map_or(0.0, |t| non_negative(t.monthly_retainer));
        let investment = MonthlyInvestment {
            infrastructure: infrastructure.monthly_total,
            ad_spend,
            retainer,
            total: infrastructure.monthly_total + ad_spend + retainer,
        };

        let base = self.project_funnel(
            &request.channels,
            &request.signal_tier,
            &request.icp,
            &request.economics,
            &request.rates,
        );

        let reduction = request
            .conservative_reduction
            .unwrap_or(self.kb.scenarios.default_conservative_reduction);
        let scenarios = self.generate_scenarios(
            &base,
            reduction,
            request.period_count,
            request.revenue_basis,
        )?;

        let builder = match request.start_month {
            Some(start) => RoiTimelineBuilder::new().starting(start),
            None => RoiTimelineBuilder::new(),
        };
        let cost = CostSchedule::Constant(investment.total);
        let timelines = scenarios
            .iter()
            .map(|series| {
                Ok(ScenarioTimeline {
                    scenario: series.scenario,
                    timeline: builder.build(&series.revenue, &cost, request.period_count)?,
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let headline_break_even = timelines
            .iter()
            .find(|t| t.scenario == Scenario::Moderate)
            .and_then(|t| t.timeline.break_even_period_index);

        let currency = request.currency.and_then(|code| {
            let rate = self.kb.currencies.get(code).cloned();
            if rate.is_none() {
                log::warn!("planner: currency {code:?} not in table, amounts stay in base currency");
            }
            rate
        });

        log::info!(
            "planner: tier={} touches={} clients={} monthly_investment={:.2} break_even={:?}",
            request.signal_tier,
            base.touches,
            base.clients,
            investment.total,
            headline_break_even,
        );

        Ok(GtmPlan {
            infrastructure,
            budget_tier,
            investment,
            base,
            scenarios,
            timelines,
            headline_break_even,
            currency,
        })
    }
}
