//! ROI timeline builder: cumulative revenue against cumulative investment,
//! month by month, with the first break-even period.

use crate::{
    error::{EngineError, EngineResult},
    types::{non_negative, Money, Period},
};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CostSchedule {
    Constant(Money),
    PerPeriod(Vec<Money>),
}

impl CostSchedule {
    fn check_len(&self, period_count: usize) -> EngineResult<()> {
        match self {
            Self::PerPeriod(costs) if costs.len() < period_count => {
                Err(EngineError::CostScheduleTooShort {
                    expected: period_count,
                    actual:   costs.len(),
                })
            }
            _ => Ok(()),
        }
    }

    fn cost_at(&self, period: Period) -> Money {
        match self {
            Self::Constant(cost)   => *cost,
            Self::PerPeriod(costs) => costs[period],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoiDataPoint {
    pub period:                Period,
    pub label:                 String,
    pub revenue:               Money,
    pub investment:            Money,
    pub cumulative_revenue:    Money,
    pub cumulative_investment: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoiTimeline {
    pub points:                  Vec<RoiDataPoint>,
    pub break_even_period_index: Option<Period>,
    pub total_revenue:           Money,
    pub total_investment:        Money,
    pub net_return:              Money,
    /// `None` when nothing was invested.
    pub roi_percent:             Option<f64>,
}

impl RoiTimeline {
    pub fn break_even_point(&self) -> Option<&RoiDataPoint> {
        self.break_even_period_index.map(|k| &self.points[k])
    }
}

/// Builds timelines, optionally labelling periods with calendar months.
#[derive(Debug, Clone, Default)]
pub struct RoiTimelineBuilder {
    start: Option<NaiveDate>,
}

impl RoiTimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label period 0 with the month of `start` ("Jan 2027", ...).
    pub fn starting(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    fn label(&self, period: Period) -> String {
        self.start
            .and_then(|start| start.checked_add_months(Months::new(period as u32)))
            .map(|date| date.format("%b %Y").to_string())
            .unwrap_or_else(|| format!("Month {}", period + 1))
    }

    pub fn build(
        &self,
        revenue: &[Money],
        cost: &CostSchedule,
        period_count: usize,
    ) -> EngineResult<RoiTimeline> {
        if period_count == 0 {
            return Err(EngineError::InvalidPeriodCount(period_count));
        }
        if revenue.len() < period_count {
            return Err(EngineError::SeriesTooShort {
                expected: period_count,
                actual:   revenue.len(),
            });
        }
        cost.check_len(period_count)?;

        let mut points = Vec::with_capacity(period_count);
        let mut cumulative_revenue = 0.0;
        let mut cumulative_investment = 0.0;
        for period in 0..period_count {
            // Negative amounts would let a running total shrink.
            let period_revenue = non_negative(revenue[period]);
            let period_investment = non_negative(cost.cost_at(period));
            cumulative_revenue += period_revenue;
            cumulative_investment += period_investment;
            points.push(RoiDataPoint {
                period,
                label: self.label(period),
                revenue: period_revenue,
                investment: period_investment,
                cumulative_revenue,
                cumulative_investment,
            });
        }

        let break_even_period_index = find_break_even(&points);
        let net_return = cumulative_revenue - cumulative_investment;
        let roi_percent = (cumulative_investment > 0.0)
            .then(|| net_return / cumulative_investment * 100.0);

        match break_even_period_index {
            Some(k) => log::debug!("roi: break-even at period {k} ({})", points[k].label),
            None => log::debug!("roi: no break-even within {period_count} periods"),
        }

        Ok(RoiTimeline {
            points,
            break_even_period_index,
            total_revenue: cumulative_revenue,
            total_investment: cumulative_investment,
            net_return,
            roi_percent,
        })
    }
}

/// First period whose cumulative revenue meets cumulative investment.
fn find_break_even(points: &[RoiDataPoint]) -> Option<Period> {
    points
        .iter()
        .position(|p| p.cumulative_revenue >= p.cumulative_investment)
}

pub fn build_roi_timeline(
    revenue: &[Money],
    cost: &CostSchedule,
    period_count: usize,
) -> EngineResult<RoiTimeline> {
    RoiTimelineBuilder::new().build(revenue, cost, period_count)
}
