//! Funnel projection calculator.
//!
//! Stage chain (one consistent wiring, always five counts):
//!
//!   touches ─reply─▶ responses ─meeting─▶ meetings ─opportunity─▶ opportunities ─close─▶ clients
//!
//! When no opportunity rate is configured, meetings pass straight through
//! (`opportunities == meetings`). Every stage is the previous one times a
//! rate in [0, 1], floored, so counts can only shrink down-funnel.

use crate::{
    channel::{Channel, ChannelConfig},
    knowledge_base::{IcpFactors, IcpSelectors, KnowledgeBase, SignalWarmthTier, SynergySelection},
    types::{floor_count, non_negative, Money, StageCount},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct EconomicsInput {
    pub avg_deal_size:      Money,
    pub lifetime_value:     Money,
    pub sales_cycle_months: f64,
}

impl EconomicsInput {
    /// Non-positive or non-finite values become 0.
    pub fn sanitized(&self) -> Self {
        Self {
            avg_deal_size:      non_negative(self.avg_deal_size),
            lifetime_value:     non_negative(self.lifetime_value),
            sales_cycle_months: non_negative(self.sales_cycle_months),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConversionRates {
    pub meeting_rate:     f64,
    /// `None` = no intermediate stage; meetings become opportunities 1:1.
    #[serde(default)]
    pub opportunity_rate: Option<f64>,
    pub close_rate:       f64,
}

impl ConversionRates {
    /// Every rate clamped into [0, 1].
    pub fn clamped(&self) -> Self {
        Self {
            meeting_rate:     clamp_rate("meeting_rate", self.meeting_rate),
            opportunity_rate: self.opportunity_rate.map(|r| clamp_rate("opportunity_rate", r)),
            close_rate:       clamp_rate("close_rate", self.close_rate),
        }
    }

    /// Every configured rate multiplied by `factor`, capped at 1.0.
    /// A pass-through opportunity stage stays pass-through.
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = non_negative(factor);
        let scale = |rate: f64| (rate * factor).min(1.0);
        Self {
            meeting_rate:     scale(self.meeting_rate),
            opportunity_rate: self.opportunity_rate.map(scale),
            close_rate:       scale(self.close_rate),
        }
    }
}

/// Clamp a conversion rate into [0, 1]. Non-finite values become 0.
pub fn clamp_rate(name: &str, rate: f64) -> f64 {
    if rate.is_finite() && (0.0..=1.0).contains(&rate) {
        return rate;
    }
    let clamped = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
    log::warn!("funnel: {name}={rate} outside [0, 1], clamped to {clamped}");
    clamped
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelTouches {
    pub channel:         Channel,
    pub touches:         StageCount,
    pub base_reply_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunnelProjection {
    pub touches:       StageCount,
    pub responses:     StageCount,
    pub meetings:      StageCount,
    pub opportunities: StageCount,
    pub clients:       StageCount,
    pub revenue:        Money,
    pub lifetime_value: Money,
    // Audit trail
    pub tier:                 Option<SignalWarmthTier>,
    pub channels:             Vec<ChannelTouches>,
    pub base_reply_rate:      f64,
    pub icp:                  IcpFactors,
    pub synergy:              SynergySelection,
    pub effective_reply_rate: f64,
    pub rates:                ConversionRates,
    pub economics:            EconomicsInput,
}

/// Counts and money below the response stage.
pub(crate) struct Downstream {
    pub meetings:       StageCount,
    pub opportunities:  StageCount,
    pub clients:        StageCount,
    pub revenue:        Money,
    pub lifetime_value: Money,
}

/// Convert responses into clients and money. `rates` must already be in
/// [0, 1]; `economics` must already be sanitized.
pub(crate) fn convert_downstream(
    responses: StageCount,
    rates: &ConversionRates,
    economics: &EconomicsInput,
) -> Downstream {
    let meetings = floor_count(responses as f64 * rates.meeting_rate).min(responses);
    let opportunities = match rates.opportunity_rate {
        Some(rate) => floor_count(meetings as f64 * rate).min(meetings),
        None => meetings,
    };
    let clients = floor_count(opportunities as f64 * rates.close_rate).min(opportunities);

    Downstream {
        meetings,
        opportunities,
        clients,
        revenue:        clients as f64 * economics.avg_deal_size,
        lifetime_value: clients as f64 * economics.lifetime_value,
    }
}

impl FunnelProjection {
    /// `[touches, responses, meetings, opportunities, clients]`
    pub fn stage_counts(&self) -> [StageCount; 5] {
        [self.touches, self.responses, self.meetings, self.opportunities, self.clients]
    }

    pub fn is_monotonic(&self) -> bool {
        self.stage_counts().windows(2).all(|w| w[0] >= w[1])
    }

    pub fn is_zero(&self) -> bool {
        self.stage_counts().iter().all(|c| *c == 0) && self.revenue == 0.0
    }
}

pub fn project_funnel(
    channels: &ChannelConfig,
    tier_id: &str,
    icp: &IcpSelectors,
    economics: &EconomicsInput,
    rates: &ConversionRates,
    kb: &KnowledgeBase,
) -> FunnelProjection {
    let economics = economics.sanitized();
    let rates = rates.clamped();
    let (tier, reply_rates) = kb.reply_rates_for(tier_id);

    // 1. touches per enabled channel
    let per_channel: Vec<ChannelTouches> = Channel::ALL
        .into_iter()
        .filter(|c| channels.is_enabled(*c))
        .map(|channel| ChannelTouches {
            channel,
            touches: channels.monthly_touches(channel, &kb.volume_rules),
            base_reply_rate: reply_rates.for_channel(channel),
        })
        .collect();
    // Per-channel counts may already sit at StageCount::MAX.
    let touches: StageCount = per_channel
        .iter()
        .fold(0, |total, c| total.saturating_add(c.touches));

    // 2. touch-weighted base rate × ICP × synergy
    let base_reply_rate = if touches > 0 {
        per_channel
            .iter()
            .map(|c| c.touches as f64 * c.base_reply_rate)
            .sum::<f64>()
            / touches as f64
    } else {
        0.0
    };
    let icp_factors = kb.icp.factors(icp);
    let synergy = kb.synergy_for(&channels.active_channels(), tier);
    let effective_reply_rate = clamp_rate(
        "effective_reply_rate",
        base_reply_rate * icp_factors.combined * synergy.multiplier,
    );

    // 3-5. stage counts and money
    let responses = floor_count(touches as f64 * effective_reply_rate).min(touches);
    let downstream = convert_downstream(responses, &rates, &economics);

    if touches == 0 {
        log::debug!("funnel: no active volume, projection is all zero");
    } else {
        log::debug!(
            "funnel: touches={touches} responses={responses} meetings={} opportunities={} clients={} revenue={:.2}",
            downstream.meetings,
            downstream.opportunities,
            downstream.clients,
            downstream.revenue,
        );
    }

    FunnelProjection {
        touches,
        responses,
        meetings: downstream.meetings,
        opportunities: downstream.opportunities,
        clients: downstream.clients,
        revenue: downstream.revenue,
        lifetime_value: downstream.lifetime_value,
        tier,
        channels: per_channel,
        base_reply_rate,
        icp: icp_factors,
        synergy,
        effective_reply_rate,
        rates,
        economics,
    }
}
