//! Infrastructure cost estimator: the recurring monthly cost of running a
//! channel mix at a given daily volume.
//!
//! Categories:
//!   - email:   mailboxes (sized from weekly volume) + deliverability tooling
//!   - social:  sending identities (sized from daily volume) × (seat + proxy)
//!              + automation tool
//!   - tooling: enrichment + sequencing + CRM, only when an outbound
//!              channel is enabled
//!
//! RULE: `monthly_total == email + social + tooling` and
//! `annual_total == 12 × monthly_total`. Only `InfrastructureCosts::from_categories`
//! builds a cost record, so the identity cannot drift.

use crate::{
    channel::{Channel, ChannelConfig, VolumeRules},
    types::{ceil_units, non_negative, Money},
};
use serde::{Deserialize, Serialize};

pub const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailInfraPricing {
    /// Sends per mailbox per week that keep sender reputation intact.
    pub mailbox_safe_weekly_sends: f64,
    pub mailbox_monthly_cost:      Money,
    pub deliverability_tooling:    Money,
    /// Daily volume assumed when email is enabled without a usable target.
    pub min_daily_volume:          f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialInfraPricing {
    pub identity_daily_cap:   f64,
    pub premium_seat_cost:    Money,
    pub proxy_cost:           Money,
    pub automation_tool_cost: Money,
    pub min_daily_volume:     f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolingPricing {
    pub enrichment: Money,
    pub sequencing: Money,
    pub crm:        Money,
}

impl ToolingPricing {
    pub fn monthly_total(&self) -> Money {
        self.enrichment + self.sequencing + self.crm
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfrastructurePricing {
    pub email:   EmailInfraPricing,
    pub social:  SocialInfraPricing,
    pub tooling: ToolingPricing,
}

impl Default for InfrastructurePricing {
    fn default() -> Self {
        Self {
            email: EmailInfraPricing {
                mailbox_safe_weekly_sends: 150.0,
                mailbox_monthly_cost:      4.0,
                deliverability_tooling:    79.0,
                min_daily_volume:          30.0,
            },
            social: SocialInfraPricing {
                identity_daily_cap:   25.0,
                premium_seat_cost:    99.0,
                proxy_cost:           20.0,
                automation_tool_cost: 59.0,
                min_daily_volume:     10.0,
            },
            tooling: ToolingPricing {
                enrichment: 149.0,
                sequencing: 97.0,
                crm:        50.0,
            },
        }
    }
}

impl InfrastructurePricing {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.email.mailbox_safe_weekly_sends > 0.0) {
            return Err("mailbox_safe_weekly_sends must be positive".into());
        }
        if !(self.social.identity_daily_cap > 0.0) {
            return Err("identity_daily_cap must be positive".into());
        }
        if !(self.email.min_daily_volume > 0.0 && self.social.min_daily_volume > 0.0) {
            return Err("minimum daily volumes must be positive".into());
        }
        let amounts = [
            self.email.mailbox_monthly_cost,
            self.email.deliverability_tooling,
            self.social.premium_seat_cost,
            self.social.proxy_cost,
            self.social.automation_tool_cost,
            self.tooling.enrichment,
            self.tooling.sequencing,
            self.tooling.crm,
        ];
        if amounts.iter().any(|a| !(a.is_finite() && *a >= 0.0)) {
            return Err("infrastructure prices must be finite and non-negative".into());
        }
        Ok(())
    }
}

/// The scale infrastructure is sized for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeTargets {
    pub email_daily:           f64,
    pub social_daily:          f64,
    pub sending_days_per_week: f64,
}

impl VolumeTargets {
    pub fn from_channels(channels: &ChannelConfig, rules: &VolumeRules) -> Self {
        Self {
            email_daily:           channels.email.daily_sends,
            social_daily:          channels.social.daily_messages,
            sending_days_per_week: rules.sending_days_per_week,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfrastructureCosts {
    pub mailboxes:     u64,
    pub identities:    u64,
    pub email:         Money,
    pub social:        Money,
    pub tooling:       Money,
    pub monthly_total: Money,
    pub annual_total:  Money,
}

impl InfrastructureCosts {
    pub fn from_categories(
        mailboxes: u64,
        identities: u64,
        email: Money,
        social: Money,
        tooling: Money,
    ) -> Self {
        let monthly_total = email + social + tooling;
        Self {
            mailboxes,
            identities,
            email,
            social,
            tooling,
            monthly_total,
            annual_total: monthly_total * MONTHS_PER_YEAR,
        }
    }

    pub fn zero() -> Self {
        Self::from_categories(0, 0, 0.0, 0.0, 0.0)
    }
}

/// Replace an unusable daily volume on an enabled channel with the
/// table's minimum so spend is never silently under-reported.
fn viable_volume(channel: Channel, requested: f64, minimum: f64) -> f64 {
    let volume = non_negative(requested);
    if volume > 0.0 {
        return volume;
    }
    log::warn!(
        "infrastructure: {} enabled with daily volume {requested}, clamping to minimum {minimum}",
        channel.name()
    );
    minimum
}

/// Whole unit count for reporting. Costs are priced from `units` directly,
/// so a count that saturates never shrinks the bill.
fn unit_count(channel: Channel, units: f64) -> u64 {
    if units > u64::MAX as f64 {
        log::warn!(
            "infrastructure: {} needs {units:e} units, count reported as u64::MAX",
            channel.name()
        );
    }
    units as u64
}

pub fn estimate_infrastructure_costs(
    channels: &ChannelConfig,
    targets: &VolumeTargets,
    pricing: &InfrastructurePricing,
) -> InfrastructureCosts {
    let days_per_week = if targets.sending_days_per_week > 0.0 && targets.sending_days_per_week <= 7.0 {
        targets.sending_days_per_week
    } else {
        log::warn!(
            "infrastructure: sending_days_per_week {} out of range, using 5",
            targets.sending_days_per_week
        );
        5.0
    };

    let (mailboxes, email) = if channels.email.enabled {
        let daily = viable_volume(Channel::Email, targets.email_daily, pricing.email.min_daily_volume);
        let weekly = daily * days_per_week;
        let units = ceil_units(weekly / pricing.email.mailbox_safe_weekly_sends).max(1.0);
        let cost = units * pricing.email.mailbox_monthly_cost + pricing.email.deliverability_tooling;
        (unit_count(Channel::Email, units), cost)
    } else {
        (0, 0.0)
    };

    let (identities, social) = if channels.social.enabled {
        let daily = viable_volume(Channel::Social, targets.social_daily, pricing.social.min_daily_volume);
        let units = ceil_units(daily / pricing.social.identity_daily_cap).max(1.0);
        let per_identity = pricing.social.premium_seat_cost + pricing.social.proxy_cost;
        let cost = units * per_identity + pricing.social.automation_tool_cost;
        (unit_count(Channel::Social, units), cost)
    } else {
        (0, 0.0)
    };

    let tooling = if channels.has_outbound() {
        pricing.tooling.monthly_total()
    } else {
        0.0
    };

    let costs = InfrastructureCosts::from_categories(mailboxes, identities, email, social, tooling);
    log::debug!(
        "infrastructure: mailboxes={} identities={} monthly={:.2} annual={:.2}",
        costs.mailboxes,
        costs.identities,
        costs.monthly_total,
        costs.annual_total
    );
    costs
}
