//! Outreach channels and the monthly touch volume each one produces.
//!
//! RULE: a disabled channel contributes zero touches and zero spend,
//! whatever its volume parameters say.

use crate::types::{floor_count, non_negative, Money, StageCount, WEEKS_PER_MONTH};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Social,
    Content,
    Ads,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Email, Channel::Social, Channel::Content, Channel::Ads];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Email   => "email",
            Self::Social  => "social",
            Self::Content => "content",
            Self::Ads     => "ads",
        }
    }

    /// Outbound channels need sending infrastructure and the shared
    /// enrichment/sequencing/CRM tooling.
    pub fn is_outbound(&self) -> bool {
        matches!(self, Self::Email | Self::Social)
    }
}

/// Calendar and floor values used to turn channel parameters into volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeRules {
    pub sending_days_per_month: f64,
    pub sending_days_per_week:  f64,
    /// Floor applied to a caller's cost-per-click so ad clicks stay finite.
    pub min_cost_per_click:     f64,
}

impl Default for VolumeRules {
    fn default() -> Self {
        Self {
            sending_days_per_month: 20.0,
            sending_days_per_week:  5.0,
            min_cost_per_click:     0.50,
        }
    }
}

impl VolumeRules {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.sending_days_per_month > 0.0 && self.sending_days_per_month <= 31.0) {
            return Err(format!(
                "sending_days_per_month must be in (0, 31], got {}",
                self.sending_days_per_month
            ));
        }
        if !(self.sending_days_per_week > 0.0 && self.sending_days_per_week <= 7.0) {
            return Err(format!(
                "sending_days_per_week must be in (0, 7], got {}",
                self.sending_days_per_week
            ));
        }
        if !(self.min_cost_per_click > 0.0 && self.min_cost_per_click.is_finite()) {
            return Err(format!(
                "min_cost_per_click must be positive, got {}",
                self.min_cost_per_click
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmailChannel {
    pub enabled:     bool,
    pub daily_sends: f64,
    /// Caps monthly touches when the prospect list is smaller than the
    /// sending capacity.
    pub list_size:   Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SocialChannel {
    pub enabled:        bool,
    pub daily_messages: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentChannel {
    pub enabled:        bool,
    pub posts_per_week: f64,
    pub reach_per_post: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdsChannel {
    pub enabled:        bool,
    pub monthly_budget: Money,
    pub cost_per_click: Money,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelConfig {
    pub email:   EmailChannel,
    pub social:  SocialChannel,
    pub content: ContentChannel,
    pub ads:     AdsChannel,
}

impl ChannelConfig {
    pub fn with_email(mut self, daily_sends: f64) -> Self {
        self.email = EmailChannel { enabled: true, daily_sends, list_size: None };
        self
    }

    pub fn with_social(mut self, daily_messages: f64) -> Self {
        self.social = SocialChannel { enabled: true, daily_messages };
        self
    }

    pub fn with_content(mut self, posts_per_week: f64, reach_per_post: f64) -> Self {
        self.content = ContentChannel { enabled: true, posts_per_week, reach_per_post };
        self
    }

    pub fn with_ads(mut self, monthly_budget: Money, cost_per_click: Money) -> Self {
        self.ads = AdsChannel { enabled: true, monthly_budget, cost_per_click };
        self
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email   => self.email.enabled,
            Channel::Social  => self.social.enabled,
            Channel::Content => self.content.enabled,
            Channel::Ads     => self.ads.enabled,
        }
    }

    /// The exact set of enabled channels, in stable order.
    pub fn active_channels(&self) -> BTreeSet<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }

    pub fn has_outbound(&self) -> bool {
        Channel::ALL
            .iter()
            .any(|c| c.is_outbound() && self.is_enabled(*c))
    }

    /// Monthly touches for one channel. Zero when the channel is disabled.
    pub fn monthly_touches(&self, channel: Channel, rules: &VolumeRules) -> StageCount {
        if !self.is_enabled(channel) {
            return 0;
        }
        let volume = match channel {
            Channel::Email => {
                let capacity = non_negative(self.email.daily_sends) * rules.sending_days_per_month;
                match self.email.list_size {
                    Some(list) => capacity.min(non_negative(list)),
                    None => capacity,
                }
            }
            Channel::Social => non_negative(self.social.daily_messages) * rules.sending_days_per_month,
            Channel::Content => {
                non_negative(self.content.posts_per_week)
                    * WEEKS_PER_MONTH
                    * non_negative(self.content.reach_per_post)
            }
            Channel::Ads => {
                let cpc = non_negative(self.ads.cost_per_click).max(rules.min_cost_per_click);
                non_negative(self.ads.monthly_budget) / cpc
            }
        };
        floor_count(volume)
    }

    /// Media spend that flows straight into monthly investment.
    pub fn ad_spend(&self) -> Money {
        if self.ads.enabled { non_negative(self.ads.monthly_budget) } else { 0.0 }
    }
}
