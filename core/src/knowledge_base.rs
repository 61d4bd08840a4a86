//! Static reference tables the engine is initialized with.
//!
//! RULE: lookups never fail. A key the tables do not know resolves to the
//! neutral value (multiplier 1.0, reply rate 0) and the miss is logged.
//!
//! Free-text keys (industry, title, company size) are normalized before
//! matching: trimmed, lowercased, and runs of whitespace, `-`, `/` or `_`
//! collapsed to a single `_`. Matching then tries, in order:
//!   1. exact normalized key,
//!   2. whole-segment containment in either direction
//!      ("vp_of_sales" contains "vp"; "saas" is contained in "vertical_saas"),
//!      longest key first, ties broken by table order.
//! There is no token-overlap or edit-distance matching.

use crate::{
    channel::{Channel, VolumeRules},
    error::{EngineError, EngineResult},
    infrastructure::InfrastructurePricing,
    scenario::ScenarioSettings,
    types::{non_negative, Money},
};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const NEUTRAL_MULTIPLIER: f64 = 1.0;

// ── Signal warmth ────────────────────────────────────────────────────────────

/// Ordered from coldest to warmest. Later tiers must dominate earlier
/// ones on every channel's reply rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SignalWarmthTier {
    Cold,
    Targeted,
    IntentBased,
    Inbound,
}

impl SignalWarmthTier {
    pub const ALL: [SignalWarmthTier; 4] = [
        SignalWarmthTier::Cold,
        SignalWarmthTier::Targeted,
        SignalWarmthTier::IntentBased,
        SignalWarmthTier::Inbound,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Cold        => "cold",
            Self::Targeted    => "targeted",
            Self::IntentBased => "intent_based",
            Self::Inbound     => "inbound",
        }
    }

    /// Accepts "intent-based", "Intent Based", "intent_based", etc.
    pub fn from_id(raw: &str) -> Option<Self> {
        let key = normalize_key(raw);
        Self::ALL.into_iter().find(|t| t.id() == key)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChannelRates {
    pub email:   f64,
    pub social:  f64,
    pub content: f64,
    pub ads:     f64,
}

impl ChannelRates {
    pub const ZERO: ChannelRates = ChannelRates { email: 0.0, social: 0.0, content: 0.0, ads: 0.0 };

    pub fn for_channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Email   => self.email,
            Channel::Social  => self.social,
            Channel::Content => self.content,
            Channel::Ads     => self.ads,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierRates {
    pub tier:  SignalWarmthTier,
    pub label: String,
    pub reply_rates: ChannelRates,
}

// ── Keyed benchmark tables ───────────────────────────────────────────────────

/// Canonical form of a free-text lookup key.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() || matches!(ch, '-' | '/' | '_') {
            pending_sep = !out.is_empty();
        } else {
            if pending_sep {
                out.push('_');
                pending_sep = false;
            }
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// True when `needle` appears in `haystack` as a run of whole segments.
fn contains_segments(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack == needle || format!("_{haystack}_").contains(&format!("_{needle}_"))
}

/// Outcome of a benchmark lookup. Kept on the projection as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum Lookup {
    Exact   { key: String, multiplier: f64 },
    Partial { key: String, multiplier: f64 },
    Unknown,
}

impl Lookup {
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Exact { multiplier, .. } | Self::Partial { multiplier, .. } => *multiplier,
            Self::Unknown => NEUTRAL_MULTIPLIER,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Resolve `raw` against `(key, multiplier)` pairs whose keys are already
/// normalized.
fn lookup_in<'a, I>(entries: I, raw: &str) -> Lookup
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let query = normalize_key(raw);
    if query.is_empty() {
        return Lookup::Unknown;
    }

    let mut best: Option<(&str, f64)> = None;
    for (key, multiplier) in entries {
        if key == query {
            return Lookup::Exact { key: key.to_string(), multiplier };
        }
        if contains_segments(&query, key) || contains_segments(key, &query) {
            let longer = best.map_or(true, |(k, _)| key.len() > k.len());
            if longer {
                best = Some((key, multiplier));
            }
        }
    }

    match best {
        Some((key, multiplier)) => {
            log::debug!("knowledge_base: '{raw}' partially matched '{key}'");
            Lookup::Partial { key: key.to_string(), multiplier }
        }
        None => {
            log::debug!("knowledge_base: no entry for '{raw}', using neutral multiplier");
            Lookup::Unknown
        }
    }
}

/// Multiplier table keyed by normalized free-text names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct BenchmarkTable {
    entries: BTreeMap<String, f64>,
}

impl From<BTreeMap<String, f64>> for BenchmarkTable {
    fn from(raw: BTreeMap<String, f64>) -> Self {
        Self {
            entries: raw.into_iter().map(|(k, v)| (normalize_key(&k), v)).collect(),
        }
    }
}

impl From<BenchmarkTable> for BTreeMap<String, f64> {
    fn from(table: BenchmarkTable) -> Self {
        table.entries
    }
}

impl BenchmarkTable {
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self {
            entries: pairs.iter().map(|(k, v)| (normalize_key(k), *v)).collect(),
        }
    }

    pub fn lookup(&self, raw: &str) -> Lookup {
        lookup_in(self.entries.iter().map(|(k, v)| (k.as_str(), *v)), raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── ICP benchmarks ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanySizeBucket {
    /// Normalized on deserialization, like [`BenchmarkTable`] keys.
    #[serde(deserialize_with = "normalized_key")]
    pub key:           String,
    pub min_employees: u32,
    /// `None` = no upper bound.
    pub max_employees: Option<u32>,
    pub multiplier:    f64,
}

fn normalized_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|raw| normalize_key(&raw))
}

impl CompanySizeBucket {
    fn contains(&self, employees: u32) -> bool {
        employees >= self.min_employees
            && self.max_employees.map_or(true, |max| employees <= max)
    }
}

/// A company size given either as a bucket name or a headcount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CompanySize {
    Employees(u32),
    Bucket(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IcpSelectors {
    pub title:        Option<String>,
    pub industry:     Option<String>,
    pub company_size: Option<CompanySize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IcpBenchmarks {
    pub title:        BenchmarkTable,
    pub industry:     BenchmarkTable,
    pub company_size: Vec<CompanySizeBucket>,
}

/// The three ICP factors and their product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IcpFactors {
    pub title:        Lookup,
    pub industry:     Lookup,
    pub company_size: Lookup,
    pub combined:     f64,
}

impl IcpBenchmarks {
    pub fn company_size_lookup(&self, size: &CompanySize) -> Lookup {
        match size {
            CompanySize::Employees(n) => match self.company_size.iter().find(|b| b.contains(*n)) {
                Some(bucket) => Lookup::Exact {
                    key:        bucket.key.clone(),
                    multiplier: bucket.multiplier,
                },
                None => Lookup::Unknown,
            },
            CompanySize::Bucket(raw) => lookup_in(
                self.company_size.iter().map(|b| (b.key.as_str(), b.multiplier)),
                raw,
            ),
        }
    }

    /// Title × industry × company size. The factors multiply; they are
    /// never averaged.
    pub fn factors(&self, selectors: &IcpSelectors) -> IcpFactors {
        let title = selectors
            .title
            .as_deref()
            .map_or(Lookup::Unknown, |t| self.title.lookup(t));
        let industry = selectors
            .industry
            .as_deref()
            .map_or(Lookup::Unknown, |i| self.industry.lookup(i));
        let company_size = selectors
            .company_size
            .as_ref()
            .map_or(Lookup::Unknown, |s| self.company_size_lookup(s));

        let combined = title.multiplier() * industry.multiplier() * company_size.multiplier();
        IcpFactors { title, industry, company_size, combined }
    }
}

// ── Channel synergy ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynergyEntry {
    pub name:       String,
    pub channels:   Vec<Channel>,
    /// Restricts the entry to one signal tier ("full stack with intent").
    #[serde(default)]
    pub tier:       Option<SignalWarmthTier>,
    pub multiplier: f64,
}

impl SynergyEntry {
    fn channel_set(&self) -> BTreeSet<Channel> {
        self.channels.iter().copied().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynergySelection {
    /// Name of the matched combination; `None` when composed from singles.
    pub name:       Option<String>,
    pub multiplier: f64,
    pub exact:      bool,
}

impl SynergySelection {
    pub fn neutral() -> Self {
        Self { name: None, multiplier: NEUTRAL_MULTIPLIER, exact: false }
    }
}

// ── Budget tiers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLevel {
    Starter,
    Growth,
    Scale,
    Enterprise,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetTier {
    pub level:              BudgetLevel,
    pub label:              String,
    pub min_monthly_budget: Money,
    /// Service fee charged on top of infrastructure and media spend.
    pub monthly_retainer:   Money,
}

// ── Currencies ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyRate {
    pub code:      CurrencyCode,
    pub symbol:    String,
    /// Units of this currency per one unit of the base currency.
    pub rate:      f64,
    pub rate_date: NaiveDate,
}

/// Static exchange table. Rates are supplied, never fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyTable {
    pub base:  CurrencyCode,
    pub rates: Vec<CurrencyRate>,
}

impl CurrencyTable {
    pub fn get(&self, code: CurrencyCode) -> Option<&CurrencyRate> {
        self.rates.iter().find(|r| r.code == code)
    }

    /// Convert a base-currency amount. `None` when `to` is not in the table.
    pub fn convert(&self, amount: Money, to: CurrencyCode) -> Option<Money> {
        self.get(to).map(|r| amount * r.rate)
    }
}

// ── Knowledge base ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct SignalTiersFile {
    tiers: Vec<TierRates>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChannelSynergyFile {
    combinations: Vec<SynergyEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct BudgetTiersFile {
    tiers: Vec<BudgetTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBase {
    pub tiers:          Vec<TierRates>,
    pub icp:            IcpBenchmarks,
    pub synergy:        Vec<SynergyEntry>,
    pub budget_tiers:   Vec<BudgetTier>,
    pub currencies:     CurrencyTable,
    pub infrastructure: InfrastructurePricing,
    pub scenarios:      ScenarioSettings,
    pub volume_rules:   VolumeRules,
}

fn read_json<T: DeserializeOwned>(data_dir: &str, file: &str) -> anyhow::Result<T> {
    let path = format!("{data_dir}/{file}");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::InvalidKnowledgeBase(msg.into())
}

fn check_multiplier(table: &str, key: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{table} multiplier for '{key}' must be positive, got {value}")))
    }
}

impl KnowledgeBase {
    /// Load from the data/ directory and validate.
    /// In tests, use KnowledgeBase::builtin().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let kb = Self::read_tables(data_dir)?;
        kb.validate()?;
        Ok(kb)
    }

    /// Read every table file without validating the result.
    pub(crate) fn read_tables(data_dir: &str) -> anyhow::Result<Self> {
        let tiers: SignalTiersFile = read_json(data_dir, "signal_tiers.json")?;
        let icp: IcpBenchmarks = read_json(data_dir, "icp_benchmarks.json")?;
        let synergy: ChannelSynergyFile = read_json(data_dir, "channel_synergy.json")?;
        let budget: BudgetTiersFile = read_json(data_dir, "budget_tiers.json")?;
        let currencies: CurrencyTable = read_json(data_dir, "currencies.json")?;
        let infrastructure: InfrastructurePricing = read_json(data_dir, "infrastructure.json")?;
        let scenarios: ScenarioSettings = read_json(data_dir, "scenarios.json")?;
        let volume_rules: VolumeRules = read_json(data_dir, "volume_rules.json")?;

        let kb = Self {
            tiers: tiers.tiers,
            icp,
            synergy: synergy.combinations,
            budget_tiers: budget.tiers,
            currencies,
            infrastructure,
            scenarios,
            volume_rules,
        };

        log::info!(
            "knowledge_base: loaded {} tiers, {} industries, {} synergy combinations from {data_dir}",
            kb.tiers.len(),
            kb.icp.industry.len(),
            kb.synergy.len(),
        );
        Ok(kb)
    }

    /// Hardcoded defaults. Identical to the tables shipped under data/.
    pub fn builtin() -> Self {
        let tier = |tier: SignalWarmthTier, label: &str, email, social, content, ads| TierRates {
            tier,
            label: label.into(),
            reply_rates: ChannelRates { email, social, content, ads },
        };
        let tiers = vec![
            tier(SignalWarmthTier::Cold,        "Cold outbound",         0.02, 0.05, 0.005, 0.010),
            tier(SignalWarmthTier::Targeted,    "Targeted list",         0.05, 0.10, 0.010, 0.020),
            tier(SignalWarmthTier::IntentBased, "Intent-based signals",  0.14, 0.18, 0.020, 0.035),
            tier(SignalWarmthTier::Inbound,     "Inbound interest",      0.30, 0.35, 0.050, 0.060),
        ];

        let icp = IcpBenchmarks {
            title: BenchmarkTable::from_pairs(&[
                ("c_level", 0.70),
                ("founder", 0.90),
                ("vp", 0.85),
                ("head_of", 1.05),
                ("director", 1.10),
                ("manager", 1.20),
                ("individual_contributor", 0.80),
            ]),
            industry: BenchmarkTable::from_pairs(&[
                ("saas", 1.15),
                ("software", 1.10),
                ("fintech", 1.00),
                ("financial_services", 0.85),
                ("healthcare", 0.80),
                ("manufacturing", 0.90),
                ("ecommerce", 1.05),
                ("professional_services", 1.00),
                ("marketing_agency", 1.10),
                ("real_estate", 0.90),
                ("education", 0.85),
                ("government", 0.60),
            ]),
            company_size: vec![
                size_bucket("startup", 1, Some(10), 1.20),
                size_bucket("small_business", 11, Some(50), 1.15),
                size_bucket("mid_market", 51, Some(500), 1.00),
                size_bucket("upper_mid_market", 501, Some(2_000), 0.85),
                size_bucket("enterprise", 2_001, None, 0.70),
            ],
        };

        use Channel::*;
        let combo = |name: &str, channels: &[Channel], tier, multiplier| SynergyEntry {
            name: name.into(),
            channels: channels.to_vec(),
            tier,
            multiplier,
        };
        let synergy = vec![
            combo("email_only", &[Email], None, 1.00),
            combo("social_only", &[Social], None, 1.00),
            combo("content_only", &[Content], None, 1.00),
            combo("ads_only", &[Ads], None, 1.00),
            combo("email_social", &[Email, Social], None, 1.25),
            combo("email_content", &[Email, Content], None, 1.10),
            combo("social_content", &[Social, Content], None, 1.15),
            combo("outbound_with_content", &[Email, Social, Content], None, 1.35),
            combo("full_stack", &[Email, Social, Content, Ads], None, 1.40),
            combo("email_social_with_intent", &[Email, Social], Some(SignalWarmthTier::IntentBased), 1.40),
            combo("full_stack_with_intent", &[Email, Social, Content, Ads], Some(SignalWarmthTier::IntentBased), 1.60),
        ];

        let budget_tiers = vec![
            BudgetTier { level: BudgetLevel::Starter,    label: "Starter".into(),    min_monthly_budget: 0.0,      monthly_retainer: 1_500.0 },
            BudgetTier { level: BudgetLevel::Growth,     label: "Growth".into(),     min_monthly_budget: 3_000.0,  monthly_retainer: 3_500.0 },
            BudgetTier { level: BudgetLevel::Scale,      label: "Scale".into(),      min_monthly_budget: 8_000.0,  monthly_retainer: 6_000.0 },
            BudgetTier { level: BudgetLevel::Enterprise, label: "Enterprise".into(), min_monthly_budget: 20_000.0, monthly_retainer: 12_000.0 },
        ];

        let rate_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or(NaiveDate::MIN);
        let currency = |code, symbol: &str, rate| CurrencyRate { code, symbol: symbol.into(), rate, rate_date };
        let currencies = CurrencyTable {
            base: CurrencyCode::Usd,
            rates: vec![
                currency(CurrencyCode::Usd, "$", 1.00),
                currency(CurrencyCode::Eur, "€", 0.92),
                currency(CurrencyCode::Gbp, "£", 0.79),
                currency(CurrencyCode::Cad, "C$", 1.36),
                currency(CurrencyCode::Aud, "A$", 1.52),
            ],
        };

        Self {
            tiers,
            icp,
            synergy,
            budget_tiers,
            currencies,
            infrastructure: InfrastructurePricing::default(),
            scenarios: ScenarioSettings::default(),
            volume_rules: VolumeRules::default(),
        }
    }

    pub fn tier_rates(&self, tier: SignalWarmthTier) -> Option<&TierRates> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    /// Reply rates for a caller-supplied tier id. Unknown ids resolve to
    /// zero rates and no tier.
    pub fn reply_rates_for(&self, tier_id: &str) -> (Option<SignalWarmthTier>, ChannelRates) {
        let Some(tier) = SignalWarmthTier::from_id(tier_id) else {
            log::warn!("knowledge_base: unknown signal tier '{tier_id}', reply rates fall back to 0");
            return (None, ChannelRates::ZERO);
        };
        match self.tier_rates(tier) {
            Some(rates) => (Some(tier), rates.reply_rates),
            None => {
                log::warn!("knowledge_base: tier '{}' missing from table", tier.id());
                (Some(tier), ChannelRates::ZERO)
            }
        }
    }

    /// Synergy lift for the exact active channel set.
    ///
    /// An entry whose channel set equals `active` wins, preferring one
    /// restricted to `tier` over a tier-agnostic one. Otherwise the
    /// single-channel multipliers of each active channel are multiplied.
    pub fn synergy_for(
        &self,
        active: &BTreeSet<Channel>,
        tier: Option<SignalWarmthTier>,
    ) -> SynergySelection {
        if active.is_empty() {
            return SynergySelection::neutral();
        }

        let exact: Vec<&SynergyEntry> = self
            .synergy
            .iter()
            .filter(|e| e.channel_set() == *active)
            .collect();
        let tiered = tier.and_then(|t| exact.iter().find(|e| e.tier == Some(t)));
        let generic = exact.iter().find(|e| e.tier.is_none());

        if let Some(entry) = tiered.or(generic) {
            return SynergySelection {
                name:       Some(entry.name.clone()),
                multiplier: entry.multiplier,
                exact:      true,
            };
        }

        let multiplier = active
            .iter()
            .map(|c| self.single_channel_multiplier(*c))
            .product();
        log::debug!(
            "knowledge_base: no synergy entry for {:?}, composed {multiplier:.3} from singles",
            active
        );
        SynergySelection { name: None, multiplier, exact: false }
    }

    fn single_channel_multiplier(&self, channel: Channel) -> f64 {
        self.synergy
            .iter()
            .find(|e| e.tier.is_none() && e.channels.len() == 1 && e.channels[0] == channel)
            .map_or(NEUTRAL_MULTIPLIER, |e| e.multiplier)
    }

    pub fn budget_tier(&self, level: BudgetLevel) -> Option<&BudgetTier> {
        self.budget_tiers.iter().find(|t| t.level == level)
    }

    /// Highest tier whose floor the budget reaches; the lowest tier when
    /// the budget is below every floor.
    pub fn budget_tier_for_amount(&self, monthly_budget: Money) -> Option<&BudgetTier> {
        let amount = non_negative(monthly_budget);
        self.budget_tiers
            .iter()
            .filter(|t| t.min_monthly_budget <= amount)
            .max_by(|a, b| a.min_monthly_budget.total_cmp(&b.min_monthly_budget))
            .or_else(|| {
                self.budget_tiers
                    .iter()
                    .min_by(|a, b| a.min_monthly_budget.total_cmp(&b.min_monthly_budget))
            })
    }

    pub fn validate(&self) -> EngineResult<()> {
        let mut previous: Option<&TierRates> = None;
        for tier in SignalWarmthTier::ALL {
            let current = self
                .tier_rates(tier)
                .ok_or_else(|| invalid(format!("missing signal tier '{}'", tier.id())))?;
            for channel in Channel::ALL {
                let rate = current.reply_rates.for_channel(channel);
                if !(rate > 0.0 && rate <= 1.0) {
                    return Err(invalid(format!(
                        "tier '{}' {} reply rate must be in (0, 1], got {rate}",
                        tier.id(),
                        channel.name()
                    )));
                }
                if let Some(prev) = previous {
                    if rate <= prev.reply_rates.for_channel(channel) {
                        return Err(invalid(format!(
                            "tier '{}' does not dominate '{}' on {}",
                            tier.id(),
                            prev.tier.id(),
                            channel.name()
                        )));
                    }
                }
            }
            previous = Some(current);
        }

        for (key, value) in self.icp.title.iter() {
            check_multiplier("title", key, value)?;
        }
        for (key, value) in self.icp.industry.iter() {
            check_multiplier("industry", key, value)?;
        }
        for bucket in &self.icp.company_size {
            if bucket.key.is_empty() || bucket.key != normalize_key(&bucket.key) {
                return Err(invalid(format!(
                    "company size key '{}' is not normalized (expected '{}')",
                    bucket.key,
                    normalize_key(&bucket.key)
                )));
            }
            check_multiplier("company size", &bucket.key, bucket.multiplier)?;
        }
        for entry in &self.synergy {
            if entry.channels.is_empty() {
                return Err(invalid(format!("synergy entry '{}' has no channels", entry.name)));
            }
            check_multiplier("synergy", &entry.name, entry.multiplier)?;
        }

        for tier in &self.budget_tiers {
            if !(tier.min_monthly_budget >= 0.0 && tier.monthly_retainer >= 0.0) {
                return Err(invalid(format!("budget tier '{}' has a negative amount", tier.label)));
            }
        }

        if self.currencies.get(self.currencies.base).is_none() {
            return Err(invalid("base currency missing from currency table"));
        }
        for rate in &self.currencies.rates {
            if !(rate.rate.is_finite() && rate.rate > 0.0) {
                return Err(invalid(format!("currency rate for {:?} must be positive", rate.code)));
            }
        }

        self.infrastructure.validate().map_err(invalid)?;
        self.scenarios.validate().map_err(invalid)?;
        self.volume_rules.validate().map_err(invalid)?;
        Ok(())
    }
}

fn size_bucket(key: &str, min_employees: u32, max_employees: Option<u32>, multiplier: f64) -> CompanySizeBucket {
    CompanySizeBucket { key: normalize_key(key), min_employees, max_employees, multiplier }
}
