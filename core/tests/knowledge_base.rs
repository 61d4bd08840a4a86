//! Knowledge base loading, validation and lookup tests.

use std::collections::BTreeSet;

use gtm_core::{
    channel::Channel,
    knowledge_base::{
        BudgetLevel, CompanySize, CurrencyCode, IcpBenchmarks, IcpSelectors, KnowledgeBase,
        Lookup, SignalWarmthTier,
    },
    EngineError,
};

const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

fn channels(list: &[Channel]) -> BTreeSet<Channel> {
    list.iter().copied().collect()
}

// ── Loading ──────────────────────────────────────────────────────────────────

#[test]
fn builtin_tables_validate() {
    KnowledgeBase::builtin().validate().expect("builtin knowledge base must validate");
}

/// The shipped data/ directory and the built-in tables describe the same
/// knowledge base.
#[test]
fn data_directory_matches_builtin() {
    let _ = env_logger::builder().is_test(true).try_init();
    let loaded = KnowledgeBase::load(DATA_DIR).expect("data/ must load");
    assert_eq!(loaded, KnowledgeBase::builtin());
}

#[test]
fn missing_data_directory_names_the_file() {
    let err = KnowledgeBase::load("/nonexistent/gtm-data").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Cannot read"), "unexpected error: {msg}");
    assert!(msg.contains("signal_tiers.json"), "unexpected error: {msg}");
}

#[test]
fn warmer_tier_must_dominate_colder_tier() {
    let mut kb = KnowledgeBase::builtin();
    let targeted = kb
        .tiers
        .iter_mut()
        .find(|t| t.tier == SignalWarmthTier::Targeted)
        .expect("targeted tier present");
    targeted.reply_rates.email = 0.01;

    let err = kb.validate().unwrap_err();
    assert!(matches!(err, EngineError::InvalidKnowledgeBase(_)));
    assert!(err.to_string().contains("does not dominate"), "got: {err}");
}

#[test]
fn non_positive_multiplier_is_rejected() {
    let mut kb = KnowledgeBase::builtin();
    kb.synergy[0].multiplier = 0.0;
    assert!(kb.validate().is_err());
}

#[test]
fn missing_tier_is_rejected() {
    let mut kb = KnowledgeBase::builtin();
    kb.tiers.retain(|t| t.tier != SignalWarmthTier::Inbound);
    assert!(kb.validate().is_err());
}

// ── Tier resolution ──────────────────────────────────────────────────────────

#[test]
fn tier_ids_resolve_regardless_of_spelling() {
    let kb = KnowledgeBase::builtin();
    for raw in ["intent-based", "Intent Based", "INTENT_BASED"] {
        let (tier, rates) = kb.reply_rates_for(raw);
        assert_eq!(tier, Some(SignalWarmthTier::IntentBased), "{raw}");
        assert_eq!(rates.email, 0.14);
    }
}

#[test]
fn tier_rates_increase_with_warmth() {
    let kb = KnowledgeBase::builtin();
    for channel in Channel::ALL {
        let rates: Vec<f64> = SignalWarmthTier::ALL
            .iter()
            .map(|t| kb.reply_rates_for(t.id()).1.for_channel(channel))
            .collect();
        assert!(rates.windows(2).all(|w| w[0] < w[1]), "{channel:?}: {rates:?}");
    }
}

// ── ICP lookups ──────────────────────────────────────────────────────────────

#[test]
fn title_lookup_matches_whole_segments() {
    let kb = KnowledgeBase::builtin();

    let vp = kb.icp.title.lookup("VP of Sales");
    assert_eq!(vp, Lookup::Partial { key: "vp".into(), multiplier: 0.85 });

    let founder = kb.icp.title.lookup("Founder");
    assert!(matches!(founder, Lookup::Exact { .. }));

    // "mvp" must not match the "vp" key
    assert_eq!(kb.icp.title.lookup("MVP Owner"), Lookup::Unknown);
}

#[test]
fn unknown_selectors_are_neutral() {
    let kb = KnowledgeBase::builtin();
    let f = kb.icp.factors(&IcpSelectors {
        title:        Some("Chief Vibes Officer".into()),
        industry:     Some("".into()),
        company_size: Some(CompanySize::Bucket("galactic".into())),
    });

    assert!(!f.title.is_known());
    assert!(!f.industry.is_known());
    assert!(!f.company_size.is_known());
    assert_eq!(f.combined, 1.0);
}

#[test]
fn company_size_resolves_by_name_or_headcount() {
    let kb = KnowledgeBase::builtin();

    let by_name = kb.icp.company_size_lookup(&CompanySize::Bucket("Mid-Market".into()));
    assert_eq!(by_name, Lookup::Exact { key: "mid_market".into(), multiplier: 1.0 });

    let cases = [(1, 1.2), (10, 1.2), (11, 1.15), (120, 1.0), (2_000, 0.85), (50_000, 0.7)];
    for (employees, expected) in cases {
        let l = kb.icp.company_size_lookup(&CompanySize::Employees(employees));
        assert_eq!(l.multiplier(), expected, "{employees} employees");
    }

    let none = kb.icp.company_size_lookup(&CompanySize::Employees(0));
    assert_eq!(none, Lookup::Unknown);
}

/// Bucket keys in a data file may use any spelling the lookup accepts.
#[test]
fn company_size_bucket_keys_are_normalized_on_load() {
    let raw = r#"{
        "title": {},
        "industry": {},
        "company_size": [
            { "key": "Mid-Market", "min_employees": 51, "max_employees": 500, "multiplier": 1.0 }
        ]
    }"#;
    let icp: IcpBenchmarks = serde_json::from_str(raw).expect("icp benchmarks");

    assert_eq!(icp.company_size[0].key, "mid_market");
    let l = icp.company_size_lookup(&CompanySize::Bucket("mid market".into()));
    assert_eq!(l, Lookup::Exact { key: "mid_market".into(), multiplier: 1.0 });
}

#[test]
fn hand_built_bucket_key_must_be_normalized() {
    let mut kb = KnowledgeBase::builtin();
    kb.icp.company_size[2].key = "Mid-Market".into();

    let err = kb.validate().unwrap_err();
    assert!(err.to_string().contains("not normalized"), "got: {err}");
}

#[test]
fn company_size_deserializes_from_number_or_string() {
    let s: IcpSelectors = serde_json::from_str(r#"{"company_size": 42}"#).expect("number");
    assert_eq!(s.company_size, Some(CompanySize::Employees(42)));

    let s: IcpSelectors = serde_json::from_str(r#"{"company_size": "enterprise"}"#).expect("string");
    assert_eq!(s.company_size, Some(CompanySize::Bucket("enterprise".into())));
}

// ── Synergy ──────────────────────────────────────────────────────────────────

#[test]
fn exact_channel_set_selects_named_combination() {
    let kb = KnowledgeBase::builtin();
    let s = kb.synergy_for(&channels(&[Channel::Email, Channel::Social, Channel::Content]), None);

    assert_eq!(s.name.as_deref(), Some("outbound_with_content"));
    assert_eq!(s.multiplier, 1.35);
    assert!(s.exact);
}

#[test]
fn tier_specific_combination_wins_for_its_tier_only() {
    let kb = KnowledgeBase::builtin();
    let all = channels(&Channel::ALL);

    let intent = kb.synergy_for(&all, Some(SignalWarmthTier::IntentBased));
    assert_eq!(intent.name.as_deref(), Some("full_stack_with_intent"));
    assert_eq!(intent.multiplier, 1.6);

    let cold = kb.synergy_for(&all, Some(SignalWarmthTier::Cold));
    assert_eq!(cold.name.as_deref(), Some("full_stack"));
    assert_eq!(cold.multiplier, 1.4);
}

/// No entry for email + ads: compose from the single-channel lifts.
#[test]
fn missing_combination_falls_back_to_singles() {
    let kb = KnowledgeBase::builtin();
    let s = kb.synergy_for(&channels(&[Channel::Email, Channel::Ads]), None);

    assert!(!s.exact);
    assert_eq!(s.name, None);
    assert_eq!(s.multiplier, 1.0);
}

#[test]
fn empty_channel_set_is_neutral() {
    let kb = KnowledgeBase::builtin();
    let s = kb.synergy_for(&BTreeSet::new(), Some(SignalWarmthTier::Inbound));
    assert_eq!(s.multiplier, 1.0);
    assert!(!s.exact);
}

// ── Budget tiers & currencies ────────────────────────────────────────────────

#[test]
fn budget_amount_maps_to_highest_reached_tier() {
    let kb = KnowledgeBase::builtin();
    let level = |amount: f64| kb.budget_tier_for_amount(amount).map(|t| t.level);

    assert_eq!(level(0.0), Some(BudgetLevel::Starter));
    assert_eq!(level(-10.0), Some(BudgetLevel::Starter));
    assert_eq!(level(2_999.0), Some(BudgetLevel::Starter));
    assert_eq!(level(3_000.0), Some(BudgetLevel::Growth));
    assert_eq!(level(5_000.0), Some(BudgetLevel::Growth));
    assert_eq!(level(50_000.0), Some(BudgetLevel::Enterprise));
}

#[test]
fn budget_level_lookup_returns_retainer() {
    let kb = KnowledgeBase::builtin();
    let scale = kb.budget_tier(BudgetLevel::Scale).expect("scale tier");
    assert_eq!(scale.monthly_retainer, 6_000.0);
}

#[test]
fn currency_conversion_uses_static_rates() {
    let kb = KnowledgeBase::builtin();

    assert_eq!(kb.currencies.convert(1_000.0, CurrencyCode::Eur), Some(920.0));
    assert_eq!(kb.currencies.convert(1_000.0, CurrencyCode::Usd), Some(1_000.0));
    assert_eq!(kb.currencies.get(CurrencyCode::Gbp).map(|r| r.symbol.as_str()), Some("£"));

    let mut kb = kb;
    kb.currencies.rates.retain(|r| r.code != CurrencyCode::Aud);
    assert_eq!(kb.currencies.convert(1_000.0, CurrencyCode::Aud), None);
}
