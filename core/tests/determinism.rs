//! Same knowledge base, same request: the serialized plans must be
//! byte-identical. Any divergence is a blocker.

use gtm_core::{GtmEngine, GtmPlan, PlanRequest};

const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

fn load_request(name: &str) -> PlanRequest {
    let path = format!("{DATA_DIR}/plans/{name}.json");
    let raw = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {path}: {e}"));
    serde_json::from_str(&raw).unwrap_or_else(|e| panic!("parse {path}: {e}"))
}

fn plan_lines(engine: &GtmEngine, request: &PlanRequest) -> Vec<String> {
    let plan: GtmPlan = engine.plan(request).expect("plan");
    serde_json::to_string_pretty(&plan)
        .expect("serialize plan")
        .lines()
        .map(str::to_owned)
        .collect()
}

fn assert_identical(a: &[String], b: &[String]) {
    assert_eq!(
        a.len(), b.len(),
        "Plan output lengths differ: {} vs {}",
        a.len(), b.len()
    );
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert_eq!(x, y, "Plan output diverged at line {i}:\n  A: {x}\n  B: {y}");
    }
}

#[test]
fn same_request_produces_identical_plans() {
    let engine_a = GtmEngine::builtin();
    let engine_b = GtmEngine::builtin();

    for name in ["intent_full_stack", "email_only"] {
        let request = load_request(name);
        assert_identical(&plan_lines(&engine_a, &request), &plan_lines(&engine_b, &request));
    }
}

#[test]
fn repeated_calls_on_one_engine_do_not_drift() {
    let engine = GtmEngine::builtin();
    let request = load_request("intent_full_stack");

    let first = plan_lines(&engine, &request);
    for _ in 0..5 {
        assert_identical(&first, &plan_lines(&engine, &request));
    }
}

/// Loading data/ from disk must not change a single number.
#[test]
fn loaded_and_builtin_knowledge_bases_agree() {
    let loaded = GtmEngine::from_data_dir(DATA_DIR).expect("load data/");
    let builtin = GtmEngine::builtin();

    let request = load_request("intent_full_stack");
    assert_identical(&plan_lines(&loaded, &request), &plan_lines(&builtin, &request));
}

#[test]
fn different_requests_produce_different_plans() {
    let engine = GtmEngine::builtin();
    let a = plan_lines(&engine, &load_request("intent_full_stack"));
    let b = plan_lines(&engine, &load_request("email_only"));

    assert_ne!(a, b, "Different requests produced identical plans; the request is not being used");
}
