//! ROI timeline builder tests.

use chrono::NaiveDate;
use gtm_core::{
    roi::{build_roi_timeline, CostSchedule, RoiTimeline, RoiTimelineBuilder},
    EngineError,
};

fn assert_break_even_is_first(t: &RoiTimeline) {
    match t.break_even_period_index {
        Some(k) => {
            let p = &t.points[k];
            assert!(p.cumulative_revenue >= p.cumulative_investment, "period {k} is not break-even");
            for earlier in &t.points[..k] {
                assert!(
                    earlier.cumulative_revenue < earlier.cumulative_investment,
                    "period {} already broke even before {k}",
                    earlier.period
                );
            }
        }
        None => {
            for p in &t.points {
                assert!(p.cumulative_revenue < p.cumulative_investment, "missed break-even at {}", p.period);
            }
        }
    }
}

/// Revenue of 500/month from period 1 against 300/month of cost:
/// cumulative 1000 ≥ 900 at period 2.
#[test]
fn break_even_is_first_period_revenue_covers_cost() {
    let revenue = [0.0, 500.0, 500.0, 500.0, 500.0, 500.0];
    let t = build_roi_timeline(&revenue, &CostSchedule::Constant(300.0), 6).expect("timeline");

    assert_eq!(t.points.len(), 6);
    assert_eq!(t.break_even_period_index, Some(2));
    assert_eq!(t.break_even_point().map(|p| p.cumulative_revenue), Some(1_000.0));
    assert_eq!(t.total_revenue, 2_500.0);
    assert_eq!(t.total_investment, 1_800.0);
    assert_eq!(t.net_return, 700.0);
    let roi = t.roi_percent.expect("roi defined when investment > 0");
    assert!((roi - 700.0 / 1_800.0 * 100.0).abs() < 1e-9, "roi={roi}");
    assert_break_even_is_first(&t);
}

#[test]
fn never_breaking_even_reports_none() {
    let revenue = [0.0, 100.0, 100.0, 100.0];
    let t = build_roi_timeline(&revenue, &CostSchedule::Constant(1_000.0), 4).expect("timeline");

    assert_eq!(t.break_even_period_index, None);
    assert!(t.break_even_point().is_none());
    assert!(t.net_return < 0.0);
    assert_break_even_is_first(&t);
}

/// Zero cost and zero revenue: 0 ≥ 0 holds at the first period.
#[test]
fn zero_cost_breaks_even_immediately() {
    let t = build_roi_timeline(&[0.0; 3], &CostSchedule::Constant(0.0), 3).expect("timeline");

    assert_eq!(t.break_even_period_index, Some(0));
    assert_eq!(t.roi_percent, None, "roi undefined without investment");
}

#[test]
fn cumulative_totals_never_decrease() {
    let revenue = [0.0, -250.0, 400.0, f64::NAN, 900.0];
    let cost = CostSchedule::PerPeriod(vec![500.0, -100.0, 200.0, 200.0, f64::INFINITY]);
    let t = build_roi_timeline(&revenue, &cost, 5).expect("timeline");

    for w in t.points.windows(2) {
        assert!(w[1].cumulative_revenue >= w[0].cumulative_revenue);
        assert!(w[1].cumulative_investment >= w[0].cumulative_investment);
    }
    assert_eq!(t.points[1].revenue, 0.0, "negative revenue clamps to zero");
    assert_eq!(t.points[1].investment, 0.0, "negative cost clamps to zero");
    assert_eq!(t.points[3].revenue, 0.0);
    assert_eq!(t.points[4].investment, 0.0);
    assert_break_even_is_first(&t);
}

#[test]
fn per_period_costs_are_applied_in_order() {
    let revenue = [0.0, 0.0, 3_000.0];
    let cost = CostSchedule::PerPeriod(vec![2_000.0, 500.0, 500.0, 99_999.0]);
    let t = build_roi_timeline(&revenue, &cost, 3).expect("timeline");

    let investments: Vec<f64> = t.points.iter().map(|p| p.investment).collect();
    assert_eq!(investments, vec![2_000.0, 500.0, 500.0]);
    assert_eq!(t.break_even_period_index, Some(2));
}

/// Only the first `period_count` entries of a longer series are used.
#[test]
fn longer_revenue_series_is_truncated() {
    let revenue = [0.0, 50.0, 50.0, 10_000.0];
    let t = build_roi_timeline(&revenue, &CostSchedule::Constant(40.0), 3).expect("timeline");

    assert_eq!(t.points.len(), 3);
    assert_eq!(t.total_revenue, 100.0);
    assert_eq!(t.break_even_period_index, None);
}

#[test]
fn contract_violations_are_errors() {
    let err = build_roi_timeline(&[], &CostSchedule::Constant(1.0), 0).unwrap_err();
    assert!(matches!(err, EngineError::InvalidPeriodCount(0)));

    let err = build_roi_timeline(&[1.0, 2.0], &CostSchedule::Constant(1.0), 3).unwrap_err();
    assert!(matches!(err, EngineError::SeriesTooShort { expected: 3, actual: 2 }));

    let err = build_roi_timeline(&[1.0; 3], &CostSchedule::PerPeriod(vec![1.0]), 3).unwrap_err();
    assert!(matches!(err, EngineError::CostScheduleTooShort { expected: 3, actual: 1 }));
}

#[test]
fn default_labels_count_months_from_one() {
    let t = build_roi_timeline(&[0.0; 2], &CostSchedule::Constant(1.0), 2).expect("timeline");
    let labels: Vec<&str> = t.points.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["Month 1", "Month 2"]);
}

#[test]
fn calendar_labels_roll_over_the_year() {
    let start = NaiveDate::from_ymd_opt(2027, 11, 1).expect("valid date");
    let t = RoiTimelineBuilder::new()
        .starting(start)
        .build(&[0.0; 3], &CostSchedule::Constant(1.0), 3)
        .expect("timeline");

    let labels: Vec<&str> = t.points.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["Nov 2027", "Dec 2027", "Jan 2028"]);
    assert_eq!(t.points[2].period, 2);
}

/// The first-break-even property over a handful of shapes.
#[test]
fn break_even_property_holds_for_varied_series() {
    let shapes: [(&[f64], f64); 5] = [
        (&[0.0, 0.0, 0.0, 0.0, 10_000.0, 0.0], 1_500.0),
        (&[5_000.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1_000.0),
        (&[0.0, 200.0, 400.0, 800.0, 1_600.0, 3_200.0], 900.0),
        (&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0], 1.0),
        (&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.01),
    ];
    for (revenue, cost) in shapes {
        let t = build_roi_timeline(revenue, &CostSchedule::Constant(cost), revenue.len())
            .expect("timeline");
        assert_break_even_is_first(&t);
    }
}
