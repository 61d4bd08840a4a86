//! Currency display for the summary output. Amounts arrive in the base
//! currency and are converted here, at the edge.

use gtm_core::{knowledge_base::CurrencyRate, types::Money};

/// Symbol used when no currency table entry is available.
const FALLBACK_SYMBOL: &str = "$";

/// `$1.2M`, `€15.3K`, `-£250`.
pub fn format_money(amount: Money, symbol: &str) -> String {
    if !amount.is_finite() {
        return "n/a".into();
    }
    let abs = amount.abs();
    // Thresholds sit where rounding would otherwise print "1000K".
    let body = if abs >= 999_950.0 {
        format!("{}M", one_decimal(abs / 1_000_000.0))
    } else if abs >= 999.5 {
        format!("{}K", one_decimal(abs / 1_000.0))
    } else {
        format!("{abs:.0}")
    };
    let sign = if amount < 0.0 && abs >= 0.5 { "-" } else { "" };
    format!("{sign}{symbol}{body}")
}

/// Convert a base-currency amount with `rate` and format it.
pub fn display_money(amount: Money, rate: Option<&CurrencyRate>) -> String {
    match rate {
        Some(r) => format_money(amount * r.rate, &r.symbol),
        None => format_money(amount, FALLBACK_SYMBOL),
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.1}%"),
        _ => "n/a".into(),
    }
}

fn one_decimal(value: f64) -> String {
    let s = format!("{value:.1}");
    match s.strip_suffix(".0") {
        Some(whole) => whole.to_owned(),
        None => s,
    }
}
