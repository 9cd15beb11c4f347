//! Plan-level alerts shown with the final analysis.

use plan_econ::pricing::CRITICAL_MARGIN_PCT;
use plan_econ::Metrics;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

pub const HIGH_INVESTMENT: Decimal = dec!(50000);
pub const HIGH_FIXED_COSTS: Decimal = dec!(8000);
pub const HIGH_AVERAGE_COST: Decimal = dec!(15);
pub const HEALTHY_MARGIN_PCT: Decimal = dec!(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Advisory {
    pub severity: Severity,
    pub message: String,
}

impl Advisory {
    fn new(severity: Severity, message: String) -> Self {
        Self { severity, message }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

/// Alerts for a computed plan, most severe first.
pub fn advisories(m: &Metrics) -> Vec<Advisory> {
    let mut out = Vec::new();
    if m.funding_gap < Decimal::ZERO {
        out.push(Advisory::new(
            Severity::Critical,
            format!("funding falls short of expenses by {}", -m.funding_gap),
        ));
    }
    if m.total_expenses > HIGH_INVESTMENT {
        out.push(Advisory::new(
            Severity::Warning,
            format!("initial investment of {} is high; consider phasing it", m.total_expenses),
        ));
    }
    if m.total_fixed_cost > HIGH_FIXED_COSTS {
        out.push(Advisory::new(
            Severity::Warning,
            format!("monthly fixed costs of {} are high", m.total_fixed_cost.round_dp(2)),
        ));
    }
    if let Some(avg) = m.average_cost.filter(|c| *c > HIGH_AVERAGE_COST) {
        out.push(Advisory::new(
            Severity::Warning,
            format!("average product cost of {} is high", avg.round_dp(2)),
        ));
    }

    if m.pricing.priced_count > 0 {
        let margin = m.pricing.average_margin_pct.round_dp(2);
        if margin < CRITICAL_MARGIN_PCT {
            out.push(Advisory::new(
                Severity::Warning,
                format!("average margin of {margin}% is low; review prices or costs"),
            ));
        } else if margin >= HEALTHY_MARGIN_PCT {
            out.push(Advisory::new(
                Severity::Info,
                format!("average margin of {margin}% is healthy"),
            ));
        }
    }

    if !m.pricing.critical.is_empty() {
        let names: Vec<&str> = m
            .products
            .iter()
            .filter(|p| m.pricing.critical.contains(&p.id))
            .map(|p| p.name.as_str())
            .collect();
        out.push(Advisory::new(
            Severity::Critical,
            format!(
                "{} product(s) below a {}% margin: {}",
                names.len(),
                CRITICAL_MARGIN_PCT,
                names.join(", ")
            ),
        ));
    }

    out.sort_by(|a, b| b.severity.cmp(&a.severity));
    out
}
