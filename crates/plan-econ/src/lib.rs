#![deny(warnings)]

//! Derived financial metrics for a business plan.
//!
//! This module provides pure functions over `plan_core` records for:
//! - Totals, funding split and loan amortization
//! - Payroll with the fixed statutory surcharge and per-product cost
//! - Break-even, multi-month cash flow and the viability score
//!
//! Pricing helpers live in [`pricing`]; the full snapshot is [`Metrics`].

use plan_core::{FixedCosts, Ingredient, Investment, Service, StaffRole};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod metrics;
pub mod pricing;

pub use metrics::{Metrics, ProductEconomics, ProjectedMonth};
pub use pricing::{
    markup_band, optimize_prices, price_impact, pricing_summary, recommended_price, MarkupBand,
    PriceImpact, PricingSummary, ViabilityLabel,
};

/// Statutory social-charge multiplier applied to base wages.
pub const STATUTORY_MULTIPLIER: Decimal = dec!(1.38);
/// Share of total funding treated as own capital.
pub const OWN_CAPITAL_SHARE: Decimal = dec!(0.6);
/// Share of total funding treated as a loan.
pub const LOAN_SHARE: Decimal = dec!(0.4);

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Amortization needs at least one period.
    #[error("loan term must be at least one month")]
    ZeroTerm,
    /// Interest rates must be non-negative.
    #[error("invalid interest rate: {0}")]
    InvalidRate(Decimal),
    /// Principal must be non-negative.
    #[error("invalid principal: {0}")]
    InvalidPrincipal(Decimal),
    /// Target margins are fractions in [0, 1).
    #[error("invalid target margin: {0}")]
    InvalidMargin(Decimal),
    /// Intermediate value left the representable range.
    #[error("arithmetic overflow")]
    Overflow,
    /// A record field is beyond the range the metrics support.
    #[error("{0} exceeds the supported maximum")]
    OutOfRange(String),
}

/// Sum that clamps at the `Decimal` bounds instead of panicking.
pub fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values.into_iter().fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Sum of every set-up expense.
pub fn total_expenses(inv: &Investment) -> Decimal {
    saturating_sum(inv.expenses.values().copied())
}

/// Sum of every funding source.
pub fn total_funding(inv: &Investment) -> Decimal {
    saturating_sum(inv.funding.values().copied())
}

/// Own capital / loan split of total funding.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FundingSplit {
    pub own_capital: Decimal,
    pub loans: Decimal,
}

/// Split `total_funding` 60 / 40 into own capital and loans.
///
/// Example:
/// let s = funding_split(Decimal::new(10_000, 0));
/// assert_eq!(s.loans, Decimal::new(4_000, 0));
pub fn funding_split(total_funding: Decimal) -> FundingSplit {
    FundingSplit {
        own_capital: total_funding * OWN_CAPITAL_SHARE,
        loans: total_funding * LOAN_SHARE,
    }
}

/// Level monthly payment amortizing `principal` over `months`.
///
/// Uses `P × r(1+r)^n / ((1+r)^n − 1)` with `r = annual_rate_pct / 100 / 12`
/// and no intermediate rounding. A zero rate degrades to `P / n`.
///
/// Example:
/// let p = monthly_loan_payment(Decimal::new(1200, 0), Decimal::ZERO, 12).unwrap();
/// assert_eq!(p, Decimal::new(100, 0));
pub fn monthly_loan_payment(
    principal: Decimal,
    annual_rate_pct: Decimal,
    months: u32,
) -> Result<Decimal, EconError> {
    if months == 0 {
        return Err(EconError::ZeroTerm);
    }
    if annual_rate_pct < Decimal::ZERO {
        return Err(EconError::InvalidRate(annual_rate_pct));
    }
    if principal < Decimal::ZERO {
        return Err(EconError::InvalidPrincipal(principal));
    }
    let n = Decimal::from(months);
    let r = annual_rate_pct / dec!(100) / dec!(12);
    if r.is_zero() {
        return Ok(principal / n);
    }
    let growth = (Decimal::ONE + r)
        .checked_powi(i64::from(months))
        .ok_or(EconError::Overflow)?;
    let denom = growth - Decimal::ONE;
    if denom.is_zero() {
        // rate too small to register at 28 digits
        return Ok(principal / n);
    }
    let factor = r
        .checked_mul(growth)
        .and_then(|num| num.checked_div(denom))
        .ok_or(EconError::Overflow)?;
    principal.checked_mul(factor).ok_or(EconError::Overflow)
}

/// Base payroll plus statutory charges.
///
/// Example:
/// assert_eq!(staff_real_cost(Decimal::new(500, 0)), Decimal::new(690, 0));
pub fn staff_real_cost(base: Decimal) -> Decimal {
    base.saturating_mul(STATUTORY_MULTIPLIER)
}

/// Hourly labor rate used for product costing, in USD.
pub fn hourly_rate(role: StaffRole) -> Decimal {
    match role {
        StaffRole::Cook => dec!(3.5),
        StaffRole::Waiter => dec!(2.5),
        StaffRole::Cashier => dec!(3.0),
        StaffRole::Cleaning => dec!(2.0),
    }
}

/// Labor share of one unit; no role means no labor cost.
pub fn labor_cost(labor_minutes: Decimal, labor_role: Option<StaffRole>) -> Decimal {
    match labor_role {
        Some(role) if labor_minutes > Decimal::ZERO => {
            (labor_minutes / dec!(60)).saturating_mul(hourly_rate(role))
        }
        _ => Decimal::ZERO,
    }
}

/// Unit cost: ingredient prices as entered plus labor.
///
/// Example:
/// // 4.50 of chicken + 30 min of cook time at 3.50/h
/// assert_eq!(product_cost(&ings, Decimal::new(30, 0), Some(StaffRole::Cook)), Decimal::new(625, 2));
pub fn product_cost(
    ingredients: &[Ingredient],
    labor_minutes: Decimal,
    labor_role: Option<StaffRole>,
) -> Decimal {
    let materials = saturating_sum(ingredients.iter().map(|i| i.purchase_price));
    materials.saturating_add(labor_cost(labor_minutes, labor_role))
}

/// Billed services; bundled utilities count as zero.
pub fn total_services(fc: &FixedCosts) -> Decimal {
    saturating_sum(Service::ALL.iter().filter_map(|s| fc.service_amount(*s)))
}

pub fn total_other_costs(fc: &FixedCosts) -> Decimal {
    saturating_sum(fc.other_costs.iter().copied())
}

/// Rent + payroll with statutory charges + services + other costs.
pub fn total_fixed_cost(fc: &FixedCosts) -> Decimal {
    saturating_sum([
        fc.rent,
        staff_real_cost(fc.base_payroll()),
        total_services(fc),
        total_other_costs(fc),
    ])
}

/// Break-even point for average price and cost.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakEven {
    pub contribution_margin: Decimal,
    pub units: Decimal,
    pub sales: Decimal,
}

impl BreakEven {
    /// Whole units needed to actually break even.
    pub fn units_ceil(&self) -> Decimal {
        self.units.ceil()
    }
}

/// Break-even units and sales. `None` unless `avg_price > avg_cost > 0`
/// and both results are representable.
///
/// Example:
/// let be = break_even(Decimal::new(2000, 0), Decimal::new(8, 0), Decimal::new(3, 0)).unwrap();
/// assert_eq!(be.units, Decimal::new(400, 0));
pub fn break_even(fixed_costs: Decimal, avg_price: Decimal, avg_cost: Decimal) -> Option<BreakEven> {
    if !(avg_cost > Decimal::ZERO && avg_price > avg_cost) {
        return None;
    }
    let contribution_margin = avg_price - avg_cost;
    let units = fixed_costs.checked_div(contribution_margin)?;
    Some(BreakEven {
        contribution_margin,
        units,
        sales: units.checked_mul(avg_price)?,
    })
}

/// How far `reference_units` sits above break-even, in percent (never negative).
pub fn margin_of_safety_pct(break_even_units: Decimal, reference_units: u32) -> Decimal {
    let reference = Decimal::from(reference_units);
    if reference_units == 0 || break_even_units >= reference {
        return Decimal::ZERO;
    }
    (reference.saturating_sub(break_even_units) / reference).saturating_mul(dec!(100))
}

/// One simulated month.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthResult {
    pub month: u32,
    pub units: u32,
    pub revenue: Decimal,
    pub variable_cost: Decimal,
    pub profit: Decimal,
    pub cumulative: Decimal,
}

/// When cumulative profit first covers the initial investment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Recovered in this month.
    Month(u32),
    /// Not recovered within the simulated horizon.
    Beyond(u32),
}

impl fmt::Display for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recovery::Month(m) => write!(f, "{m}"),
            Recovery::Beyond(h) => write!(f, "{h}+"),
        }
    }
}

/// Result of the cash-flow projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub months: Vec<MonthResult>,
    pub total_profit: Decimal,
    pub best_month: MonthResult,
    pub worst_month: MonthResult,
    pub recovery: Recovery,
}

/// Projected units in month `m`: 50 growing by 10 per month, capped at `u32::MAX`.
pub fn projected_units(month: u32) -> u32 {
    month.saturating_mul(10).saturating_add(50)
}

/// Simulate `months` (at least one) of trading at the average price and cost.
///
/// Best and worst months start from month 1, so an all-loss year still
/// reports a real best month.
pub fn cash_flow(
    fixed_costs: Decimal,
    avg_price: Decimal,
    avg_cost: Decimal,
    initial_investment: Decimal,
    months: u32,
) -> CashFlow {
    let horizon = months.max(1);
    let mut rows = Vec::with_capacity(horizon as usize);
    let mut cumulative = Decimal::ZERO;
    let mut recovery = None;
    for month in 1..=horizon {
        let units = projected_units(month);
        let u = Decimal::from(units);
        let revenue = u.saturating_mul(avg_price);
        let variable_cost = u.saturating_mul(avg_cost);
        let profit = revenue
            .saturating_sub(variable_cost)
            .saturating_sub(fixed_costs);
        cumulative = cumulative.saturating_add(profit);
        if recovery.is_none() && cumulative >= initial_investment {
            recovery = Some(Recovery::Month(month));
        }
        rows.push(MonthResult {
            month,
            units,
            revenue,
            variable_cost,
            profit,
            cumulative,
        });
    }
    let first = rows[0];
    let (best_month, worst_month) = rows.iter().skip(1).fold((first, first), |(b, w), r| {
        (
            if r.profit > b.profit { *r } else { b },
            if r.profit < w.profit { *r } else { w },
        )
    });
    CashFlow {
        total_profit: cumulative,
        best_month,
        worst_month,
        recovery: recovery.unwrap_or(Recovery::Beyond(horizon)),
        months: rows,
    }
}

/// Weighted 0..=100 score from average margin, break-even units and fixed costs.
///
/// Missing break-even (non-positive contribution margin) scores zero on
/// that component.
///
/// Example:
/// assert_eq!(viability_score(Decimal::new(35, 0), Some(Decimal::new(90, 0)), Decimal::new(1500, 0)), 100);
pub fn viability_score(
    avg_margin_pct: Decimal,
    break_even_units: Option<Decimal>,
    total_fixed_costs: Decimal,
) -> u8 {
    let margin_pts = if avg_margin_pct >= dec!(30) {
        40
    } else if avg_margin_pct >= dec!(20) {
        25
    } else if avg_margin_pct >= dec!(10) {
        10
    } else {
        0
    };
    let be_pts = match break_even_units {
        Some(u) if u <= dec!(100) => 30,
        Some(u) if u <= dec!(200) => 20,
        Some(u) if u <= dec!(300) => 10,
        _ => 0,
    };
    let fixed_pts = if total_fixed_costs <= dec!(2000) {
        30
    } else if total_fixed_costs <= dec!(4000) {
        20
    } else if total_fixed_costs <= dec!(6000) {
        10
    } else {
        0
    };
    margin_pts + be_pts + fixed_pts
}

/// Go / no-go banding of the viability score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Proceed,
    ProceedWithCaution,
    NotRecommended,
}

impl Decision {
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            Decision::Proceed
        } else if score >= 50 {
            Decision::ProceedWithCaution
        } else {
            Decision::NotRecommended
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Proceed => "proceed",
            Decision::ProceedWithCaution => "proceed with caution",
            Decision::NotRecommended => "not recommended",
        };
        f.write_str(s)
    }
}
