//! Full derived-metrics snapshot of a `BusinessData` record.

use crate::pricing::{self, PricingSummary};
use crate::{
    break_even, cash_flow, funding_split, margin_of_safety_pct, monthly_loan_payment,
    product_cost, staff_real_cost, total_expenses, total_funding, total_other_costs,
    total_services, viability_score, BreakEven, CashFlow, Decision, EconError, FundingSplit,
};
use plan_core::config::MAX_CASH_FLOW_MONTHS;
use plan_core::structural::first_oversized_field;
use plan_core::{BusinessData, PlannerConfig, ProductId, ProductKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-product cost, price and projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductEconomics {
    pub id: ProductId,
    pub name: String,
    pub kind: ProductKind,
    /// Ingredients plus labor.
    pub cost: Decimal,
    /// Entered sale price, if any.
    pub price: Option<Decimal>,
    pub margin_pct: Option<Decimal>,
    pub recommended_price: Decimal,
    pub monthly_units: u32,
}

/// Month-at-projection result using per-product unit estimates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectedMonth {
    pub revenue: Decimal,
    pub variable_cost: Decimal,
    pub fixed_cost: Decimal,
    pub result: Decimal,
}

/// Everything derived from the inputs; recomputed, never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_expenses: Decimal,
    pub total_funding: Decimal,
    pub funding: FundingSplit,
    /// Funding minus expenses; negative means a shortfall.
    pub funding_gap: Decimal,
    /// `None` when the loan terms cannot be amortized.
    pub monthly_loan_payment: Option<Decimal>,
    pub base_payroll: Decimal,
    pub staff_real_cost: Decimal,
    pub total_services: Decimal,
    pub total_other_costs: Decimal,
    pub total_fixed_cost: Decimal,
    pub products: Vec<ProductEconomics>,
    pub average_price: Option<Decimal>,
    pub average_cost: Option<Decimal>,
    pub pricing: PricingSummary,
    pub break_even: Option<BreakEven>,
    pub margin_of_safety_pct: Option<Decimal>,
    pub cash_flow: Option<CashFlow>,
    pub projected_month: ProjectedMonth,
    pub viability_score: u8,
    pub decision: Decision,
}

impl Metrics {
    /// Derive every metric from `data`.
    ///
    /// Fails with [`EconError::OutOfRange`] when any amount or unit count is
    /// beyond the structural maximums, since totals over such inputs are
    /// not representable.
    pub fn compute(data: &BusinessData, cfg: &PlannerConfig) -> Result<Metrics, EconError> {
        if let Some(field) = first_oversized_field(data) {
            warn!(%field, "metrics skipped: value out of range");
            return Err(EconError::OutOfRange(field));
        }
        let inv = &data.investment;
        let fc = &data.fixed_costs;

        let total_expenses = total_expenses(inv);
        let total_funding = total_funding(inv);
        let funding = funding_split(total_funding);
        let monthly_loan_payment =
            monthly_loan_payment(funding.loans, inv.loan_annual_rate_pct, inv.loan_term_months)
                .ok();

        let base_payroll = fc.base_payroll();
        let staff_real_cost = staff_real_cost(base_payroll);
        let total_services = total_services(fc);
        let total_other_costs = total_other_costs(fc);
        let total_fixed_cost = crate::total_fixed_cost(fc);

        let products = product_rows(data);
        let averages = pricing::average_price_and_cost(&products);
        let summary = pricing::pricing_summary(&products);
        let be = averages.and_then(|(p, c)| break_even(total_fixed_cost, p, c));
        let cash = averages.map(|(p, c)| {
            let months = cfg.cash_flow_months.min(MAX_CASH_FLOW_MONTHS);
            cash_flow(total_fixed_cost, p, c, total_expenses, months)
        });

        let mut projected_month = ProjectedMonth {
            fixed_cost: total_fixed_cost,
            ..ProjectedMonth::default()
        };
        for p in &products {
            let units = Decimal::from(p.monthly_units);
            projected_month.revenue += units * p.price.unwrap_or_default();
            projected_month.variable_cost += units * p.cost;
        }
        projected_month.result =
            projected_month.revenue - projected_month.variable_cost - total_fixed_cost;

        let average_margin_pct = averages
            .and_then(|(p, c)| pricing::margin_pct(p, c))
            .unwrap_or_default();
        let viability_score =
            viability_score(average_margin_pct, be.map(|b| b.units), total_fixed_cost);
        debug!(
            %total_fixed_cost,
            score = viability_score,
            priced = summary.priced_count,
            "metrics recomputed"
        );
        Ok(Metrics {
            total_expenses,
            total_funding,
            funding,
            funding_gap: total_funding - total_expenses,
            monthly_loan_payment,
            base_payroll,
            staff_real_cost,
            total_services,
            total_other_costs,
            total_fixed_cost,
            average_price: averages.map(|(p, _)| p),
            average_cost: averages.map(|(_, c)| c),
            margin_of_safety_pct: be
                .map(|b| margin_of_safety_pct(b.units, cfg.safety_reference_units)),
            break_even: be,
            cash_flow: cash,
            pricing: summary,
            projected_month,
            viability_score,
            decision: Decision::from_score(viability_score),
            products,
        })
    }
}

/// Cost, price and recommendation for every product in `data`.
pub fn product_rows(data: &BusinessData) -> Vec<ProductEconomics> {
    data.variable_costs
        .products
        .iter()
        .map(|p| {
            let cost = product_cost(&p.ingredients, p.labor_minutes, p.labor_role);
            let price = data.sale_price(p.id);
            ProductEconomics {
                id: p.id,
                name: p.name.clone(),
                kind: p.kind,
                cost,
                price,
                margin_pct: price.and_then(|pr| pricing::margin_pct(pr, cost)),
                recommended_price: pricing::recommended_price(cost, p.kind),
                monthly_units: data.projections.units_for(p.id),
            }
        })
        .collect()
}
