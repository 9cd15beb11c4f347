//! Context-scaled default values for whole steps.
//!
//! Estimates use the same multipliers as the heuristic checks, so an
//! auto-filled step never trips a blocking finding.

use crate::heuristics::{whole, BusinessContext};
use plan_core::{
    BusinessData, ExpenseCategory, FixedCosts, FundingSource, Investment, ProductId, Service,
    StaffLine, StaffRole,
};
use plan_econ::metrics::product_rows;
use plan_econ::OWN_CAPITAL_SHARE;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-m² set-up costs, then flat ones.
const EXPENSES_PER_M2: [(ExpenseCategory, Decimal); 4] = [
    (ExpenseCategory::Deposit, dec!(25)),
    (ExpenseCategory::Equipment, dec!(120)),
    (ExpenseCategory::Furniture, dec!(60)),
    (ExpenseCategory::Decoration, dec!(25)),
];
const FLAT_EXPENSES: [(ExpenseCategory, Decimal); 2] = [
    (ExpenseCategory::Licenses, dec!(800)),
    (ExpenseCategory::PointOfSale, dec!(400)),
];

const RENT_PER_M2: Decimal = dec!(20);

fn service_base(service: Service, area_m2: Decimal) -> Decimal {
    match service {
        Service::Electricity => dec!(4) * area_m2,
        Service::Water => dec!(1.5) * area_m2,
        Service::Gas => dec!(2.5) * area_m2,
        Service::Internet => dec!(80),
    }
}

/// (base salary, headcount) per role.
fn staff_default(role: StaffRole) -> (Decimal, u32) {
    match role {
        StaffRole::Cook => (dec!(800), 1),
        StaffRole::Waiter => (dec!(600), 2),
        StaffRole::Cashier => (dec!(700), 1),
        StaffRole::Cleaning => (dec!(500), 1),
    }
}

/// Maintenance, marketing, supplies and insurance.
const OTHER_COSTS: [Decimal; 4] = [dec!(200), dec!(150), dec!(300), dec!(80)];

/// Estimated set-up expenses, funded 60/40 from own capital and loans.
/// Loan terms are kept from `current`.
pub fn estimate_investment(ctx: &BusinessContext, current: &Investment) -> Investment {
    let op = ctx.operating_multiplier();
    let mut expenses = BTreeMap::new();
    for (cat, rate) in EXPENSES_PER_M2 {
        expenses.insert(cat, whole(rate * ctx.area_m2 * op));
    }
    for (cat, amount) in FLAT_EXPENSES {
        expenses.insert(cat, whole(amount * op));
    }
    let total: Decimal = expenses.values().copied().sum();
    let own = whole(total * OWN_CAPITAL_SHARE);
    let mut funding = BTreeMap::new();
    funding.insert(FundingSource::OwnCapital, own);
    funding.insert(FundingSource::Loans, total - own);
    debug!(%total, multiplier = %op, "investment estimated");
    Investment {
        expenses,
        funding,
        loan_annual_rate_pct: current.loan_annual_rate_pct,
        loan_term_months: current.loan_term_months,
    }
}

/// Estimated monthly fixed costs. Services bundled by `current` are left out.
pub fn estimate_fixed_costs(ctx: &BusinessContext, current: &FixedCosts) -> FixedCosts {
    let op = ctx.operating_multiplier();
    let bundle = current.utilities_in_rent;
    let services = Service::ALL
        .into_iter()
        .filter(|s| !bundle.includes(*s))
        .map(|s| (s, whole(service_base(s, ctx.area_m2) * op)))
        .collect();
    let staff = StaffRole::ALL
        .into_iter()
        .map(|role| {
            let (salary, quantity) = staff_default(role);
            (
                role,
                StaffLine {
                    quantity,
                    salary_per_person: whole(salary * op),
                },
            )
        })
        .collect();
    FixedCosts {
        rent: whole(RENT_PER_M2 * ctx.area_m2 * op),
        staff,
        services,
        utilities_in_rent: bundle,
        other_costs: OTHER_COSTS.iter().map(|c| whole(*c * op)).collect(),
    }
}

/// Recommended price for every product with a positive cost.
pub fn suggested_prices(data: &BusinessData) -> BTreeMap<ProductId, Decimal> {
    product_rows(data)
        .into_iter()
        .filter(|p| p.cost > Decimal::ZERO)
        .map(|p| (p.id, p.recommended_price))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::{analyze_step, IssueKind};
    use plan_core::{BusinessType, Ingredient, Product, SizeCategory, Step, UtilityBundle};
    use proptest::prelude::*;

    fn data(bt: BusinessType, size: SizeCategory, area: Decimal) -> BusinessData {
        let mut d = BusinessData::default();
        d.configuration.business_type = Some(bt);
        d.configuration.size_category = Some(size);
        d.configuration.location_text = "Tumbaco".into();
        d.configuration.area_m2 = area;
        d.configuration.capacity = 40;
        d
    }

    #[test]
    fn investment_for_a_plain_context() {
        let mut d = data(BusinessType::Restaurant, SizeCategory::Medium, dec!(100));
        d.configuration.location_text.clear();
        let ctx = BusinessContext::from_configuration(&d.configuration);
        let inv = estimate_investment(&ctx, &d.investment);
        assert_eq!(inv.expenses[&ExpenseCategory::Equipment], dec!(12000));
        assert_eq!(inv.expenses[&ExpenseCategory::Licenses], dec!(800));
        // 2500 + 12000 + 6000 + 2500 + 800 + 400
        assert_eq!(inv.funding[&FundingSource::OwnCapital], dec!(14520));
        assert_eq!(inv.funding[&FundingSource::Loans], dec!(9680));
        assert_eq!(inv.loan_term_months, 24);
    }

    #[test]
    fn bundled_services_are_left_out() {
        let d = data(BusinessType::Cafe, SizeCategory::Small, dec!(50));
        let ctx = BusinessContext::from_configuration(&d.configuration);
        let current = FixedCosts {
            utilities_in_rent: UtilityBundle::Water,
            ..FixedCosts::default()
        };
        let fc = estimate_fixed_costs(&ctx, &current);
        assert!(!fc.services.contains_key(&Service::Water));
        assert!(fc.services.contains_key(&Service::Electricity));
        assert_eq!(fc.utilities_in_rent, UtilityBundle::Water);
        assert_eq!(fc.headcount(), 5);
        assert_eq!(fc.other_costs.len(), 4);
    }

    #[test]
    fn prices_skip_uncosted_products() {
        let mut d = data(BusinessType::Restaurant, SizeCategory::Medium, dec!(80));
        d.variable_costs.products.push(Product {
            id: ProductId(1),
            name: "Ceviche".into(),
            ingredients: vec![Ingredient {
                name: "Pescado".into(),
                purchase_price: dec!(4),
                ..Ingredient::default()
            }],
            ..Product::default()
        });
        d.variable_costs.products.push(Product {
            id: ProductId(2),
            name: "Agua".into(),
            ..Product::default()
        });
        let prices = suggested_prices(&d);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[&ProductId(1)], dec!(12));
    }

    proptest! {
        #[test]
        fn estimates_never_block(bt in 0usize..6, size in 0usize..3, area in 10i64..1000) {
            let sizes = [SizeCategory::Small, SizeCategory::Medium, SizeCategory::Large];
            let mut d = data(BusinessType::ALL[bt], sizes[size], Decimal::from(area));
            let ctx = BusinessContext::from_configuration(&d.configuration);
            d.investment = estimate_investment(&ctx, &d.investment);
            d.fixed_costs = estimate_fixed_costs(&ctx, &d.fixed_costs);
            for step in [Step::Investment, Step::FixedCosts] {
                let report = analyze_step(step, &d);
                prop_assert!(!report.is_blocking());
                prop_assert!(report.findings.iter().all(|f| f.kind == IssueKind::Warning));
            }
        }
    }
}
