//! Per-step plausibility checks against the reference tables.
//!
//! Every finding is advisory except two kinds: core utilities (electricity,
//! water) billed outside the rent at an implausible amount, and dish /
//! ingredient inconsistencies. Those block step advancement.

use crate::dishes::check_consistency;
use crate::location::{resolve, LocationMatch};
use crate::tables::{
    expense_rule, lookup, pricing_multiplier, salary_band, service_rule, setup_multiplier,
    size_multiplier, staff_ratio, PriceBand, RangeRule, GENERIC_INGREDIENT_BAND,
    GENERIC_PRODUCT_BAND, INGREDIENT_BANDS, PRODUCT_BANDS, RENT_RULE, SALARY_HIGH, SALARY_LOW,
};
use plan_core::{BusinessData, BusinessType, Configuration, Service, SizeCategory, Step};
use plan_econ::metrics::product_rows;
use plan_econ::{product_cost, staff_real_cost, total_expenses, total_funding};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Area assumed when the configuration has none yet.
pub const FALLBACK_AREA_M2: Decimal = dec!(80);
/// Capacity assumed when the configuration has none yet.
pub const FALLBACK_CAPACITY: u32 = 30;
/// Capacity the staff ratio table is calibrated for.
const REFERENCE_CAPACITY: Decimal = dec!(30);
/// Average ticket used to estimate monthly revenue for payroll ratios.
const REFERENCE_TICKET: Decimal = dec!(15);
/// Seats one staff member can serve.
const SEATS_PER_STAFF: Decimal = dec!(15);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Implausible but allowed.
    Warning,
    /// Implausible core utility amount; blocks advancement.
    BlockingHeuristic,
    /// Dish and ingredients do not match; blocks advancement.
    Consistency,
}

/// One heuristic observation about a field.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Finding {
    pub kind: IssueKind,
    /// Dotted path of the field, e.g. `fixed_costs.services.water`.
    pub field: String,
    pub message: String,
    /// Suggested replacement value, when one can be estimated.
    pub estimate: Option<Decimal>,
}

impl Finding {
    fn warning(field: impl Into<String>, message: String, estimate: Option<Decimal>) -> Self {
        Self {
            kind: IssueKind::Warning,
            field: field.into(),
            message,
            estimate,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.kind != IssueKind::Warning
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)?;
        if let Some(e) = self.estimate {
            write!(f, " (suggested: {e})")?;
        }
        Ok(())
    }
}

/// Findings for one step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeuristicReport {
    pub step: Step,
    pub findings: Vec<Finding>,
}

impl HeuristicReport {
    pub fn is_blocking(&self) -> bool {
        self.findings.iter().any(Finding::is_blocking)
    }

    pub fn blocking(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_blocking())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.is_blocking())
    }
}

/// Configuration facts every check is scaled by.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BusinessContext {
    pub business_type: BusinessType,
    pub size: SizeCategory,
    pub location: LocationMatch,
    pub area_m2: Decimal,
    pub capacity: u32,
}

impl BusinessContext {
    /// Missing values fall back to a medium restaurant of 80 m² and 30 seats.
    pub fn from_configuration(c: &Configuration) -> Self {
        Self {
            business_type: c.business_type.unwrap_or(BusinessType::Restaurant),
            size: c.size_category.unwrap_or_default(),
            location: resolve(&c.location_text),
            area_m2: if c.area_m2 > Decimal::ZERO {
                c.area_m2
            } else {
                FALLBACK_AREA_M2
            },
            capacity: if c.capacity > 0 {
                c.capacity
            } else {
                FALLBACK_CAPACITY
            },
        }
    }

    /// Location × business type × size; scales set-up and operating costs.
    pub fn operating_multiplier(&self) -> Decimal {
        self.location.multiplier * setup_multiplier(self.business_type) * size_multiplier(self.size)
    }

    /// Location × business type; scales sale prices.
    pub fn price_multiplier(&self) -> Decimal {
        self.location.multiplier * pricing_multiplier(self.business_type)
    }

    /// Expected band for a rule, resolved against area and multiplier.
    pub fn expected(&self, rule: &RangeRule) -> PriceBand {
        let band = if rule.per_m2 {
            rule.band.scaled(self.area_m2)
        } else {
            rule.band
        };
        band.scaled(self.operating_multiplier())
    }

    fn capacity_factor(&self) -> Decimal {
        Decimal::from(self.capacity) / REFERENCE_CAPACITY
    }
}

pub(crate) fn whole(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

pub(crate) fn cents(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compare `value` with a rule; low values suggest `min`, high ones `max`.
fn range_check(
    field: String,
    label: &str,
    value: Decimal,
    expected: PriceBand,
    rule: &RangeRule,
    kind: IssueKind,
) -> Option<Finding> {
    let (message, estimate) = if value < expected.min * rule.low {
        (
            format!("{label} of {value} looks too low; expected {} to {}", whole(expected.min), whole(expected.max)),
            whole(expected.min),
        )
    } else if value > expected.max * rule.high {
        (
            format!("{label} of {value} looks too high; expected {} to {}", whole(expected.min), whole(expected.max)),
            whole(expected.max),
        )
    } else {
        return None;
    };
    Some(Finding {
        kind,
        field,
        message,
        estimate: Some(estimate),
    })
}

/// Run the heuristic checks for `step`.
///
/// Example:
/// let report = analyze_step(Step::FixedCosts, &data);
/// if report.is_blocking() { /* keep the user on the step */ }
pub fn analyze_step(step: Step, data: &BusinessData) -> HeuristicReport {
    let ctx = BusinessContext::from_configuration(&data.configuration);
    let findings = match step {
        Step::Configuration => analyze_configuration(data, &ctx),
        Step::Investment => analyze_investment(data, &ctx),
        Step::FixedCosts => analyze_fixed_costs(data, &ctx),
        Step::VariableCosts => analyze_variable_costs(data, &ctx),
        Step::Pricing => analyze_pricing(data, &ctx),
        Step::Analysis => Vec::new(),
    };
    debug!(%step, findings = findings.len(), zone = ctx.location.zone_code, "heuristics ran");
    HeuristicReport { step, findings }
}

/// An unrecognized location only lowers the precision of later checks.
pub fn analyze_configuration(data: &BusinessData, ctx: &BusinessContext) -> Vec<Finding> {
    let mut out = Vec::new();
    if !data.configuration.location_text.trim().is_empty() && !ctx.location.is_recognized() {
        out.push(Finding::warning(
            "configuration.location_text",
            format!(
                "location \"{}\" was not recognized; reference prices use the default zone",
                data.configuration.location_text.trim()
            ),
            None,
        ));
    }
    out
}

pub fn analyze_investment(data: &BusinessData, ctx: &BusinessContext) -> Vec<Finding> {
    let inv = &data.investment;
    let mut out = Vec::new();
    for (&cat, &amount) in &inv.expenses {
        if amount <= Decimal::ZERO {
            continue;
        }
        let Some(rule) = expense_rule(cat) else {
            continue;
        };
        let expected = ctx.expected(&rule);
        out.extend(range_check(
            format!("investment.expenses.{cat}"),
            &cat.to_string(),
            amount,
            expected,
            &rule,
            IssueKind::Warning,
        ));
    }

    let expenses = total_expenses(inv);
    let funding = total_funding(inv);
    if expenses > Decimal::ZERO && funding > Decimal::ZERO {
        if funding < expenses * dec!(0.8) {
            out.push(Finding::warning(
                "investment.funding",
                format!("funding of {funding} covers less than 80% of expenses ({expenses})"),
                Some(expenses),
            ));
        } else if funding > expenses * dec!(1.5) {
            out.push(Finding::warning(
                "investment.funding",
                format!("funding of {funding} exceeds expenses ({expenses}) by more than 50%"),
                Some(expenses),
            ));
        }
    }
    out
}

pub fn analyze_fixed_costs(data: &BusinessData, ctx: &BusinessContext) -> Vec<Finding> {
    let fc = &data.fixed_costs;
    let mut out = Vec::new();

    if fc.rent > Decimal::ZERO {
        out.extend(range_check(
            "fixed_costs.rent".into(),
            "rent",
            fc.rent,
            ctx.expected(&RENT_RULE),
            &RENT_RULE,
            IssueKind::Warning,
        ));
    }

    for service in Service::ALL {
        let Some(amount) = fc.service_amount(service) else {
            continue;
        };
        if amount <= Decimal::ZERO {
            continue;
        }
        let rule = service_rule(service);
        let kind = if service.is_core_utility() {
            IssueKind::BlockingHeuristic
        } else {
            IssueKind::Warning
        };
        out.extend(range_check(
            format!("fixed_costs.services.{service}"),
            &service.to_string(),
            amount,
            ctx.expected(&rule),
            &rule,
            kind,
        ));
    }

    let op = ctx.operating_multiplier();
    let factor = ctx.capacity_factor();
    for (&role, line) in &fc.staff {
        let band = salary_band(role).scaled(op);
        let field = format!("fixed_costs.staff.{role}");
        let salary = line.salary_per_person;
        if salary > Decimal::ZERO {
            if salary < band.min * SALARY_LOW {
                out.push(Finding::warning(
                    format!("{field}.salary_per_person"),
                    format!("{role} salary of {salary} is below the usual {} to {}", whole(band.min), whole(band.max)),
                    Some(whole(band.min)),
                ));
            } else if salary > band.max * SALARY_HIGH {
                out.push(Finding::warning(
                    format!("{field}.salary_per_person"),
                    format!("{role} salary of {salary} is above the usual {} to {}", whole(band.min), whole(band.max)),
                    Some(whole(band.max)),
                ));
            }
        }

        let (min_base, max_base) = staff_ratio(role, ctx.size);
        let exp_min = whole(Decimal::from(min_base) * factor).max(Decimal::ONE);
        let exp_max = whole(Decimal::from(max_base) * factor)
            .max(Decimal::from(min_base))
            .max(exp_min);
        let qty = Decimal::from(line.quantity);
        if qty < exp_min {
            out.push(Finding::warning(
                format!("{field}.quantity"),
                format!("{} {role}(s) may be too few for {} seats; expected {exp_min} to {exp_max}", line.quantity, ctx.capacity),
                Some(exp_min),
            ));
        } else if qty > exp_max {
            out.push(Finding::warning(
                format!("{field}.quantity"),
                format!("{} {role}(s) may be too many for {} seats; expected {exp_min} to {exp_max}", line.quantity, ctx.capacity),
                Some(exp_max),
            ));
        }

        let total = line.base_total();
        if total > Decimal::ZERO {
            let ceiling = exp_max * band.max * dec!(1.3);
            let floor = exp_min * band.min * dec!(0.5);
            if total > ceiling {
                out.push(Finding::warning(
                    field.clone(),
                    format!("{role} payroll of {total} is above the expected ceiling of {}", whole(ceiling)),
                    None,
                ));
            } else if total < floor {
                out.push(Finding::warning(
                    field.clone(),
                    format!("{role} payroll of {total} is below the expected floor of {}", whole(floor)),
                    None,
                ));
            }
        }
    }

    if !fc.staff.is_empty() {
        let revenue = Decimal::from(ctx.capacity) * dec!(30) * REFERENCE_TICKET;
        let ratio = staff_real_cost(fc.base_payroll()) / revenue;
        let pct = whole(ratio * dec!(100));
        if ratio > dec!(0.4) {
            out.push(Finding::warning(
                "fixed_costs.staff",
                format!("staff costs are {pct}% of expected revenue ({revenue}); above 40% is hard to sustain"),
                None,
            ));
        } else if ratio < dec!(0.1) {
            out.push(Finding::warning(
                "fixed_costs.staff",
                format!("staff costs are only {pct}% of expected revenue ({revenue}); check the payroll"),
                None,
            ));
        }

        let expected = (Decimal::from(ctx.capacity) / SEATS_PER_STAFF).ceil();
        let headcount = Decimal::from(fc.headcount());
        if headcount < expected * dec!(0.7) || headcount > expected * dec!(1.5) {
            out.push(Finding::warning(
                "fixed_costs.staff",
                format!("total headcount of {headcount} differs from the {expected} expected for {} seats", ctx.capacity),
                Some(expected),
            ));
        }
    }
    out
}

pub fn analyze_variable_costs(data: &BusinessData, ctx: &BusinessContext) -> Vec<Finding> {
    let mut out = Vec::new();
    let loc = ctx.location.multiplier;
    for p in &data.variable_costs.products {
        let field = format!("variable_costs.products.{}", p.id.0);
        for ing in &p.ingredients {
            if ing.purchase_price <= Decimal::ZERO {
                continue;
            }
            let band = lookup(INGREDIENT_BANDS, &ing.name, GENERIC_INGREDIENT_BAND).scaled(loc);
            if ing.purchase_price < band.min * dec!(0.3) {
                out.push(Finding::warning(
                    format!("{field}.ingredients"),
                    format!("{} at {} is far below the reference {} to {} per {}", ing.name, ing.purchase_price, cents(band.min), cents(band.max), band.unit),
                    Some(cents(band.min)),
                ));
            } else if ing.purchase_price > band.max * dec!(3) {
                out.push(Finding::warning(
                    format!("{field}.ingredients"),
                    format!("{} at {} is far above the reference {} to {} per {}", ing.name, ing.purchase_price, cents(band.min), cents(band.max), band.unit),
                    Some(cents(band.max)),
                ));
            }
        }

        let cost = product_cost(&p.ingredients, p.labor_minutes, p.labor_role);
        if cost > Decimal::from(ctx.capacity) * dec!(2) {
            out.push(Finding::warning(
                field.clone(),
                format!("unit cost of {} ({}) is high for a {}-seat venue", p.name, cents(cost), ctx.capacity),
                None,
            ));
        }
        if cost > dec!(20) {
            out.push(Finding::warning(
                field.clone(),
                format!("unit cost of {} is {}; above 20 is unusual", p.name, cents(cost)),
                None,
            ));
        }

        let names: Vec<&str> = p.ingredients.iter().map(|i| i.name.as_str()).collect();
        if p.name.trim().is_empty() || names.is_empty() {
            continue;
        }
        let c = check_consistency(&p.name, &names);
        if !c.is_consistent {
            out.push(Finding {
                kind: IssueKind::Consistency,
                field: format!("{field}.ingredients"),
                message: format!("{}: {}", p.name, c.message),
                estimate: None,
            });
        }
    }
    out
}

pub fn analyze_pricing(data: &BusinessData, ctx: &BusinessContext) -> Vec<Finding> {
    let mut out = Vec::new();
    let mult = ctx.price_multiplier();
    for row in product_rows(data) {
        let (Some(price), Some(margin)) = (row.price, row.margin_pct) else {
            continue;
        };
        if row.cost <= Decimal::ZERO {
            continue;
        }
        let field = format!("pricing.sale_prices.{}", row.id.0);
        let cost = row.cost;
        let margin = cents(margin);

        if margin < dec!(20) {
            out.push(Finding::warning(
                field.clone(),
                format!("{} has a {margin}% margin; below 20% leaves no room for error", row.name),
                Some(cents(cost * dec!(1.6))),
            ));
        } else if margin > dec!(80) {
            out.push(Finding::warning(
                field.clone(),
                format!("{} has a {margin}% margin; above 80% may not be competitive", row.name),
                None,
            ));
        }

        let band = lookup(PRODUCT_BANDS, &row.name, GENERIC_PRODUCT_BAND).scaled(mult);
        if price < band.min * dec!(0.6) {
            out.push(Finding::warning(
                field.clone(),
                format!("{} at {price} is well below the market {} to {}", row.name, cents(band.min), cents(band.max)),
                Some(cents(band.min)),
            ));
        } else if price > band.max * dec!(1.5) {
            out.push(Finding::warning(
                field.clone(),
                format!("{} at {price} is well above the market {} to {}", row.name, cents(band.min), cents(band.max)),
                Some(cents(band.max)),
            ));
        }

        if price < cost * dec!(1.2) {
            out.push(Finding::warning(
                field,
                format!("{} is priced within 20% of its cost ({})", row.name, cents(cost)),
                Some(cents(cost * dec!(1.5))),
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::{
        ExpenseCategory, FundingSource, Ingredient, Product, ProductId, StaffLine, StaffRole,
        UtilityBundle,
    };
    use proptest::prelude::*;

    fn configured() -> BusinessData {
        let mut d = BusinessData::default();
        d.configuration.business_type = Some(BusinessType::Restaurant);
        d.configuration.size_category = Some(SizeCategory::Medium);
        d.configuration.location_text = "Calderón".into();
        d.configuration.area_m2 = dec!(100);
        d.configuration.capacity = 30;
        d
    }

    #[test]
    fn context_defaults_and_multipliers() {
        let ctx = BusinessContext::from_configuration(&Configuration::default());
        assert_eq!(ctx.area_m2, FALLBACK_AREA_M2);
        assert_eq!(ctx.capacity, FALLBACK_CAPACITY);
        assert_eq!(ctx.operating_multiplier(), Decimal::ONE);

        let mut c = configured().configuration;
        c.business_type = Some(BusinessType::Cafe);
        c.size_category = Some(SizeCategory::Small);
        let ctx = BusinessContext::from_configuration(&c);
        // calderon 0.9 × cafe 0.7 × small 0.6
        assert_eq!(ctx.operating_multiplier(), dec!(0.378));
        assert_eq!(ctx.price_multiplier(), dec!(0.72));
    }

    #[test]
    fn implausible_water_blocks_but_gas_does_not() {
        let mut d = configured();
        d.fixed_costs.rent = dec!(1800);
        d.fixed_costs.services.insert(Service::Water, dec!(5));
        d.fixed_costs.services.insert(Service::Gas, dec!(5));
        let report = analyze_step(Step::FixedCosts, &d);
        let water = report
            .findings
            .iter()
            .find(|f| f.field == "fixed_costs.services.water")
            .unwrap();
        assert_eq!(water.kind, IssueKind::BlockingHeuristic);
        // 0.8 × 100 m² × 0.9
        assert_eq!(water.estimate, Some(dec!(72)));
        let gas = report
            .findings
            .iter()
            .find(|f| f.field == "fixed_costs.services.gas")
            .unwrap();
        assert_eq!(gas.kind, IssueKind::Warning);
        assert!(report.is_blocking());
    }

    #[test]
    fn bundled_utilities_are_not_checked() {
        let mut d = configured();
        d.fixed_costs.services.insert(Service::Water, dec!(5));
        d.fixed_costs.services.insert(Service::Electricity, dec!(5));
        d.fixed_costs.utilities_in_rent = UtilityBundle::WaterAndElectricity;
        let report = analyze_step(Step::FixedCosts, &d);
        assert!(!report.is_blocking());
        assert!(report.findings.iter().all(|f| !f.field.starts_with("fixed_costs.services")));
    }

    #[test]
    fn staffing_checks() {
        let mut d = configured();
        d.configuration.capacity = 60;
        d.fixed_costs.staff.insert(
            StaffRole::Waiter,
            StaffLine { quantity: 1, salary_per_person: dec!(100) },
        );
        let findings = analyze_step(Step::FixedCosts, &d).findings;
        let fields: Vec<&str> = findings.iter().map(|f| f.field.as_str()).collect();
        assert!(fields.contains(&"fixed_costs.staff.waiter.salary_per_person"));
        // waiter ratio (2, 5) scaled by 60/30
        let qty = findings
            .iter()
            .find(|f| f.field == "fixed_costs.staff.waiter.quantity")
            .unwrap();
        assert_eq!(qty.estimate, Some(dec!(4)));
        // ceil(60 / 15) = 4 expected, 1 present
        assert!(findings
            .iter()
            .any(|f| f.field == "fixed_costs.staff" && f.estimate == Some(dec!(4))));
        assert!(findings.iter().all(|f| !f.is_blocking()));
    }

    #[test]
    fn investment_ranges_and_funding_ratio() {
        let mut d = configured();
        d.investment.expenses.insert(ExpenseCategory::Equipment, dec!(1000));
        d.investment.expenses.insert(ExpenseCategory::Other, dec!(1));
        d.investment.funding.insert(FundingSource::OwnCapital, dec!(500));
        let findings = analyze_step(Step::Investment, &d).findings;
        let eq = findings
            .iter()
            .find(|f| f.field == "investment.expenses.equipment")
            .unwrap();
        // 80/m² × 100 m² × 0.9
        assert_eq!(eq.estimate, Some(dec!(7200)));
        assert!(findings.iter().all(|f| f.field != "investment.expenses.other"));
        let funding = findings
            .iter()
            .find(|f| f.field == "investment.funding")
            .unwrap();
        assert_eq!(funding.estimate, Some(dec!(1001)));
    }

    fn product(name: &str, ingredients: &[(&str, Decimal)]) -> Product {
        Product {
            id: ProductId(1),
            name: name.into(),
            ingredients: ingredients
                .iter()
                .map(|(n, p)| Ingredient {
                    name: (*n).into(),
                    purchase_price: *p,
                    ..Ingredient::default()
                })
                .collect(),
            ..Product::default()
        }
    }

    #[test]
    fn inconsistent_dish_is_blocking() {
        let mut d = configured();
        d.variable_costs
            .products
            .push(product("Seco de Chivo", &[("Carne de res", dec!(4)), ("Arroz", dec!(0.45))]));
        let report = analyze_step(Step::VariableCosts, &d);
        assert!(report.is_blocking());
        assert_eq!(report.blocking().count(), 1);
        assert_eq!(report.blocking().next().map(|f| f.kind), Some(IssueKind::Consistency));
    }

    #[test]
    fn pricing_near_cost_and_low_margin() {
        let mut d = configured();
        d.variable_costs
            .products
            .push(product("Hamburguesa clásica", &[("Carne de res", dec!(4))]));
        d.pricing.sale_prices.insert(ProductId(1), dec!(4.5));
        let findings = analyze_step(Step::Pricing, &d).findings;
        let estimates: Vec<Option<Decimal>> = findings.iter().map(|f| f.estimate).collect();
        assert!(estimates.contains(&Some(dec!(6.40))));
        assert!(estimates.contains(&Some(dec!(6.00))));
        assert!(findings.iter().all(|f| !f.is_blocking()));
    }

    #[test]
    fn unknown_location_is_a_warning() {
        let mut d = configured();
        d.configuration.location_text = "Cuenca".into();
        let report = analyze_step(Step::Configuration, &d);
        assert_eq!(report.findings.len(), 1);
        assert!(!report.is_blocking());
        d.configuration.location_text = "La Floresta".into();
        assert!(analyze_step(Step::Configuration, &d).findings.is_empty());
    }

    proptest! {
        #[test]
        fn only_core_utilities_or_consistency_block(rent in 0i64..100_000,
                                                    gas in 0i64..10_000,
                                                    internet in 0i64..10_000,
                                                    salary in 0i64..5_000,
                                                    qty in 0u32..20) {
            let mut d = configured();
            d.fixed_costs.rent = Decimal::from(rent);
            d.fixed_costs.services.insert(Service::Gas, Decimal::from(gas));
            d.fixed_costs.services.insert(Service::Internet, Decimal::from(internet));
            d.fixed_costs.staff.insert(StaffRole::Cook, StaffLine { quantity: qty, salary_per_person: Decimal::from(salary) });
            prop_assert!(!analyze_step(Step::FixedCosts, &d).is_blocking());
        }
    }
}
