//! Structural (presence and range) checks for each wizard step.
//!
//! These are cheap, synchronous checks. A step whose structural check
//! reports anything cannot be left, and heuristic checks do not run on it.

use crate::{BusinessData, ProductId, Service, Step};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Supported floor area in m².
pub const AREA_RANGE_M2: RangeInclusive<Decimal> = dec!(10)..=dec!(1000);
/// Supported seating capacity.
pub const CAPACITY_RANGE: RangeInclusive<u32> = 5..=200;
/// Largest accepted monetary amount, rate or recipe quantity.
pub const MAX_AMOUNT: Decimal = dec!(1000000000);
/// Largest accepted headcount or monthly unit projection.
pub const MAX_UNITS: u32 = 1_000_000;

/// A required field is missing or outside its legal range.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructuralError {
    #[error("business type must be selected")]
    MissingBusinessType,
    #[error("location is required")]
    MissingLocation,
    #[error("area {0} m² is outside the supported range [10, 1000]")]
    AreaOutOfRange(Decimal),
    #[error("capacity {0} is outside the supported range [5, 200]")]
    CapacityOutOfRange(u32),
    /// Any monetary or quantity field below zero.
    #[error("{field} cannot be negative")]
    NegativeAmount { field: String },
    #[error("{field} exceeds the supported maximum")]
    TooLarge { field: String },
    #[error("at least one set-up expense greater than zero is required")]
    NoExpenses,
    #[error("at least one funding source greater than zero is required")]
    NoFunding,
    #[error("loan term must be at least one month")]
    ZeroLoanTerm,
    #[error("rent must be greater than zero")]
    MissingRent,
    #[error("at least one staff role needs a quantity and a salary")]
    NoStaff,
    #[error("{0} must be entered when it is not included in the rent")]
    MissingUtility(Service),
    #[error("at least one named product is required")]
    NoProducts,
    #[error("product {0} needs a name of at least two characters")]
    ProductNameTooShort(ProductId),
    #[error("product {0} needs at least one ingredient")]
    NoIngredients(ProductId),
    #[error("ingredient '{ingredient}' of product {product} needs a price greater than zero")]
    NonPositiveIngredientPrice { product: ProductId, ingredient: String },
    #[error("at least one sale price greater than zero is required")]
    NoSalePrices,
    #[error("price or projection references unknown product {0}")]
    UnknownProduct(ProductId),
}

impl StructuralError {
    /// Dotted path of the offending field, for inline display.
    pub fn field(&self) -> String {
        match self {
            StructuralError::MissingBusinessType => "configuration.business_type".into(),
            StructuralError::MissingLocation => "configuration.location_text".into(),
            StructuralError::AreaOutOfRange(_) => "configuration.area_m2".into(),
            StructuralError::CapacityOutOfRange(_) => "configuration.capacity".into(),
            StructuralError::NegativeAmount { field } | StructuralError::TooLarge { field } => {
                field.clone()
            }
            StructuralError::NoExpenses => "investment.expenses".into(),
            StructuralError::NoFunding => "investment.funding".into(),
            StructuralError::ZeroLoanTerm => "investment.loan_term_months".into(),
            StructuralError::MissingRent => "fixed_costs.rent".into(),
            StructuralError::NoStaff => "fixed_costs.staff".into(),
            StructuralError::MissingUtility(s) => format!("fixed_costs.services.{s}"),
            StructuralError::NoProducts => "variable_costs.products".into(),
            StructuralError::ProductNameTooShort(id) => {
                format!("variable_costs.products.{}.name", id.0)
            }
            StructuralError::NoIngredients(id) | StructuralError::NonPositiveIngredientPrice { product: id, .. } => {
                format!("variable_costs.products.{}.ingredients", id.0)
            }
            StructuralError::NoSalePrices => "pricing.sale_prices".into(),
            StructuralError::UnknownProduct(id) => format!("pricing.sale_prices.{}", id.0),
        }
    }
}

/// Run the structural checks for `step`. An empty result means the step passes.
pub fn validate_step(step: Step, data: &BusinessData) -> Vec<StructuralError> {
    match step {
        Step::Configuration => validate_configuration(data),
        Step::Investment => validate_investment(data),
        Step::FixedCosts => validate_fixed_costs(data),
        Step::VariableCosts => validate_variable_costs(data),
        Step::Pricing => validate_pricing(data),
        Step::Analysis => Vec::new(),
    }
}

fn negative(field: impl Into<String>) -> StructuralError {
    StructuralError::NegativeAmount { field: field.into() }
}

/// Fields of `step` above [`MAX_AMOUNT`] or [`MAX_UNITS`].
pub fn oversized(step: Step, data: &BusinessData) -> Vec<StructuralError> {
    let mut fields: Vec<String> = Vec::new();
    let mut amount = |field: String, value: Decimal| {
        if value.abs() > MAX_AMOUNT {
            fields.push(field);
        }
    };
    let mut units = Vec::new();
    match step {
        Step::Configuration | Step::Analysis => {}
        Step::Investment => {
            let inv = &data.investment;
            for (cat, v) in &inv.expenses {
                amount(format!("investment.expenses.{cat}"), *v);
            }
            for (src, v) in &inv.funding {
                amount(format!("investment.funding.{src}"), *v);
            }
            amount("investment.loan_annual_rate_pct".into(), inv.loan_annual_rate_pct);
        }
        Step::FixedCosts => {
            let fc = &data.fixed_costs;
            amount("fixed_costs.rent".into(), fc.rent);
            for (role, line) in &fc.staff {
                amount(format!("fixed_costs.staff.{role}.salary_per_person"), line.salary_per_person);
                units.push((format!("fixed_costs.staff.{role}.quantity"), line.quantity));
            }
            for (service, v) in &fc.services {
                amount(format!("fixed_costs.services.{service}"), *v);
            }
            for (i, v) in fc.other_costs.iter().enumerate() {
                amount(format!("fixed_costs.other_costs.{i}"), *v);
            }
        }
        Step::VariableCosts => {
            for p in &data.variable_costs.products {
                amount(format!("variable_costs.products.{}.labor_minutes", p.id.0), p.labor_minutes);
                for ing in &p.ingredients {
                    let base = format!("variable_costs.products.{}.ingredients.{}", p.id.0, ing.name);
                    amount(format!("{base}.quantity"), ing.quantity);
                    amount(format!("{base}.purchase_price"), ing.purchase_price);
                }
            }
        }
        Step::Pricing => {
            for (id, v) in &data.pricing.sale_prices {
                amount(format!("pricing.sale_prices.{}", id.0), *v);
            }
            for (id, n) in &data.projections.monthly_units {
                units.push((format!("projections.monthly_units.{}", id.0), *n));
            }
        }
    }
    fields.extend(
        units
            .into_iter()
            .filter(|(_, n)| *n > MAX_UNITS)
            .map(|(field, _)| field),
    );
    fields
        .into_iter()
        .map(|field| StructuralError::TooLarge { field })
        .collect()
}

/// First field anywhere in the record beyond the supported maximums.
pub fn first_oversized_field(data: &BusinessData) -> Option<String> {
    Step::ALL
        .into_iter()
        .flat_map(|step| oversized(step, data))
        .map(|e| e.field())
        .next()
}

/// Business type, location, area and capacity.
pub fn validate_configuration(data: &BusinessData) -> Vec<StructuralError> {
    let c = &data.configuration;
    let mut errs = Vec::new();
    if c.business_type.is_none() {
        errs.push(StructuralError::MissingBusinessType);
    }
    if c.location_text.trim().is_empty() {
        errs.push(StructuralError::MissingLocation);
    }
    if !AREA_RANGE_M2.contains(&c.area_m2) {
        errs.push(StructuralError::AreaOutOfRange(c.area_m2));
    }
    if !CAPACITY_RANGE.contains(&c.capacity) {
        errs.push(StructuralError::CapacityOutOfRange(c.capacity));
    }
    errs
}

/// At least one expense and one funding source; nothing negative.
pub fn validate_investment(data: &BusinessData) -> Vec<StructuralError> {
    let inv = &data.investment;
    let mut errs = Vec::new();
    for (cat, amount) in &inv.expenses {
        if *amount < Decimal::ZERO {
            errs.push(negative(format!("investment.expenses.{cat}")));
        }
    }
    for (src, amount) in &inv.funding {
        if *amount < Decimal::ZERO {
            errs.push(negative(format!("investment.funding.{src}")));
        }
    }
    if !inv.expenses.values().any(|a| *a > Decimal::ZERO) {
        errs.push(StructuralError::NoExpenses);
    }
    if !inv.funding.values().any(|a| *a > Decimal::ZERO) {
        errs.push(StructuralError::NoFunding);
    }
    if inv.loan_annual_rate_pct < Decimal::ZERO {
        errs.push(negative("investment.loan_annual_rate_pct"));
    }
    if inv.loan_term_months == 0 {
        errs.push(StructuralError::ZeroLoanTerm);
    }
    errs.extend(oversized(Step::Investment, data));
    errs
}

/// Rent, at least one paid role, and the unbundled core utilities.
pub fn validate_fixed_costs(data: &BusinessData) -> Vec<StructuralError> {
    let fc = &data.fixed_costs;
    let mut errs = Vec::new();
    if fc.rent < Decimal::ZERO {
        errs.push(negative("fixed_costs.rent"));
    } else if fc.rent == Decimal::ZERO {
        errs.push(StructuralError::MissingRent);
    }
    for (role, line) in &fc.staff {
        if line.salary_per_person < Decimal::ZERO {
            errs.push(negative(format!("fixed_costs.staff.{role}.salary_per_person")));
        }
    }
    let staffed = fc
        .staff
        .values()
        .any(|l| l.quantity > 0 && l.salary_per_person > Decimal::ZERO);
    if !staffed {
        errs.push(StructuralError::NoStaff);
    }
    for (service, amount) in &fc.services {
        if *amount < Decimal::ZERO {
            errs.push(negative(format!("fixed_costs.services.{service}")));
        }
    }
    for service in Service::ALL.into_iter().filter(|s| s.is_core_utility()) {
        if fc.utilities_in_rent.includes(service) {
            continue;
        }
        let entered = fc.services.get(&service).is_some_and(|a| *a > Decimal::ZERO);
        if !entered {
            errs.push(StructuralError::MissingUtility(service));
        }
    }
    for (i, amount) in fc.other_costs.iter().enumerate() {
        if *amount < Decimal::ZERO {
            errs.push(negative(format!("fixed_costs.other_costs.{i}")));
        }
    }
    errs.extend(oversized(Step::FixedCosts, data));
    errs
}

/// Named products, each with priced ingredients.
pub fn validate_variable_costs(data: &BusinessData) -> Vec<StructuralError> {
    let products = &data.variable_costs.products;
    let mut errs = Vec::new();
    if !products.iter().any(|p| !p.name.trim().is_empty()) {
        errs.push(StructuralError::NoProducts);
        return errs;
    }
    for p in products {
        if p.name.trim().chars().count() < 2 {
            errs.push(StructuralError::ProductNameTooShort(p.id));
        }
        if p.ingredients.is_empty() {
            errs.push(StructuralError::NoIngredients(p.id));
        }
        if p.labor_minutes < Decimal::ZERO {
            errs.push(negative(format!("variable_costs.products.{}.labor_minutes", p.id.0)));
        }
        for ing in &p.ingredients {
            if ing.quantity < Decimal::ZERO {
                errs.push(negative(format!(
                    "variable_costs.products.{}.ingredients.{}.quantity",
                    p.id.0, ing.name
                )));
            }
            if ing.purchase_price <= Decimal::ZERO {
                errs.push(StructuralError::NonPositiveIngredientPrice {
                    product: p.id,
                    ingredient: ing.name.clone(),
                });
            }
        }
    }
    errs.extend(oversized(Step::VariableCosts, data));
    errs
}

/// At least one positive price, none negative, none dangling.
pub fn validate_pricing(data: &BusinessData) -> Vec<StructuralError> {
    let mut errs = Vec::new();
    for (id, price) in &data.pricing.sale_prices {
        if *price < Decimal::ZERO {
            errs.push(negative(format!("pricing.sale_prices.{}", id.0)));
        }
    }
    if !data.pricing.sale_prices.values().any(|p| *p > Decimal::ZERO) {
        errs.push(StructuralError::NoSalePrices);
    }
    for id in data.orphan_references() {
        errs.push(StructuralError::UnknownProduct(id));
    }
    errs.extend(oversized(Step::Pricing, data));
    errs
}
