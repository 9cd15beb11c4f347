//! Static reference tables for Quito-area prices, salaries and multipliers.
//!
//! Name lookups are fuzzy on purpose: a table key matches when it is a
//! substring of the normalized name (or the name a substring of the key),
//! and the first matching row wins.

use crate::normalize;
use plan_core::{BusinessType, ExpenseCategory, Service, SizeCategory, StaffRole};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

pub use plan_econ::pricing::{markup_band, MarkupBand};

/// Reference price range in USD per `unit`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PriceBand {
    pub min: Decimal,
    pub max: Decimal,
    pub unit: &'static str,
}

impl PriceBand {
    pub const fn new(min: Decimal, max: Decimal, unit: &'static str) -> Self {
        Self { min, max, unit }
    }

    /// Both bounds multiplied by `factor`.
    pub fn scaled(self, factor: Decimal) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
            unit: self.unit,
        }
    }
}

pub type BandTable = &'static [(&'static str, PriceBand)];

const fn kg(min: Decimal, max: Decimal) -> PriceBand {
    PriceBand::new(min, max, "kg")
}

const fn each(min: Decimal, max: Decimal) -> PriceBand {
    PriceBand::new(min, max, "unit")
}

/// Purchase price bands for common ingredients.
pub const INGREDIENT_BANDS: BandTable = &[
    ("pollo", kg(dec!(2.5), dec!(4.5))),
    ("carne de res", kg(dec!(4), dec!(8))),
    ("cerdo", kg(dec!(3), dec!(5.5))),
    ("pescado", kg(dec!(3.5), dec!(7))),
    ("camaron", kg(dec!(8), dec!(15))),
    ("cebolla", kg(dec!(0.8), dec!(1.5))),
    ("tomate", kg(dec!(1), dec!(2))),
    ("papa", kg(dec!(0.6), dec!(1.2))),
    ("zanahoria", kg(dec!(0.8), dec!(1.5))),
    ("lechuga", kg(dec!(1), dec!(2))),
    ("arroz", kg(dec!(0.8), dec!(1.5))),
    ("frijoles", kg(dec!(1.2), dec!(2.5))),
    ("lentejas", kg(dec!(1), dec!(2))),
    ("sal", kg(dec!(0.5), dec!(1))),
    ("azucar", kg(dec!(0.8), dec!(1.5))),
    ("aceite", PriceBand::new(dec!(2), dec!(4), "l")),
    ("mantequilla", kg(dec!(3), dec!(6))),
    ("leche", PriceBand::new(dec!(1), dec!(1.8), "l")),
    ("queso", kg(dec!(4), dec!(8))),
    ("huevos", PriceBand::new(dec!(2.5), dec!(4), "dozen")),
    ("platano", kg(dec!(0.8), dec!(1.5))),
    ("manzana", kg(dec!(1.5), dec!(3))),
    ("naranja", kg(dec!(1), dec!(2))),
    ("limon", kg(dec!(1.5), dec!(3))),
];

pub const GENERIC_INGREDIENT_BAND: PriceBand = each(dec!(0.5), dec!(10));

/// Sale price bands by dish keyword.
pub const PRODUCT_BANDS: BandTable = &[
    ("hamburguesa", each(dec!(4), dec!(12))),
    ("pizza", each(dec!(6), dec!(18))),
    ("pollo", each(dec!(5), dec!(15))),
    ("pescado", each(dec!(8), dec!(20))),
    ("ensalada", each(dec!(3), dec!(10))),
    ("sopa", each(dec!(3), dec!(8))),
    ("pasta", each(dec!(4), dec!(12))),
    ("arroz", each(dec!(3), dec!(10))),
    ("papas", each(dec!(2), dec!(6))),
    ("bebida", each(dec!(1.5), dec!(4))),
    ("postre", each(dec!(2), dec!(8))),
    ("cafe", each(dec!(1.5), dec!(6))),
    ("pan", each(dec!(0.8), dec!(3))),
    ("empanada", each(dec!(1.5), dec!(4))),
    ("ceviche", each(dec!(6), dec!(15))),
    ("seco", each(dec!(5), dec!(12))),
    ("locro", each(dec!(4), dec!(10))),
    ("fritada", each(dec!(4), dec!(10))),
    ("hornado", each(dec!(5), dec!(12))),
    ("llapingacho", each(dec!(3), dec!(8))),
    ("churrasco", each(dec!(4), dec!(12))),
    ("encebollado", each(dec!(3), dec!(8))),
    ("bolon", each(dec!(2), dec!(5))),
    ("tigrillo", each(dec!(3), dec!(7))),
    ("colada", each(dec!(1.5), dec!(4))),
    ("canelazo", each(dec!(2), dec!(6))),
];

pub const GENERIC_PRODUCT_BAND: PriceBand = each(dec!(5), dec!(15));

/// First `(key, band)` row matching `name`, if any.
pub fn lookup_entry(table: BandTable, name: &str) -> Option<(&'static str, PriceBand)> {
    let name = normalize(name);
    table
        .iter()
        .find(|(key, _)| name.contains(key) || (!name.is_empty() && key.contains(name.as_str())))
        .copied()
}

/// Band for `name`, or `fallback` when no row matches.
///
/// Example:
/// assert_eq!(lookup(INGREDIENT_BANDS, "Pechuga de POLLO", GENERIC_INGREDIENT_BAND).max, dec!(4.5));
pub fn lookup(table: BandTable, name: &str, fallback: PriceBand) -> PriceBand {
    lookup_entry(table, name).map_or(fallback, |(_, band)| band)
}

/// Monthly base salary band per role.
pub fn salary_band(role: StaffRole) -> PriceBand {
    let (min, max) = match role {
        StaffRole::Cook => (dec!(600), dec!(1200)),
        StaffRole::Waiter => (dec!(450), dec!(800)),
        StaffRole::Cashier => (dec!(550), dec!(900)),
        StaffRole::Cleaning => (dec!(400), dec!(600)),
    };
    PriceBand::new(min, max, "month")
}

/// Business-type multiplier for set-up and operating costs.
pub fn setup_multiplier(bt: BusinessType) -> Decimal {
    match bt {
        BusinessType::Restaurant => dec!(1.0),
        BusinessType::Cafe => dec!(0.7),
        BusinessType::Bar => dec!(1.2),
        BusinessType::Bakery => dec!(0.8),
        BusinessType::IceCream => dec!(0.6),
        BusinessType::Pizzeria => dec!(0.9),
    }
}

/// Business-type multiplier for sale prices.
pub fn pricing_multiplier(bt: BusinessType) -> Decimal {
    match bt {
        BusinessType::Restaurant => dec!(1.0),
        BusinessType::Cafe => dec!(0.8),
        BusinessType::Bar => dec!(1.3),
        BusinessType::Bakery => dec!(0.7),
        BusinessType::IceCream => dec!(0.9),
        BusinessType::Pizzeria => dec!(0.9),
    }
}

pub fn size_multiplier(size: SizeCategory) -> Decimal {
    match size {
        SizeCategory::Small => dec!(0.6),
        SizeCategory::Medium => dec!(1.0),
        SizeCategory::Large => dec!(1.8),
    }
}

/// A band with its tolerance: values below `band.min × low` or above
/// `band.max × high` are implausible.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RangeRule {
    pub band: PriceBand,
    /// Band is per m² of floor area.
    pub per_m2: bool,
    pub low: Decimal,
    pub high: Decimal,
}

const fn per_m2(min: Decimal, max: Decimal, low: Decimal, high: Decimal) -> RangeRule {
    RangeRule {
        band: PriceBand::new(min, max, "m2"),
        per_m2: true,
        low,
        high,
    }
}

const fn fixed(min: Decimal, max: Decimal, low: Decimal, high: Decimal) -> RangeRule {
    RangeRule {
        band: PriceBand::new(min, max, "total"),
        per_m2: false,
        low,
        high,
    }
}

/// Set-up expense rule; `Other` is never checked.
pub fn expense_rule(cat: ExpenseCategory) -> Option<RangeRule> {
    let rule = match cat {
        ExpenseCategory::Deposit => per_m2(dec!(15), dec!(40), dec!(0.5), dec!(2)),
        ExpenseCategory::Equipment => per_m2(dec!(80), dec!(250), dec!(0.6), dec!(2)),
        ExpenseCategory::Furniture => per_m2(dec!(40), dec!(120), dec!(0.5), dec!(2)),
        ExpenseCategory::Decoration => per_m2(dec!(15), dec!(50), dec!(0.3), dec!(3)),
        ExpenseCategory::Licenses => fixed(dec!(300), dec!(1500), dec!(0.5), dec!(2)),
        ExpenseCategory::PointOfSale => fixed(dec!(200), dec!(1200), dec!(0.5), dec!(2)),
        ExpenseCategory::Other => return None,
    };
    Some(rule)
}

/// Monthly rent per m².
pub const RENT_RULE: RangeRule = per_m2(dec!(12), dec!(35), dec!(0.5), dec!(2));

/// Monthly service cost rule.
pub fn service_rule(service: Service) -> RangeRule {
    match service {
        Service::Electricity => per_m2(dec!(2), dec!(6), dec!(0.5), dec!(2)),
        Service::Water => per_m2(dec!(0.8), dec!(2.5), dec!(0.5), dec!(2)),
        Service::Gas => per_m2(dec!(1.5), dec!(4), dec!(0.5), dec!(2)),
        Service::Internet => fixed(dec!(40), dec!(120), dec!(0.5), dec!(2)),
    }
}

/// Salary tolerance around [`salary_band`].
pub const SALARY_LOW: Decimal = dec!(0.7);
pub const SALARY_HIGH: Decimal = dec!(1.5);

/// Reference headcount range per role for a 30-seat venue of `size`.
pub fn staff_ratio(role: StaffRole, size: SizeCategory) -> (u32, u32) {
    use SizeCategory::*;
    use StaffRole::*;
    match (role, size) {
        (Cook, Small) => (1, 2),
        (Cook, Medium) => (1, 3),
        (Cook, Large) => (2, 5),
        (Waiter, Small) => (1, 3),
        (Waiter, Medium) => (2, 5),
        (Waiter, Large) => (4, 10),
        (Cashier | Cleaning, Small) => (1, 1),
        (Cashier | Cleaning, Medium) => (1, 2),
        (Cashier | Cleaning, Large) => (1, 3),
    }
}
