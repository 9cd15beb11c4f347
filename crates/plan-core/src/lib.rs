#![deny(warnings)]

//! Core domain model for the business-plan calculator.
//!
//! This crate defines the single aggregate record (`BusinessData`) that the
//! wizard fills in step by step, the `Step` sequence itself, and the
//! structural validation helpers that guard step advancement. Every type is
//! serializable so the whole record can be stored as one JSON blob.
//!
//! Derived amounts (totals, payroll with statutory charges, product costs)
//! are never stored here; see `plan-econ`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub mod config;
pub mod structural;

pub use config::{ConfigError, PlannerConfig};
pub use structural::{validate_step, StructuralError};

/// Monthly unit-sales estimate used when a product has no projection.
pub const DEFAULT_MONTHLY_UNITS: u32 = 50;

/// Kind of food business being planned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Restaurant,
    Cafe,
    Bar,
    Bakery,
    IceCream,
    Pizzeria,
}

impl BusinessType {
    pub const ALL: [BusinessType; 6] = [
        BusinessType::Restaurant,
        BusinessType::Cafe,
        BusinessType::Bar,
        BusinessType::Bakery,
        BusinessType::IceCream,
        BusinessType::Pizzeria,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BusinessType::Restaurant => "restaurant",
            BusinessType::Cafe => "cafe",
            BusinessType::Bar => "bar",
            BusinessType::Bakery => "bakery",
            BusinessType::IceCream => "ice cream parlour",
            BusinessType::Pizzeria => "pizzeria",
        }
    }
}

/// Size bucket of the premises.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    Small,
    #[default]
    Medium,
    Large,
}

/// Staff roles with a monthly salary and an hourly labor rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Cook,
    Waiter,
    Cashier,
    Cleaning,
}

impl StaffRole {
    pub const ALL: [StaffRole; 4] = [
        StaffRole::Cook,
        StaffRole::Waiter,
        StaffRole::Cashier,
        StaffRole::Cleaning,
    ];
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StaffRole::Cook => "cook",
            StaffRole::Waiter => "waiter",
            StaffRole::Cashier => "cashier",
            StaffRole::Cleaning => "cleaning",
        };
        f.write_str(s)
    }
}

/// Monthly basic services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Electricity,
    Water,
    Gas,
    Internet,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Electricity,
        Service::Water,
        Service::Gas,
        Service::Internet,
    ];

    /// Electricity and water are the core utilities a landlord may bundle.
    pub fn is_core_utility(self) -> bool {
        matches!(self, Service::Electricity | Service::Water)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Service::Electricity => "electricity",
            Service::Water => "water",
            Service::Gas => "gas",
            Service::Internet => "internet",
        };
        f.write_str(s)
    }
}

/// Which core utilities are already included in the rent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityBundle {
    #[default]
    None,
    Water,
    Electricity,
    WaterAndElectricity,
    All,
}

impl UtilityBundle {
    /// Whether `service` is paid through the rent rather than billed separately.
    ///
    /// Example:
    /// assert!(UtilityBundle::All.includes(Service::Water));
    /// assert!(!UtilityBundle::All.includes(Service::Gas));
    pub fn includes(self, service: Service) -> bool {
        match self {
            UtilityBundle::None => false,
            UtilityBundle::Water => service == Service::Water,
            UtilityBundle::Electricity => service == Service::Electricity,
            UtilityBundle::WaterAndElectricity | UtilityBundle::All => service.is_core_utility(),
        }
    }
}

/// Set-up expense categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Deposit,
    Equipment,
    Furniture,
    Decoration,
    Licenses,
    PointOfSale,
    Other,
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExpenseCategory::Deposit => "deposit",
            ExpenseCategory::Equipment => "equipment",
            ExpenseCategory::Furniture => "furniture",
            ExpenseCategory::Decoration => "decoration",
            ExpenseCategory::Licenses => "licenses",
            ExpenseCategory::PointOfSale => "point_of_sale",
            ExpenseCategory::Other => "other",
        };
        f.write_str(s)
    }
}

/// Where the start-up money comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingSource {
    OwnCapital,
    Investors,
    Loans,
    Other,
}

impl fmt::Display for FundingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FundingSource::OwnCapital => "own_capital",
            FundingSource::Investors => "investors",
            FundingSource::Loans => "loans",
            FundingSource::Other => "other",
        };
        f.write_str(s)
    }
}

/// Pricing category of a product; drives the markup table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    #[default]
    Food,
    Beverage,
    Resale,
}

/// Stable identifier of a product within one record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u32);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Step 1: what kind of business, where, and how big.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Must be selected before leaving the step.
    pub business_type: Option<BusinessType>,
    pub size_category: Option<SizeCategory>,
    /// Free-text location as typed by the user.
    pub location_text: String,
    /// Zone code resolved from `location_text`; refreshed on every edit.
    pub resolved_location: Option<String>,
    /// Floor area in m² (> 0).
    pub area_m2: Decimal,
    /// Seating capacity (> 0).
    pub capacity: u32,
    pub name: String,
    pub description: String,
    pub home_delivery: bool,
}

/// Step 2: set-up expenses and how they are funded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Investment {
    pub expenses: BTreeMap<ExpenseCategory, Decimal>,
    pub funding: BTreeMap<FundingSource, Decimal>,
    /// Nominal annual interest rate in percent.
    pub loan_annual_rate_pct: Decimal,
    /// Amortization term in months.
    pub loan_term_months: u32,
}

impl Default for Investment {
    fn default() -> Self {
        Self {
            expenses: BTreeMap::new(),
            funding: BTreeMap::new(),
            loan_annual_rate_pct: Decimal::new(15, 0),
            loan_term_months: 24,
        }
    }
}

/// Headcount and base monthly salary for one staff role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffLine {
    pub quantity: u32,
    pub salary_per_person: Decimal,
}

impl StaffLine {
    /// Base payroll for this role, before statutory charges.
    pub fn base_total(&self) -> Decimal {
        Decimal::from(self.quantity).saturating_mul(self.salary_per_person)
    }
}

/// Step 3: monthly fixed costs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedCosts {
    pub rent: Decimal,
    pub staff: BTreeMap<StaffRole, StaffLine>,
    pub services: BTreeMap<Service, Decimal>,
    pub utilities_in_rent: UtilityBundle,
    pub other_costs: Vec<Decimal>,
}

impl FixedCosts {
    /// Amount billed for `service`, or `None` when it is bundled into the
    /// rent or was never entered.
    pub fn service_amount(&self, service: Service) -> Option<Decimal> {
        if self.utilities_in_rent.includes(service) {
            return None;
        }
        self.services.get(&service).copied()
    }

    /// Sum of quantity × salary over every role, before statutory charges.
    pub fn base_payroll(&self) -> Decimal {
        self.staff
            .values()
            .map(StaffLine::base_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn headcount(&self) -> u32 {
        self.staff
            .values()
            .fold(0u32, |n, l| n.saturating_add(l.quantity))
    }
}

/// One ingredient line of a product recipe.
///
/// `purchase_price` is the cost of `quantity` as used in one unit of the
/// product; `purchase_unit` is informational only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ingredient {
    pub name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub purchase_price: Decimal,
    pub purchase_unit: String,
}

/// A sellable product with its recipe and labor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub kind: ProductKind,
    pub ingredients: Vec<Ingredient>,
    pub labor_minutes: Decimal,
    pub labor_role: Option<StaffRole>,
}

/// Step 4: products and their recipes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableCosts {
    pub products: Vec<Product>,
}

impl VariableCosts {
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Next free identifier (one past the current maximum).
    pub fn next_id(&self) -> ProductId {
        ProductId(self.products.iter().map(|p| p.id.0).max().map_or(1, |m| m + 1))
    }

    pub fn ids(&self) -> BTreeSet<ProductId> {
        self.products.iter().map(|p| p.id).collect()
    }
}

/// Step 5: sale price per product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub sale_prices: BTreeMap<ProductId, Decimal>,
}

/// Monthly unit-sales estimates per product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Projections {
    pub monthly_units: BTreeMap<ProductId, u32>,
}

impl Projections {
    /// Projected units for `id`, falling back to [`DEFAULT_MONTHLY_UNITS`].
    pub fn units_for(&self, id: ProductId) -> u32 {
        self.monthly_units
            .get(&id)
            .copied()
            .unwrap_or(DEFAULT_MONTHLY_UNITS)
    }
}

/// The whole plan, one instance per session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessData {
    pub configuration: Configuration,
    pub investment: Investment,
    pub fixed_costs: FixedCosts,
    pub variable_costs: VariableCosts,
    pub pricing: Pricing,
    pub projections: Projections,
}

impl BusinessData {
    /// Product ids referenced by pricing or projections that have no product.
    pub fn orphan_references(&self) -> BTreeSet<ProductId> {
        let known = self.variable_costs.ids();
        self.pricing
            .sale_prices
            .keys()
            .chain(self.projections.monthly_units.keys())
            .filter(|id| !known.contains(id))
            .copied()
            .collect()
    }

    /// Drop pricing and projection entries for products that no longer exist.
    /// Returns how many entries were removed.
    pub fn prune_orphans(&mut self) -> usize {
        let known = self.variable_costs.ids();
        let before = self.pricing.sale_prices.len() + self.projections.monthly_units.len();
        self.pricing.sale_prices.retain(|id, _| known.contains(id));
        self.projections.monthly_units.retain(|id, _| known.contains(id));
        before - (self.pricing.sale_prices.len() + self.projections.monthly_units.len())
    }

    /// Sale price of `id`, if one has been entered.
    pub fn sale_price(&self, id: ProductId) -> Option<Decimal> {
        self.pricing.sale_prices.get(&id).copied()
    }
}

/// The linear wizard steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Configuration,
    Investment,
    FixedCosts,
    VariableCosts,
    Pricing,
    Analysis,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Configuration,
        Step::Investment,
        Step::FixedCosts,
        Step::VariableCosts,
        Step::Pricing,
        Step::Analysis,
    ];

    /// 1-based position in the wizard.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// 0-based position, usable as an array index.
    pub fn index(self) -> usize {
        match self {
            Step::Configuration => 0,
            Step::Investment => 1,
            Step::FixedCosts => 2,
            Step::VariableCosts => 3,
            Step::Pricing => 4,
            Step::Analysis => 5,
        }
    }

    pub fn from_number(n: u8) -> Option<Step> {
        Step::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    pub fn next(self) -> Option<Step> {
        Step::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Step> {
        Step::ALL.get(self.index().checked_sub(1)?).copied()
    }

    /// Top-level `BusinessData` section edited on this step, if any.
    pub fn section(self) -> Option<&'static str> {
        match self {
            Step::Configuration => Some("configuration"),
            Step::Investment => Some("investment"),
            Step::FixedCosts => Some("fixed_costs"),
            Step::VariableCosts => Some("variable_costs"),
            Step::Pricing => Some("pricing"),
            Step::Analysis => None,
        }
    }

    /// Step owning a top-level section name; `projections` belongs to pricing.
    pub fn for_section(section: &str) -> Option<Step> {
        match section {
            "configuration" => Some(Step::Configuration),
            "investment" => Some(Step::Investment),
            "fixed_costs" => Some(Step::FixedCosts),
            "variable_costs" => Some(Step::VariableCosts),
            "pricing" | "projections" => Some(Step::Pricing),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Configuration => "configuration",
            Step::Investment => "investment",
            Step::FixedCosts => "fixed costs",
            Step::VariableCosts => "variable costs",
            Step::Pricing => "pricing",
            Step::Analysis => "analysis",
        };
        write!(f, "step {} ({})", self.number(), s)
    }
}
