//! Pricing helpers: markup-based recommendations, portfolio summary,
//! target-margin optimization and what-if impact.

use crate::{break_even, BreakEven, EconError, ProductEconomics};
use plan_core::{ProductId, ProductKind};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lowest price ever recommended for a costed product.
pub const PRICE_FLOOR: Decimal = dec!(1.5);
/// Margin below which a product counts as critical, in percent.
pub const CRITICAL_MARGIN_PCT: Decimal = dec!(20);
/// Default target margin for automatic optimization (40 %).
pub const DEFAULT_TARGET_MARGIN: Decimal = dec!(0.4);

/// Cost multipliers for a pricing category.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkupBand {
    pub min: Decimal,
    pub optimal: Decimal,
    pub max: Decimal,
}

pub fn markup_band(kind: ProductKind) -> MarkupBand {
    match kind {
        ProductKind::Food => MarkupBand {
            min: dec!(2.5),
            optimal: dec!(3.0),
            max: dec!(4.0),
        },
        ProductKind::Beverage => MarkupBand {
            min: dec!(3.0),
            optimal: dec!(4.0),
            max: dec!(5.0),
        },
        ProductKind::Resale => MarkupBand {
            min: dec!(1.5),
            optimal: dec!(2.0),
            max: dec!(2.5),
        },
    }
}

/// Round to the nearest 0.25, halves away from zero.
pub fn round_to_quarter(x: Decimal) -> Decimal {
    x.saturating_mul(dec!(4))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        / dec!(4)
}

/// Suggested sale price for a unit cost.
///
/// `cost × optimal`; below 1 it becomes `max(1.5, cost × min)`, above 50 it
/// becomes `cost × min`. The result is floored at [`PRICE_FLOOR`] and
/// rounded to the nearest 0.25. Non-positive costs yield zero.
///
/// Example:
/// assert_eq!(recommended_price(Decimal::new(4, 0), ProductKind::Food), Decimal::new(12, 0));
/// assert_eq!(recommended_price(Decimal::new(2, 1), ProductKind::Food), Decimal::new(15, 1));
pub fn recommended_price(cost: Decimal, kind: ProductKind) -> Decimal {
    if cost <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let band = markup_band(kind);
    let mut price = cost.saturating_mul(band.optimal);
    if price < Decimal::ONE {
        price = PRICE_FLOOR.max(cost.saturating_mul(band.min));
    } else if price > dec!(50) {
        price = cost.saturating_mul(band.min);
    }
    round_to_quarter(price.max(PRICE_FLOOR))
}

/// Gross margin of `price` over `cost` in percent; `None` for non-positive
/// prices or when the result is not representable.
pub fn margin_pct(price: Decimal, cost: Decimal) -> Option<Decimal> {
    if price <= Decimal::ZERO {
        return None;
    }
    price
        .checked_sub(cost)?
        .checked_div(price)?
        .checked_mul(dec!(100))
}

/// Average price and cost over products with both a price and a cost.
pub fn average_price_and_cost(products: &[ProductEconomics]) -> Option<(Decimal, Decimal)> {
    averages(products.iter().map(|p| (p.price.unwrap_or_default(), p.cost)))
}

fn averages(pairs: impl Iterator<Item = (Decimal, Decimal)>) -> Option<(Decimal, Decimal)> {
    let (mut price_sum, mut cost_sum, mut n) = (Decimal::ZERO, Decimal::ZERO, 0u32);
    for (price, cost) in pairs {
        if price > Decimal::ZERO && cost > Decimal::ZERO {
            price_sum = price_sum.checked_add(price)?;
            cost_sum = cost_sum.checked_add(cost)?;
            n += 1;
        }
    }
    if n == 0 {
        return None;
    }
    let n = Decimal::from(n);
    Some((price_sum / n, cost_sum / n))
}

/// Portfolio-level margin overview.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingSummary {
    /// Mean of per-product margins; zero when nothing is priced.
    pub average_margin_pct: Decimal,
    pub most_profitable: Option<ProductId>,
    pub least_profitable: Option<ProductId>,
    /// Products below [`CRITICAL_MARGIN_PCT`].
    pub critical: Vec<ProductId>,
    pub priced_count: usize,
}

/// Summarize margins over products that have both a price and a cost.
pub fn pricing_summary(products: &[ProductEconomics]) -> PricingSummary {
    let mut summary = PricingSummary::default();
    let mut total = Decimal::ZERO;
    let mut best: Option<Decimal> = None;
    let mut worst: Option<Decimal> = None;
    for p in products.iter().filter(|p| p.cost > Decimal::ZERO) {
        let Some(margin) = p.price.and_then(|price| margin_pct(price, p.cost)) else {
            continue;
        };
        total = total.saturating_add(margin);
        summary.priced_count += 1;
        if margin < CRITICAL_MARGIN_PCT {
            summary.critical.push(p.id);
        }
        if best.map_or(true, |b| margin > b) {
            best = Some(margin);
            summary.most_profitable = Some(p.id);
        }
        if worst.map_or(true, |w| margin < w) {
            worst = Some(margin);
            summary.least_profitable = Some(p.id);
        }
    }
    if summary.priced_count > 0 {
        summary.average_margin_pct = total / Decimal::from(summary.priced_count as u64);
    }
    summary
}

/// Price giving `target_margin` (a fraction in `[0, 1)`) over `cost`, to the cent.
pub fn price_for_margin(cost: Decimal, target_margin: Decimal) -> Result<Decimal, EconError> {
    if target_margin < Decimal::ZERO || target_margin >= Decimal::ONE {
        return Err(EconError::InvalidMargin(target_margin));
    }
    cost.checked_div(Decimal::ONE - target_margin)
        .map(|p| p.round_dp(2))
        .ok_or(EconError::Overflow)
}

/// Overlay target-margin prices for every costed product onto `current`.
pub fn optimize_prices(
    products: &[ProductEconomics],
    current: &BTreeMap<ProductId, Decimal>,
    target_margin: Decimal,
) -> Result<BTreeMap<ProductId, Decimal>, EconError> {
    let mut prices = current.clone();
    for p in products.iter().filter(|p| p.cost > Decimal::ZERO) {
        prices.insert(p.id, price_for_margin(p.cost, target_margin)?);
    }
    Ok(prices)
}

/// Qualitative reading of an average margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViabilityLabel {
    Low,
    Medium,
    Good,
    Excellent,
}

impl ViabilityLabel {
    pub fn from_margin(margin_pct: Decimal) -> Self {
        if margin_pct < dec!(20) {
            ViabilityLabel::Low
        } else if margin_pct < dec!(30) {
            ViabilityLabel::Medium
        } else if margin_pct < dec!(50) {
            ViabilityLabel::Good
        } else {
            ViabilityLabel::Excellent
        }
    }
}

impl fmt::Display for ViabilityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViabilityLabel::Low => "low",
            ViabilityLabel::Medium => "medium",
            ViabilityLabel::Good => "good",
            ViabilityLabel::Excellent => "excellent",
        };
        f.write_str(s)
    }
}

/// Effect of a candidate price list compared with the current break-even.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceImpact {
    pub break_even: Option<BreakEven>,
    pub average_margin_pct: Decimal,
    /// Change in break-even sales; negative means fewer sales are needed.
    pub break_even_sales_delta: Option<Decimal>,
    pub viability: ViabilityLabel,
}

/// Evaluate `candidate` prices. `None` when no product has both a price and a cost.
pub fn price_impact(
    products: &[ProductEconomics],
    candidate: &BTreeMap<ProductId, Decimal>,
    fixed_costs: Decimal,
    current: Option<&BreakEven>,
) -> Option<PriceImpact> {
    let (avg_price, avg_cost) = averages(
        products
            .iter()
            .map(|p| (candidate.get(&p.id).copied().unwrap_or_default(), p.cost)),
    )?;
    let average_margin_pct = margin_pct(avg_price, avg_cost)?;
    let be = break_even(fixed_costs, avg_price, avg_cost);
    let delta = match (be.as_ref(), current) {
        (Some(new), Some(old)) => new
            .units
            .checked_sub(old.units)
            .and_then(|d| d.checked_mul(avg_price)),
        _ => None,
    };
    Some(PriceImpact {
        break_even: be,
        average_margin_pct,
        break_even_sales_delta: delta,
        viability: ViabilityLabel::from_margin(average_margin_pct),
    })
}

/// Bounds for interactive price adjustment of one product.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub suggested: Decimal,
    pub max: Decimal,
}

/// `min = max(1.1 × cost, cost + 1)`, `suggested = 1.5 × cost`, `max = 3 × cost`
/// (never below `min`).
pub fn price_range(cost: Decimal) -> PriceRange {
    let min = cost
        .saturating_mul(dec!(1.1))
        .max(cost.saturating_add(Decimal::ONE));
    PriceRange {
        min,
        suggested: cost.saturating_mul(dec!(1.5)),
        max: cost.saturating_mul(dec!(3)).max(min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(id: u32, cost: Decimal, price: Option<Decimal>) -> ProductEconomics {
        ProductEconomics {
            id: ProductId(id),
            name: format!("P{id}"),
            kind: ProductKind::Food,
            cost,
            price,
            margin_pct: price.and_then(|p| margin_pct(p, cost)),
            recommended_price: recommended_price(cost, ProductKind::Food),
            monthly_units: 50,
        }
    }

    #[test]
    fn recommended_price_scenarios() {
        assert_eq!(recommended_price(dec!(4), ProductKind::Food), dec!(12));
        assert_eq!(recommended_price(dec!(0.20), ProductKind::Food), dec!(1.5));
        // 20 × 3 = 60 > 50 → 20 × 2.5
        assert_eq!(recommended_price(dec!(20), ProductKind::Food), dec!(50));
        assert_eq!(recommended_price(dec!(1.1), ProductKind::Beverage), dec!(4.5));
        assert_eq!(recommended_price(Decimal::ZERO, ProductKind::Resale), Decimal::ZERO);
    }

    #[test]
    fn quarter_rounding_half_away() {
        assert_eq!(round_to_quarter(dec!(1.125)), dec!(1.25));
        assert_eq!(round_to_quarter(dec!(1.12)), dec!(1.0));
        assert_eq!(round_to_quarter(dec!(3.9)), dec!(4.0));
    }

    #[test]
    fn summary_picks_extremes_and_critical() {
        let rows = vec![
            row(1, dec!(3), Some(dec!(10))),  // 70 %
            row(2, dec!(9), Some(dec!(10))),  // 10 %
            row(3, dec!(5), None),
            row(4, Decimal::ZERO, Some(dec!(4))),
        ];
        let s = pricing_summary(&rows);
        assert_eq!(s.priced_count, 2);
        assert_eq!(s.average_margin_pct, dec!(40));
        assert_eq!(s.most_profitable, Some(ProductId(1)));
        assert_eq!(s.least_profitable, Some(ProductId(2)));
        assert_eq!(s.critical, vec![ProductId(2)]);
        assert_eq!(average_price_and_cost(&rows), Some((dec!(10), dec!(6))));
    }

    #[test]
    fn optimizer_hits_target_margin() {
        let rows = vec![row(1, dec!(6), Some(dec!(7))), row(2, Decimal::ZERO, Some(dec!(2)))];
        let current: BTreeMap<_, _> = [(ProductId(1), dec!(7)), (ProductId(2), dec!(2))].into();
        let out = optimize_prices(&rows, &current, DEFAULT_TARGET_MARGIN).unwrap();
        assert_eq!(out[&ProductId(1)], dec!(10));
        assert_eq!(out[&ProductId(2)], dec!(2));
        assert!(optimize_prices(&rows, &current, Decimal::ONE).is_err());

        let before = break_even(dec!(1000), dec!(7), dec!(6));
        let impact = price_impact(&rows, &out, dec!(1000), before.as_ref()).unwrap();
        assert_eq!(impact.average_margin_pct, dec!(40));
        assert_eq!(impact.viability, ViabilityLabel::Good);
        assert_eq!(impact.break_even.unwrap().units, dec!(250));
        // 1000 units before, 250 after, at 10 per unit
        assert_eq!(impact.break_even_sales_delta, Some(dec!(-7500)));
    }

    #[test]
    fn unrepresentable_margin_is_absent() {
        assert_eq!(margin_pct(dec!(10), dec!(4)), Some(dec!(60)));
        assert_eq!(margin_pct(dec!(0.0000001), Decimal::MAX), None);
        let rows = vec![row(1, Decimal::MAX, Some(Decimal::MAX)), row(2, dec!(1), Some(dec!(2)))];
        assert_eq!(average_price_and_cost(&rows), None);
    }

    #[test]
    fn range_never_inverts() {
        let r = price_range(dec!(0.2));
        assert_eq!(r.min, dec!(1.2));
        assert!(r.max >= r.min);
        let r = price_range(dec!(20));
        assert_eq!(r.min, dec!(22));
        assert_eq!(r.suggested, dec!(30));
        assert_eq!(r.max, dec!(60));
    }

    proptest! {
        #[test]
        fn recommended_price_on_quarter_grid(cents in 1i64..1_000_000, k in 0usize..3) {
            let kind = [ProductKind::Food, ProductKind::Beverage, ProductKind::Resale][k];
            let p = recommended_price(Decimal::new(cents, 2), kind);
            prop_assert!((p * dec!(4)).fract().is_zero());
            prop_assert!(p >= PRICE_FLOOR);
        }
    }
}
