//! Step state machine: analysis gate, advancement rules and deferred
//! on-entry computations.

use crate::store::{BusinessDataStore, StoreError};
use plan_ai::advisories::{advisories, Advisory};
use plan_ai::autofill::{estimate_fixed_costs, estimate_investment, suggested_prices};
use plan_ai::heuristics::{
    analyze_configuration, analyze_fixed_costs, analyze_investment, analyze_pricing,
    analyze_variable_costs,
};
use plan_ai::{resolve, suggest, BusinessContext, Finding, HeuristicReport};
use plan_core::structural::{
    validate_configuration, validate_fixed_costs, validate_investment, validate_pricing,
    validate_variable_costs,
};
use plan_core::{BusinessData, PlannerConfig, ProductId, Step, StructuralError};
use plan_econ::metrics::product_rows;
use plan_econ::pricing::DEFAULT_TARGET_MARGIN;
use plan_econ::{optimize_prices, price_impact, Metrics, PriceImpact, ProductEconomics};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

type StructuralFn = fn(&BusinessData) -> Vec<StructuralError>;
type HeuristicFn = fn(&BusinessData, &BusinessContext) -> Vec<Finding>;

/// Work run on the tick after a step is entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryWork {
    ProductCosts,
    PriceSuggestions,
    FullAnalysis,
}

/// Validators and entry work of one step.
#[derive(Clone, Copy)]
pub struct StepSpec {
    pub structural: Option<StructuralFn>,
    pub heuristic: Option<HeuristicFn>,
    pub on_enter: Option<EntryWork>,
}

pub fn spec(step: Step) -> StepSpec {
    match step {
        Step::Configuration => StepSpec {
            structural: Some(validate_configuration),
            heuristic: Some(analyze_configuration),
            on_enter: None,
        },
        Step::Investment => StepSpec {
            structural: Some(validate_investment),
            heuristic: Some(analyze_investment),
            on_enter: None,
        },
        Step::FixedCosts => StepSpec {
            structural: Some(validate_fixed_costs),
            heuristic: Some(analyze_fixed_costs),
            on_enter: None,
        },
        Step::VariableCosts => StepSpec {
            structural: Some(validate_variable_costs),
            heuristic: Some(analyze_variable_costs),
            on_enter: Some(EntryWork::ProductCosts),
        },
        Step::Pricing => StepSpec {
            structural: Some(validate_pricing),
            heuristic: Some(analyze_pricing),
            on_enter: Some(EntryWork::PriceSuggestions),
        },
        Step::Analysis => StepSpec {
            structural: None,
            heuristic: None,
            on_enter: Some(EntryWork::FullAnalysis),
        },
    }
}

/// Outcome of the "Analyze" action on one step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepReport {
    pub step: Step,
    #[serde(serialize_with = "display_all")]
    pub structural: Vec<StructuralError>,
    /// `None` when structural checks failed and heuristics did not run.
    pub heuristics: Option<HeuristicReport>,
}

fn display_all<S: serde::Serializer>(errs: &[StructuralError], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(errs.iter().map(|e| format!("{}: {e}", e.field())))
}

impl StepReport {
    pub fn passes(&self) -> bool {
        self.structural.is_empty() && !self.heuristics.as_ref().is_some_and(|h| h.is_blocking())
    }
}

#[derive(Debug, Error)]
pub enum AdvanceError {
    #[error("{0} has not been analyzed since the last edit")]
    NotAnalyzed(Step),
    #[error("{step} has {} structural error(s)", errors.len())]
    Structural {
        step: Step,
        errors: Vec<StructuralError>,
    },
    #[error("{step} has {} blocking finding(s)", findings.len())]
    Blocked { step: Step, findings: Vec<Finding> },
    #[error("already at the last step")]
    AtLastStep,
}

/// Everything shown on the analysis step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub metrics: Metrics,
    pub advisories: Vec<Advisory>,
    /// Effect of moving every product to the default target margin.
    pub optimized: Option<PriceImpact>,
}

pub struct StepController {
    store: BusinessDataStore,
    cfg: PlannerConfig,
    current: Step,
    analyzed: [bool; 6],
    last_report: Option<StepReport>,
    /// `None` while the record holds values the metrics cannot represent.
    metrics: Option<Metrics>,
    metrics_dirty: bool,
    deferred: VecDeque<EntryWork>,
    product_costs: Vec<ProductEconomics>,
    price_suggestions: BTreeMap<ProductId, Decimal>,
    analysis: Option<AnalysisReport>,
}

impl StepController {
    pub fn new(store: BusinessDataStore, cfg: PlannerConfig) -> Self {
        let metrics = Metrics::compute(store.get(), &cfg).ok();
        Self {
            store,
            cfg,
            current: Step::Configuration,
            analyzed: [false; 6],
            last_report: None,
            metrics,
            metrics_dirty: false,
            deferred: VecDeque::new(),
            product_costs: Vec::new(),
            price_suggestions: BTreeMap::new(),
            analysis: None,
        }
    }

    pub fn current(&self) -> Step {
        self.current
    }

    pub fn data(&self) -> &BusinessData {
        self.store.get()
    }

    pub fn store(&self) -> &BusinessDataStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BusinessDataStore {
        &mut self.store
    }

    pub fn is_analyzed(&self, step: Step) -> bool {
        self.analyzed[step.index()]
    }

    pub fn last_report(&self) -> Option<&StepReport> {
        self.last_report.as_ref()
    }

    /// Last computed metrics; refreshed on [`tick`](Self::tick).
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    pub fn product_costs(&self) -> &[ProductEconomics] {
        &self.product_costs
    }

    pub fn price_suggestions(&self) -> &BTreeMap<ProductId, Decimal> {
        &self.price_suggestions
    }

    pub fn analysis(&self) -> Option<&AnalysisReport> {
        self.analysis.as_ref()
    }

    /// A single field edit. Re-locks the step owning the field, and pricing
    /// when the edit removed priced products.
    pub fn edit(&mut self, path: &str, value: Value, now: Instant) -> Result<(), StoreError> {
        let sections = self.store.set(path, value, now)?;
        self.touched(sections.iter().map(String::as_str), now)
    }

    /// A multi-field patch; re-locks every step whose section changed.
    pub fn apply(&mut self, patch: Value, now: Instant) -> Result<(), StoreError> {
        let sections = self.store.mutate(patch, now)?;
        self.touched(sections.iter().map(String::as_str), now)
    }

    fn touched<'a>(
        &mut self,
        sections: impl IntoIterator<Item = &'a str>,
        now: Instant,
    ) -> Result<(), StoreError> {
        let mut config_touched = false;
        for section in sections {
            if let Some(step) = Step::for_section(section) {
                self.analyzed[step.index()] = false;
                config_touched |= step == Step::Configuration;
            }
        }
        self.metrics_dirty = true;
        if config_touched {
            self.refresh_location(now)?;
        }
        Ok(())
    }

    fn refresh_location(&mut self, now: Instant) -> Result<(), StoreError> {
        let c = &self.store.get().configuration;
        let resolved = if c.location_text.trim().is_empty() {
            None
        } else {
            Some(resolve(&c.location_text).zone_code.to_string())
        };
        if resolved != c.resolved_location {
            self.store
                .set("configuration.resolved_location", json!(resolved), now)?;
        }
        Ok(())
    }

    /// Run structural checks, then heuristics if those pass, and unlock the step.
    pub fn analyze(&mut self) -> StepReport {
        let step = self.current;
        let report = self.evaluate(step);
        self.analyzed[step.index()] = true;
        info!(
            %step,
            structural = report.structural.len(),
            findings = report.heuristics.as_ref().map_or(0, |h| h.findings.len()),
            passes = report.passes(),
            "step analyzed"
        );
        self.last_report = Some(report.clone());
        report
    }

    fn evaluate(&self, step: Step) -> StepReport {
        let s = spec(step);
        let data = self.store.get();
        let structural = s.structural.map(|f| f(data)).unwrap_or_default();
        let heuristics = if structural.is_empty() {
            s.heuristic.map(|f| {
                let ctx = BusinessContext::from_configuration(&data.configuration);
                HeuristicReport {
                    step,
                    findings: f(data, &ctx),
                }
            })
        } else {
            None
        };
        StepReport {
            step,
            structural,
            heuristics,
        }
    }

    /// Move forward one step if the current one is analyzed and passes.
    pub fn next(&mut self) -> Result<Step, AdvanceError> {
        let step = self.current;
        let Some(target) = step.next() else {
            return Err(AdvanceError::AtLastStep);
        };
        if !self.is_analyzed(step) {
            return Err(AdvanceError::NotAnalyzed(step));
        }
        let report = self.evaluate(step);
        if !report.structural.is_empty() {
            return Err(AdvanceError::Structural {
                step,
                errors: report.structural,
            });
        }
        if let Some(h) = report.heuristics.filter(HeuristicReport::is_blocking) {
            return Err(AdvanceError::Blocked {
                step,
                findings: h.blocking().cloned().collect(),
            });
        }
        self.enter(target);
        Ok(target)
    }

    /// Move back one step; never gated.
    pub fn previous(&mut self) -> Option<Step> {
        let target = self.current.previous()?;
        self.enter(target);
        Some(target)
    }

    fn enter(&mut self, target: Step) {
        info!(from = %self.current, to = %target, "step change");
        self.current = target;
        self.last_report = None;
        if let Err(e) = self.store.flush() {
            warn!(error = %e, "persist on navigation failed");
        }
        if let Some(work) = spec(target).on_enter {
            self.deferred.push_back(work);
        }
    }

    /// Host-loop hook: debounced persistence, metric refresh and deferred
    /// on-entry work, in that order.
    pub fn tick(&mut self, now: Instant) -> Result<(), StoreError> {
        self.store.poll_persist(now)?;
        if self.metrics_dirty {
            self.metrics = Metrics::compute(self.store.get(), &self.cfg).ok();
            self.metrics_dirty = false;
        }
        while let Some(work) = self.deferred.pop_front() {
            self.run(work);
        }
        Ok(())
    }

    fn run(&mut self, work: EntryWork) {
        let data = self.store.get();
        match work {
            EntryWork::ProductCosts => {
                self.product_costs = product_rows(data);
            }
            EntryWork::PriceSuggestions => {
                self.price_suggestions = suggested_prices(data);
            }
            EntryWork::FullAnalysis => {
                let Some(metrics) = &self.metrics else {
                    warn!("analysis skipped: metrics unavailable");
                    self.analysis = None;
                    return;
                };
                let optimized = optimize_prices(
                    &metrics.products,
                    &data.pricing.sale_prices,
                    DEFAULT_TARGET_MARGIN,
                )
                .ok()
                .and_then(|prices| {
                    price_impact(
                        &metrics.products,
                        &prices,
                        metrics.total_fixed_cost,
                        metrics.break_even.as_ref(),
                    )
                });
                self.analysis = Some(AnalysisReport {
                    metrics: metrics.clone(),
                    advisories: advisories(metrics),
                    optimized,
                });
            }
        }
        debug!(?work, "entry work done");
    }

    /// Fill the current step with context-scaled estimates.
    pub fn autofill(&mut self, now: Instant) -> Result<(), StoreError> {
        let data = self.store.get();
        let ctx = BusinessContext::from_configuration(&data.configuration);
        let patch = match self.current {
            Step::Investment => {
                json!({ "investment": estimate_investment(&ctx, &data.investment) })
            }
            Step::FixedCosts => {
                json!({ "fixed_costs": estimate_fixed_costs(&ctx, &data.fixed_costs) })
            }
            Step::VariableCosts => {
                let bt = ctx.business_type;
                let mut products = data.variable_costs.products.clone();
                for p in products.iter_mut().filter(|p| p.ingredients.is_empty()) {
                    p.ingredients = suggest(&p.name, bt).to_ingredients();
                }
                json!({ "variable_costs": { "products": products } })
            }
            Step::Pricing => {
                let mut prices = suggested_prices(data);
                prices.extend(data.pricing.sale_prices.iter().filter(|(_, p)| **p > Decimal::ZERO));
                json!({ "pricing": { "sale_prices": prices } })
            }
            Step::Configuration | Step::Analysis => return Ok(()),
        };
        self.apply(patch, now)
    }

    /// Write a finding's estimate into its field.
    pub fn apply_suggestion(&mut self, finding: &Finding, now: Instant) -> Result<(), StoreError> {
        let Some(estimate) = finding.estimate else {
            return Err(StoreError::NotApplicable(finding.field.clone()));
        };
        let value = match self.store.get_path(&finding.field) {
            Some(Value::Number(_)) => estimate
                .to_u64()
                .map(|n| json!(n))
                .ok_or_else(|| StoreError::NotApplicable(finding.field.clone()))?,
            Some(Value::String(_)) => json!(estimate.to_string()),
            _ => return Err(StoreError::NotApplicable(finding.field.clone())),
        };
        self.edit(&finding.field, value, now)
    }

    /// Persist immediately; call when the session is closing.
    pub fn unload(&mut self) -> Result<(), StoreError> {
        self.store.flush()
    }

    /// Back to an empty record on step one.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.store.reset()?;
        self.current = Step::Configuration;
        self.analyzed = [false; 6];
        self.last_report = None;
        self.deferred.clear();
        self.product_costs.clear();
        self.price_suggestions.clear();
        self.analysis = None;
        self.metrics = Metrics::compute(self.store.get(), &self.cfg).ok();
        self.metrics_dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::MemoryStorage;
    use plan_ai::IssueKind;
    use std::time::Duration;

    fn controller() -> StepController {
        let cfg = PlannerConfig::default();
        let store = BusinessDataStore::load(Box::new(MemoryStorage::new()), &cfg);
        StepController::new(store, cfg)
    }

    fn configure(c: &mut StepController, t: Instant) {
        c.apply(
            json!({"configuration": {
                "business_type": "restaurant",
                "size_category": "medium",
                "location_text": "Cumbayá valle",
                "area_m2": 100,
                "capacity": 40
            }}),
            t,
        )
        .unwrap();
    }

    #[test]
    fn cannot_advance_without_analysis() {
        let mut c = controller();
        let t = Instant::now();
        configure(&mut c, t);
        assert_eq!(c.data().configuration.resolved_location.as_deref(), Some("cumbaya"));
        assert!(matches!(c.next(), Err(AdvanceError::NotAnalyzed(Step::Configuration))));
        assert!(c.analyze().passes());
        assert_eq!(c.next().unwrap(), Step::Investment);
    }

    #[test]
    fn editing_relocks_only_the_owning_step() {
        let mut c = controller();
        let t = Instant::now();
        configure(&mut c, t);
        c.analyze();
        c.next().unwrap();
        c.edit("configuration.capacity", json!(50), t).unwrap();
        assert!(!c.is_analyzed(Step::Configuration));
        c.edit("investment.expenses.equipment", json!("9000"), t).unwrap();
        c.analyze();
        assert!(c.is_analyzed(Step::Investment));
        c.edit("investment.funding.own_capital", json!("9000"), t).unwrap();
        assert!(!c.is_analyzed(Step::Investment));
        assert!(matches!(c.next(), Err(AdvanceError::NotAnalyzed(Step::Investment))));
        assert_eq!(c.previous(), Some(Step::Configuration));
        assert_eq!(c.previous(), None);
    }

    #[test]
    fn structural_errors_block_even_when_analyzed() {
        let mut c = controller();
        let report = c.analyze();
        assert!(!report.passes());
        assert!(report.heuristics.is_none());
        match c.next() {
            Err(AdvanceError::Structural { step, errors }) => {
                assert_eq!(step, Step::Configuration);
                assert!(errors.contains(&StructuralError::MissingBusinessType));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn implausible_water_bill_blocks_fixed_costs() {
        let mut c = controller();
        let t = Instant::now();
        configure(&mut c, t);
        c.analyze();
        c.next().unwrap();
        c.autofill(t).unwrap();
        c.analyze();
        c.next().unwrap();
        assert_eq!(c.current(), Step::FixedCosts);
        c.autofill(t).unwrap();
        c.edit("fixed_costs.services.water", json!("2"), t).unwrap();
        let report = c.analyze();
        assert!(!report.passes());
        let blocking: Vec<&Finding> = report.heuristics.as_ref().unwrap().blocking().collect();
        assert_eq!(blocking.len(), 1);
        assert_eq!(blocking[0].kind, IssueKind::BlockingHeuristic);
        assert!(matches!(c.next(), Err(AdvanceError::Blocked { .. })));

        let fix = blocking[0].clone();
        c.apply_suggestion(&fix, t).unwrap();
        assert!(!c.is_analyzed(Step::FixedCosts));
        assert!(c.analyze().passes());
        assert_eq!(c.next().unwrap(), Step::VariableCosts);
    }

    #[test]
    fn entry_work_runs_on_the_next_tick() {
        let mut c = controller();
        let t = Instant::now();
        configure(&mut c, t);
        c.apply(
            json!({"variable_costs": {"products": [{"id": 1, "name": "Seco de pollo"}]}}),
            t,
        )
        .unwrap();
        c.current = Step::FixedCosts;
        c.analyzed[Step::FixedCosts.index()] = true;
        c.autofill(t).unwrap();
        c.analyzed[Step::FixedCosts.index()] = true;
        c.next().unwrap();
        assert!(c.product_costs().is_empty());
        c.autofill(t).unwrap();
        c.tick(t).unwrap();
        assert_eq!(c.product_costs().len(), 1);
        assert_eq!(c.data().variable_costs.products[0].ingredients.len(), 7);
        assert!(c.metrics().unwrap().total_fixed_cost > Decimal::ZERO);
    }

    #[test]
    fn pruning_prices_relocks_pricing() {
        let mut c = controller();
        let t = Instant::now();
        c.apply(
            json!({
                "variable_costs": {"products": [{"id": 1, "name": "Ceviche"}, {"id": 2, "name": "Jugo"}]},
                "pricing": {"sale_prices": {"1": "9.50", "2": "2.00"}}
            }),
            t,
        )
        .unwrap();
        c.current = Step::Pricing;
        c.analyzed[Step::Pricing.index()] = true;
        c.edit("variable_costs.products.0.name", json!("Ceviche mixto"), t).unwrap();
        assert!(c.is_analyzed(Step::Pricing));

        c.apply(json!({"variable_costs": {"products": [{"id": 1, "name": "Ceviche mixto"}]}}), t)
            .unwrap();
        assert!(!c.is_analyzed(Step::Pricing));
        assert_eq!(c.data().pricing.sale_prices.len(), 1);
        assert!(matches!(c.next(), Err(AdvanceError::NotAnalyzed(Step::Pricing))));
    }

    #[test]
    fn out_of_range_record_has_no_metrics() {
        let mut c = controller();
        let t = Instant::now();
        c.edit("fixed_costs.rent", json!(Decimal::MAX.to_string()), t).unwrap();
        c.apply(json!({"fixed_costs": {"other_costs": ["1"]}}), t).unwrap();
        c.tick(t).unwrap();
        assert!(c.metrics().is_none());
        c.current = Step::Analysis;
        c.run(EntryWork::FullAnalysis);
        assert!(c.analysis().is_none());
        c.edit("fixed_costs.rent", json!("400"), t).unwrap();
        c.tick(t).unwrap();
        assert!(c.metrics().is_some());
    }

    #[test]
    fn tick_persists_after_the_window() {
        let mut c = controller();
        let t = Instant::now();
        c.edit("configuration.name", json!("La Huequita"), t).unwrap();
        c.tick(t).unwrap();
        assert_eq!(c.store().writes(), 0);
        c.tick(t + Duration::from_millis(300)).unwrap();
        assert_eq!(c.store().writes(), 1);
        c.unload().unwrap();
        assert_eq!(c.store().writes(), 2);
    }

    #[test]
    fn reset_returns_to_step_one() {
        let mut c = controller();
        let t = Instant::now();
        configure(&mut c, t);
        c.analyze();
        c.next().unwrap();
        c.reset().unwrap();
        assert_eq!(c.current(), Step::Configuration);
        assert!(!c.is_analyzed(Step::Configuration));
        assert_eq!(c.data(), &BusinessData::default());
    }

    #[test]
    fn last_step_cannot_advance() {
        let mut c = controller();
        c.current = Step::Analysis;
        assert!(matches!(c.next(), Err(AdvanceError::AtLastStep)));
    }
}
