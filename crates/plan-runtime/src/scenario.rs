//! Headless walk through the wizard from a YAML scenario.

use crate::controller::{AdvanceError, StepController, StepReport};
use crate::store::StoreError;
use plan_core::{BusinessData, Step};
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

/// A prepared plan plus the steps to auto-fill on the way.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub autofill: Vec<Step>,
    pub data: BusinessData,
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("reading scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("scenario parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl Scenario {
    pub fn from_yaml_str(s: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }
}

/// Where a walk ended and what each analysis said.
#[derive(Debug)]
pub struct Walk {
    pub reports: Vec<StepReport>,
    pub reached: Step,
    /// Why the walk stopped before the analysis step, if it did.
    pub stopped: Option<AdvanceError>,
}

impl Walk {
    pub fn completed(&self) -> bool {
        self.reached == Step::Analysis
    }
}

/// Load the scenario into the controller and analyze/advance until the
/// analysis step or the first refusal.
pub fn run_scenario(
    controller: &mut StepController,
    scenario: &Scenario,
    now: Instant,
) -> Result<Walk, StoreError> {
    controller.apply(serde_json::to_value(&scenario.data)?, now)?;
    let mut reports = Vec::new();
    let mut stopped = None;
    while controller.current() != Step::Analysis {
        if scenario.autofill.contains(&controller.current()) {
            controller.autofill(now)?;
        }
        reports.push(controller.analyze());
        if let Err(e) = controller.next() {
            stopped = Some(e);
            break;
        }
    }
    controller.tick(now)?;
    let reached = controller.current();
    info!(scenario = %scenario.name, %reached, completed = stopped.is_none(), "scenario walked");
    Ok(Walk {
        reports,
        reached,
        stopped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_session;
    use persistence::MemoryStorage;
    use plan_core::PlannerConfig;
    use plan_econ::Decision;

    fn fixture() -> Scenario {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/scenarios/cevicheria_valle.yaml");
        Scenario::load(path).unwrap()
    }

    #[test]
    fn fixture_walks_to_analysis() {
        let scenario = fixture();
        assert_eq!(scenario.autofill, vec![Step::Investment]);
        let mut c = open_session(Box::new(MemoryStorage::new()), PlannerConfig::default());
        let walk = run_scenario(&mut c, &scenario, Instant::now()).unwrap();
        assert!(walk.completed(), "stopped: {:?}", walk.stopped);
        assert_eq!(walk.reports.len(), 5);
        assert!(walk.reports.iter().all(StepReport::passes));
        assert_eq!(c.data().configuration.resolved_location.as_deref(), Some("cumbaya"));

        let analysis = c.analysis().unwrap();
        assert_eq!(analysis.metrics.viability_score, 50);
        assert_eq!(analysis.metrics.decision, Decision::ProceedWithCaution);
        assert_eq!(analysis.metrics.pricing.priced_count, 3);
        assert!(analysis.optimized.is_some());
    }

    #[test]
    fn inconsistent_recipe_stops_the_walk() {
        let mut scenario = fixture();
        scenario.data.variable_costs.products[0].name = "Seco de chivo".into();
        let mut c = open_session(Box::new(MemoryStorage::new()), PlannerConfig::default());
        let walk = run_scenario(&mut c, &scenario, Instant::now()).unwrap();
        assert_eq!(walk.reached, Step::VariableCosts);
        assert!(matches!(walk.stopped, Some(AdvanceError::Blocked { step: Step::VariableCosts, .. })));
        assert!(c.analysis().is_none());
    }

    #[test]
    fn bad_yaml_is_a_parse_error() {
        assert!(matches!(
            Scenario::from_yaml_str("data: [1, 2"),
            Err(ScenarioError::Parse(_))
        ));
        assert_eq!(Scenario::from_yaml_str("name: empty").unwrap().data, BusinessData::default());
    }
}
