#![deny(warnings)]

//! Runtime for the business-plan wizard.
//!
//! Owns the single [`BusinessDataStore`] and drives it through the
//! [`StepController`] state machine. Time never advances on its own: the
//! host passes `Instant`s into edits and calls [`StepController::tick`]
//! from its loop, which flushes debounced writes and runs deferred work.

pub mod collab;
pub mod controller;
pub mod debounce;
pub mod scenario;
pub mod store;

pub use collab::{
    export_report, save_simulation, ActionError, InMemoryRepository, SessionGate,
    SimulationRecord, SimulationRepository,
};
pub use controller::{AdvanceError, AnalysisReport, StepController, StepReport};
pub use debounce::Debouncer;
pub use scenario::{run_scenario, Scenario, ScenarioError, Walk};
pub use store::{BusinessDataStore, StoreError, StoreEvent};

use persistence::SessionStorage;
use plan_core::PlannerConfig;

/// Load the store from `storage` and wrap it in a controller on step one.
pub fn open_session(storage: Box<dyn SessionStorage>, cfg: PlannerConfig) -> StepController {
    let store = BusinessDataStore::load(storage, &cfg);
    StepController::new(store, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::MemoryStorage;
    use plan_core::Step;

    #[test]
    fn session_opens_on_step_one() {
        let mut storage = MemoryStorage::new();
        storage
            .set_item("businessData", r#"{"configuration":{"name":"Saved"}}"#)
            .unwrap();
        let c = open_session(Box::new(storage), PlannerConfig::default());
        assert_eq!(c.current(), Step::Configuration);
        assert_eq!(c.data().configuration.name, "Saved");
    }
}
