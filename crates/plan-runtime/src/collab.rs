//! Collaborator seams: session gating and saved-simulation listing.
//!
//! Neither authentication nor long-term storage lives here; the host
//! provides both through these traits.

use chrono::{DateTime, Utc};
use plan_ai::advisories::{advisories, Advisory};
use plan_core::BusinessData;
use plan_econ::{Decision, Metrics};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

/// Read-only view of the host's auth session.
pub trait SessionGate {
    fn is_authenticated(&self) -> bool;
    fn is_demo_mode(&self) -> bool;
    fn has_premium_access(&self) -> bool;
}

/// Snapshot handed to the listing module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub data: BusinessData,
    pub viability_score: u8,
    pub total_investment: Decimal,
}

pub type SimulationId = u64;

pub trait SimulationRepository {
    fn save_simulation(&mut self, record: SimulationRecord) -> anyhow::Result<SimulationId>;
    fn list_simulations(&self) -> anyhow::Result<Vec<(SimulationId, SimulationRecord)>>;
    /// Returns whether something was deleted.
    fn delete_simulation(&mut self, id: SimulationId) -> anyhow::Result<bool>;
}

/// Process-local repository.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRepository {
    next_id: SimulationId,
    records: BTreeMap<SimulationId, SimulationRecord>,
}

impl SimulationRepository for InMemoryRepository {
    fn save_simulation(&mut self, record: SimulationRecord) -> anyhow::Result<SimulationId> {
        self.next_id += 1;
        self.records.insert(self.next_id, record);
        Ok(self.next_id)
    }

    fn list_simulations(&self) -> anyhow::Result<Vec<(SimulationId, SimulationRecord)>> {
        Ok(self
            .records
            .iter()
            .map(|(id, r)| (*id, r.clone()))
            .collect())
    }

    fn delete_simulation(&mut self, id: SimulationId) -> anyhow::Result<bool> {
        Ok(self.records.remove(&id).is_some())
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("sign in to save simulations")]
    NotAuthenticated,
    #[error("saving is disabled in demo mode")]
    DemoMode,
    #[error("report export requires premium access")]
    PremiumRequired,
    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

/// Save a snapshot with its score and total investment.
pub fn save_simulation(
    gate: &dyn SessionGate,
    repo: &mut dyn SimulationRepository,
    data: &BusinessData,
    metrics: &Metrics,
    now: DateTime<Utc>,
) -> Result<SimulationId, ActionError> {
    if !gate.is_authenticated() {
        return Err(ActionError::NotAuthenticated);
    }
    if gate.is_demo_mode() {
        return Err(ActionError::DemoMode);
    }
    let name = match data.configuration.name.trim() {
        "" => "Untitled plan".to_string(),
        n => n.to_string(),
    };
    let record = SimulationRecord {
        name,
        saved_at: now,
        data: data.clone(),
        viability_score: metrics.viability_score,
        total_investment: metrics.total_expenses,
    };
    let id = repo.save_simulation(record)?;
    info!(id, score = metrics.viability_score, "simulation saved");
    Ok(id)
}

#[derive(Debug, Serialize)]
struct ExportedReport<'a> {
    generated_at: DateTime<Utc>,
    business_name: &'a str,
    decision: Decision,
    viability_score: u8,
    metrics: &'a Metrics,
    advisories: Vec<Advisory>,
    data: &'a BusinessData,
}

/// Pretty JSON report of the plan and its metrics.
pub fn export_report(
    gate: &dyn SessionGate,
    data: &BusinessData,
    metrics: &Metrics,
    now: DateTime<Utc>,
) -> Result<String, ActionError> {
    if !gate.has_premium_access() {
        return Err(ActionError::PremiumRequired);
    }
    let report = ExportedReport {
        generated_at: now,
        business_name: &data.configuration.name,
        decision: metrics.decision,
        viability_score: metrics.viability_score,
        metrics,
        advisories: advisories(metrics),
        data,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use plan_core::{ExpenseCategory, PlannerConfig};

    struct Gate {
        auth: bool,
        demo: bool,
        premium: bool,
    }

    impl SessionGate for Gate {
        fn is_authenticated(&self) -> bool {
            self.auth
        }
        fn is_demo_mode(&self) -> bool {
            self.demo
        }
        fn has_premium_access(&self) -> bool {
            self.premium
        }
    }

    fn plan() -> (BusinessData, Metrics) {
        let mut d = BusinessData::default();
        d.configuration.name = "Café Ruta".into();
        d.investment.expenses.insert(ExpenseCategory::Equipment, Decimal::new(12000, 0));
        let m = Metrics::compute(&d, &PlannerConfig::default()).unwrap();
        (d, m)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn save_requires_a_real_session() {
        let (d, m) = plan();
        let mut repo = InMemoryRepository::default();
        let anon = Gate { auth: false, demo: false, premium: false };
        assert!(matches!(
            save_simulation(&anon, &mut repo, &d, &m, now()),
            Err(ActionError::NotAuthenticated)
        ));
        let demo = Gate { auth: true, demo: true, premium: true };
        assert!(matches!(
            save_simulation(&demo, &mut repo, &d, &m, now()),
            Err(ActionError::DemoMode)
        ));
        let user = Gate { auth: true, demo: false, premium: false };
        let id = save_simulation(&user, &mut repo, &d, &m, now()).unwrap();
        let listed = repo.list_simulations().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, id);
        assert_eq!(listed[0].1.total_investment, Decimal::new(12000, 0));
        assert_eq!(listed[0].1.name, "Café Ruta");
        assert!(repo.delete_simulation(id).unwrap());
        assert!(!repo.delete_simulation(id).unwrap());
    }

    #[test]
    fn export_is_premium_pretty_json() {
        let (d, m) = plan();
        let free = Gate { auth: true, demo: false, premium: false };
        assert!(matches!(
            export_report(&free, &d, &m, now()),
            Err(ActionError::PremiumRequired)
        ));
        let premium = Gate { auth: true, demo: false, premium: true };
        let json = export_report(&premium, &d, &m, now()).unwrap();
        assert!(json.contains('\n'));
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["business_name"], "Café Ruta");
        assert_eq!(v["generated_at"], "2024-03-01T12:00:00Z");
        assert_eq!(v["decision"], "not_recommended");
    }
}
