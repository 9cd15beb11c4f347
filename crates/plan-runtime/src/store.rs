//! The single owned `BusinessData` record with partial-merge mutation and
//! debounced persistence to session storage.

use crate::debounce::Debouncer;
use persistence::SessionStorage;
use plan_core::{BusinessData, PlannerConfig, Step};
use serde_json::{Map, Value};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid field path {0:?}")]
    InvalidPath(String),
    /// The merged record no longer deserializes; the old record is kept.
    #[error("update rejected: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("suggestion for {0} cannot be applied to a non-scalar field")]
    NotApplicable(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Notifications for subscribers (the UI layer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// Top-level sections touched by a mutation.
    Changed { sections: Vec<String> },
    Persisted,
    Reset,
}

pub struct BusinessDataStore {
    storage: Box<dyn SessionStorage>,
    key: String,
    data: BusinessData,
    debouncer: Debouncer,
    subscribers: Vec<Sender<StoreEvent>>,
    writes: u64,
}

impl BusinessDataStore {
    /// Open the store, merging any saved blob over a default record.
    /// Unreadable or malformed saved data yields defaults.
    pub fn load(storage: Box<dyn SessionStorage>, cfg: &PlannerConfig) -> Self {
        let data = match storage.get_item(&cfg.storage_key) {
            Ok(Some(blob)) => Self::deserialize(&blob),
            Ok(None) => BusinessData::default(),
            Err(e) => {
                warn!(error = %e, "session storage unreadable; starting empty");
                BusinessData::default()
            }
        };
        info!(key = %cfg.storage_key, products = data.variable_costs.products.len(), "store loaded");
        Self {
            storage,
            key: cfg.storage_key.clone(),
            data,
            debouncer: Debouncer::new(Duration::from_millis(cfg.persist_debounce_ms)),
            subscribers: Vec::new(),
            writes: 0,
        }
    }

    pub fn get(&self) -> &BusinessData {
        &self.data
    }

    /// Value at a dotted path, e.g. `fixed_costs.staff.cook.quantity`.
    pub fn get_path(&self, path: &str) -> Option<Value> {
        let pointer = format!("/{}", path.replace('.', "/"));
        serde_json::to_value(&self.data).ok()?.pointer(&pointer).cloned()
    }

    /// Set one field by dotted path, e.g. `variable_costs.products.0.name`.
    ///
    /// Numeric segments index into arrays and must be in bounds. The owning
    /// top-level section is rewritten through [`mutate`](Self::mutate).
    pub fn set(&mut self, path: &str, value: Value, now: Instant) -> Result<Vec<String>, StoreError> {
        let invalid = || StoreError::InvalidPath(path.to_string());
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid());
        }
        let Some((section, rest)) = segments.split_first() else {
            return Err(invalid());
        };
        if Step::for_section(section).is_none() {
            return Err(invalid());
        }
        let mut current = serde_json::to_value(&self.data)?;
        let slot = current.get_mut(*section).ok_or_else(invalid)?;
        write_path(slot, rest, value).ok_or_else(invalid)?;
        let mut patch = Map::new();
        patch.insert((*section).to_string(), slot.take());
        self.mutate(Value::Object(patch), now)
    }

    /// Deep-merge `patch` into the record. Objects merge key by key; any
    /// other value (arrays included) replaces what was there. On failure the
    /// record is left untouched.
    ///
    /// Returns the top-level sections that changed. Pruning the prices or
    /// projections of removed products adds `pricing` or `projections`.
    pub fn mutate(&mut self, patch: Value, now: Instant) -> Result<Vec<String>, StoreError> {
        let Value::Object(ref top) = patch else {
            return Err(StoreError::InvalidPath("<root>".into()));
        };
        let mut sections: Vec<String> = top.keys().cloned().collect();
        if let Some(bad) = sections.iter().find(|s| Step::for_section(s).is_none()) {
            return Err(StoreError::InvalidPath(bad.clone()));
        }
        let mut current = serde_json::to_value(&self.data)?;
        merge(&mut current, patch);
        let mut next: BusinessData = serde_json::from_value(current)?;
        let prices = next.pricing.sale_prices.len();
        let projections = next.projections.monthly_units.len();
        let pruned = next.prune_orphans();
        if pruned > 0 {
            debug!(pruned, "dropped prices/projections of removed products");
            for (section, shrank) in [
                ("pricing", next.pricing.sale_prices.len() < prices),
                ("projections", next.projections.monthly_units.len() < projections),
            ] {
                if shrank && !sections.iter().any(|s| s == section) {
                    sections.push(section.to_string());
                }
            }
        }
        self.data = next;
        self.debouncer.schedule(now);
        self.notify(StoreEvent::Changed {
            sections: sections.clone(),
        });
        Ok(sections)
    }

    /// Serialize the whole record as one JSON blob.
    pub fn serialize(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(&self.data)?)
    }

    /// Parse a blob over a default record. Anything unparseable is treated as
    /// "no saved data".
    pub fn deserialize(blob: &str) -> BusinessData {
        let parsed = serde_json::from_str::<Value>(blob).and_then(|saved| {
            let mut base = serde_json::to_value(BusinessData::default())?;
            merge(&mut base, saved);
            serde_json::from_value::<BusinessData>(base)
        });
        match parsed {
            Ok(mut data) => {
                data.prune_orphans();
                data
            }
            Err(e) => {
                warn!(error = %e, "saved plan is malformed; using defaults");
                BusinessData::default()
            }
        }
    }

    /// Persist if the debounce window has elapsed. Returns whether a write happened.
    pub fn poll_persist(&mut self, now: Instant) -> Result<bool, StoreError> {
        if !self.debouncer.poll(now) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Write immediately, dropping any pending debounced write.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.debouncer.cancel();
        self.persist()
    }

    pub fn has_pending_write(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Number of writes issued to session storage.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let blob = self.serialize()?;
        self.storage.set_item(&self.key, &blob)?;
        self.writes += 1;
        debug!(key = %self.key, bytes = blob.len(), "plan persisted");
        self.notify(StoreEvent::Persisted);
        Ok(())
    }

    /// Clear the session entry and start over with a default record.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.debouncer.cancel();
        self.storage.remove_item(&self.key)?;
        self.data = BusinessData::default();
        info!(key = %self.key, "plan reset");
        self.notify(StoreEvent::Reset);
        Ok(())
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Write `value` at `segments` below `target`. Missing object keys are
/// created; array segments must be in-bounds indices.
fn write_path(target: &mut Value, segments: &[&str], value: Value) -> Option<()> {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return Some(());
    };
    if target.is_null() {
        *target = Value::Object(Map::new());
    }
    let slot = match target {
        Value::Object(map) => map.entry((*head).to_string()).or_insert(Value::Null),
        Value::Array(items) => items.get_mut(head.parse::<usize>().ok()?)?,
        _ => return None,
    };
    write_path(slot, rest, value)
}

pub(crate) fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(b), Value::Object(p)) => {
            for (k, v) in p {
                match b.get_mut(&k) {
                    Some(slot) => merge(slot, v),
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::MemoryStorage;
    use plan_core::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    /// Storage handle whose contents stay visible to the test after the
    /// store takes ownership of a clone.
    #[derive(Clone, Default)]
    struct Shared(std::rc::Rc<std::cell::RefCell<MemoryStorage>>);

    impl SessionStorage for Shared {
        fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.0.borrow().get_item(key)
        }
        fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
            self.0.borrow_mut().set_item(key, value)
        }
        fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
            self.0.borrow_mut().remove_item(key)
        }
    }

    fn store() -> (BusinessDataStore, Shared) {
        let shared = Shared::default();
        let s = BusinessDataStore::load(Box::new(shared.clone()), &PlannerConfig::default());
        (s, shared)
    }

    #[test]
    fn set_merges_without_erasing_siblings() {
        let (mut s, _) = store();
        let t = Instant::now();
        s.set("configuration.capacity", json!(40), t).unwrap();
        s.set("configuration.location_text", json!("Cumbayá"), t).unwrap();
        s.set("fixed_costs.rent", json!("400"), t).unwrap();
        assert_eq!(s.get().configuration.capacity, 40);
        assert_eq!(s.get().configuration.location_text, "Cumbayá");
        assert_eq!(s.get().fixed_costs.rent, Decimal::new(400, 0));
        assert_eq!(s.get_path("configuration.capacity"), Some(json!(40)));
    }

    #[test]
    fn rejected_patch_keeps_old_record() {
        let (mut s, _) = store();
        let t = Instant::now();
        s.set("configuration.capacity", json!(40), t).unwrap();
        let before = s.get().clone();
        assert!(matches!(
            s.set("configuration.capacity", json!("many"), t),
            Err(StoreError::Shape(_))
        ));
        assert!(matches!(s.set("bogus.field", json!(1), t), Err(StoreError::InvalidPath(_))));
        assert!(matches!(s.set("configuration..x", json!(1), t), Err(StoreError::InvalidPath(_))));
        assert_eq!(s.get(), &before);
    }

    #[test]
    fn persistence_is_debounced() {
        let (mut s, shared) = store();
        let t0 = Instant::now();
        for (i, ms) in [0u64, 100, 200, 250].into_iter().enumerate() {
            s.set("configuration.name", json!(format!("v{i}")), t0 + Duration::from_millis(ms))
                .unwrap();
            assert!(!s.poll_persist(t0 + Duration::from_millis(ms)).unwrap());
        }
        assert!(!s.poll_persist(t0 + Duration::from_millis(549)).unwrap());
        assert!(s.poll_persist(t0 + Duration::from_millis(550)).unwrap());
        assert_eq!(s.writes(), 1);
        let blob = shared.get_item("businessData").unwrap().unwrap();
        assert_eq!(BusinessDataStore::deserialize(&blob).configuration.name, "v3");
    }

    #[test]
    fn removing_a_product_prunes_its_price() {
        let (mut s, _) = store();
        let t = Instant::now();
        s.mutate(
            json!({
                "variable_costs": {"products": [{"id": 1, "name": "Ceviche"}, {"id": 2, "name": "Jugo"}]},
                "pricing": {"sale_prices": {"1": "9.50", "2": "2.00"}},
                "projections": {"monthly_units": {"2": 80}}
            }),
            t,
        )
        .unwrap();
        let sections = s
            .set("variable_costs.products", json!([{"id": 1, "name": "Ceviche"}]), t)
            .unwrap();
        assert_eq!(sections, vec!["variable_costs", "pricing", "projections"]);
        assert!(s.get().orphan_references().is_empty());
        assert_eq!(s.get().pricing.sale_prices.len(), 1);
        assert!(s.get().projections.monthly_units.is_empty());
    }

    #[test]
    fn set_indexes_into_arrays() {
        let (mut s, _) = store();
        let t = Instant::now();
        s.mutate(
            json!({
                "variable_costs": {"products": [{"id": 1, "name": "Ceviche"}, {"id": 2, "name": "Jugo"}]},
                "fixed_costs": {"other_costs": ["10", "20"]}
            }),
            t,
        )
        .unwrap();
        let sections = s
            .set("variable_costs.products.0.name", json!("Ceviche mixto"), t)
            .unwrap();
        assert_eq!(sections, vec!["variable_costs"]);
        s.set("fixed_costs.other_costs.1", json!("25"), t).unwrap();
        assert_eq!(s.get().variable_costs.products[0].name, "Ceviche mixto");
        assert_eq!(s.get().variable_costs.products[1].name, "Jugo");
        assert_eq!(
            s.get().fixed_costs.other_costs,
            vec![Decimal::new(10, 0), Decimal::new(25, 0)]
        );
        assert_eq!(s.get_path("variable_costs.products.1.name"), Some(json!("Jugo")));

        let before = s.get().clone();
        assert!(matches!(
            s.set("fixed_costs.other_costs.5", json!("1"), t),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            s.set("variable_costs.products.first.name", json!("x"), t),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            s.set("fixed_costs.rent.amount", json!("1"), t),
            Err(StoreError::InvalidPath(_))
        ));
        assert_eq!(s.get(), &before);
    }

    #[test]
    fn malformed_blob_loads_defaults() {
        let shared = Shared::default();
        shared.0.borrow_mut().set_item("businessData", "{not json").unwrap();
        let s = BusinessDataStore::load(Box::new(shared.clone()), &PlannerConfig::default());
        assert_eq!(s.get(), &BusinessData::default());
        let partial = BusinessDataStore::deserialize(r#"{"fixed_costs":{"rent":"350"}}"#);
        assert_eq!(partial.fixed_costs.rent, Decimal::new(350, 0));
        assert_eq!(partial.investment.loan_term_months, 24);
        assert_eq!(BusinessDataStore::deserialize("[1,2]"), BusinessData::default());
    }

    #[test]
    fn reset_clears_storage_and_notifies() {
        let (mut s, shared) = store();
        let rx = s.subscribe();
        let t = Instant::now();
        s.set("configuration.name", json!("Mi local"), t).unwrap();
        s.flush().unwrap();
        assert!(shared.get_item("businessData").unwrap().is_some());
        s.reset().unwrap();
        assert!(shared.get_item("businessData").unwrap().is_none());
        assert_eq!(s.get(), &BusinessData::default());
        let events: Vec<StoreEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                StoreEvent::Changed { sections: vec!["configuration".into()] },
                StoreEvent::Persisted,
                StoreEvent::Reset,
            ]
        );
        assert!(!s.has_pending_write());
    }

    proptest! {
        #[test]
        fn serialize_roundtrip(area in 1i64..100_000,
                               capacity in 0u32..500,
                               rent in 0i64..10_000_000,
                               salary in 0i64..1_000_000,
                               price in 0i64..100_000,
                               name in "[a-zA-Z áéíóúñ]{0,20}") {
            let (mut s, _) = store();
            let mut d = BusinessData::default();
            d.configuration.name = name.clone();
            d.configuration.area_m2 = Decimal::new(area, 1);
            d.configuration.capacity = capacity;
            d.configuration.business_type = Some(BusinessType::Bakery);
            d.fixed_costs.rent = Decimal::new(rent, 2);
            d.fixed_costs.utilities_in_rent = UtilityBundle::Electricity;
            d.fixed_costs.staff.insert(StaffRole::Waiter, StaffLine { quantity: 2, salary_per_person: Decimal::new(salary, 2) });
            d.variable_costs.products.push(Product { id: ProductId(3), name, ..Product::default() });
            d.pricing.sale_prices.insert(ProductId(3), Decimal::new(price, 2));
            s.mutate(serde_json::to_value(&d).unwrap(), Instant::now()).unwrap();
            prop_assert_eq!(s.get(), &d);
            let blob = s.serialize().unwrap();
            prop_assert_eq!(BusinessDataStore::deserialize(&blob), d);
        }
    }
}
