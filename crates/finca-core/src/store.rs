//! Persistence seams for the learning engine.
//!
//! The engine only needs narrow, keyed access: movements by id or learn
//! key, rules by learn key, and an append-only log. [`MemoryStore`] is the
//! in-process reference implementation used by the tests and by callers
//! without a real backend.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::models::movement::{LearningLogEntry, LearningRule, Movement};

/// Keyed access to bank movements.
pub trait MovementStore {
    fn get_movement(&self, id: &str) -> Result<Option<Movement>, StoreError>;

    fn put_movement(&mut self, movement: Movement) -> Result<(), StoreError>;

    /// All movements currently stamped with `learn_key`, in no particular
    /// order.
    fn movements_by_learn_key(&self, learn_key: &str) -> Result<Vec<Movement>, StoreError>;
}

/// Keyed access to learning rules. One rule per learn key.
pub trait RuleStore {
    fn get_rule(&self, learn_key: &str) -> Result<Option<LearningRule>, StoreError>;

    fn upsert_rule(&mut self, rule: LearningRule) -> Result<(), StoreError>;
}

/// Append-only audit log.
pub trait LearningLog {
    fn append(&mut self, entry: LearningLogEntry) -> Result<(), StoreError>;
}

/// In-memory store backing the learning engine.
#[derive(Debug, Default)]
pub struct MemoryStore {
    movements: HashMap<String, Movement>,
    rules: HashMap<String, LearningRule>,
    log: Vec<LearningLogEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_movement(&mut self, movement: Movement) {
        self.movements.insert(movement.id.clone(), movement);
    }

    pub fn movement(&self, id: &str) -> Option<&Movement> {
        self.movements.get(id)
    }

    pub fn rules(&self) -> impl Iterator<Item = &LearningRule> {
        self.rules.values()
    }

    pub fn log_entries(&self) -> &[LearningLogEntry] {
        &self.log
    }
}

impl MovementStore for MemoryStore {
    fn get_movement(&self, id: &str) -> Result<Option<Movement>, StoreError> {
        Ok(self.movements.get(id).cloned())
    }

    fn put_movement(&mut self, movement: Movement) -> Result<(), StoreError> {
        self.movements.insert(movement.id.clone(), movement);
        Ok(())
    }

    fn movements_by_learn_key(&self, learn_key: &str) -> Result<Vec<Movement>, StoreError> {
        Ok(self
            .movements
            .values()
            .filter(|m| m.learn_key.as_deref() == Some(learn_key))
            .cloned()
            .collect())
    }
}

impl RuleStore for MemoryStore {
    fn get_rule(&self, learn_key: &str) -> Result<Option<LearningRule>, StoreError> {
        Ok(self.rules.get(learn_key).cloned())
    }

    fn upsert_rule(&mut self, rule: LearningRule) -> Result<(), StoreError> {
        self.rules.insert(rule.learn_key.clone(), rule);
        Ok(())
    }
}

impl LearningLog for MemoryStore {
    fn append(&mut self, entry: LearningLogEntry) -> Result<(), StoreError> {
        self.log.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    use crate::models::movement::ReconciliationStatus;

    fn movement(id: &str, learn_key: Option<&str>) -> Movement {
        Movement {
            id: id.to_string(),
            account_id: "acc-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            description: "RECIBO LUZ".to_string(),
            counterparty: "ENDESA".to_string(),
            amount: Decimal::new(-4550, 2),
            status: ReconciliationStatus::Unmatched,
            learn_key: learn_key.map(str::to_string),
            category: None,
            scope: None,
            property_id: None,
        }
    }

    #[test]
    fn test_movements_by_learn_key_filters() {
        let mut store = MemoryStore::new();
        store.insert_movement(movement("m1", Some("ENDESA|RECIBO")));
        store.insert_movement(movement("m2", Some("ENDESA|RECIBO")));
        store.insert_movement(movement("m3", Some("IBERDROLA|RECIBO")));
        store.insert_movement(movement("m4", None));

        let mut hits = store.movements_by_learn_key("ENDESA|RECIBO").unwrap();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        let ids: Vec<&str> = hits.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_put_movement_overwrites() {
        let mut store = MemoryStore::new();
        store.insert_movement(movement("m1", None));

        let mut updated = movement("m1", Some("ENDESA|RECIBO"));
        updated.status = ReconciliationStatus::AutoMatched;
        store.put_movement(updated).unwrap();

        let stored = store.movement("m1").unwrap();
        assert_eq!(stored.status, ReconciliationStatus::AutoMatched);
        assert_eq!(stored.learn_key.as_deref(), Some("ENDESA|RECIBO"));
    }
}
