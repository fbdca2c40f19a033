//! Reconciliation rule creation, backfill, and application on import.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{LearningError, StoreError};
use crate::models::movement::{
    LearningLogEntry, LearningRule, LogAction, Movement, ReconciliationPeriod,
    ReconciliationStatus, RuleScope, RuleSource,
};
use crate::store::{LearningLog, MovementStore, RuleStore};

use super::learn_key::build_learn_key;

/// What a backfill touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillOutcome {
    /// Movements updated in this pass.
    pub updated: usize,
    /// Candidates matching the key, account, and period.
    pub total: usize,
}

/// Scoping for the backfill triggered by a manual reconciliation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackfillOptions {
    /// Date range to backfill. Defaults to the calendar year of the
    /// reconciled movement.
    pub period: Option<ReconciliationPeriod>,
    /// Cap on updated movements, oldest first. No cap when absent.
    pub limit: Option<usize>,
}

/// The movement learning engine over a persistence collaborator.
pub struct LearningEngine<S> {
    store: S,
}

impl<S> LearningEngine<S>
where
    S: MovementStore + RuleStore + LearningLog,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Manually reconcile a movement: upsert the rule for its learn key,
    /// mark the movement `ManualMatched`, and backfill its siblings.
    ///
    /// The backfill stays inside the movement's account and the requested
    /// period. Validation failures leave the store untouched.
    pub fn perform_manual_reconciliation(
        &mut self,
        movement_id: &str,
        category: &str,
        scope: RuleScope,
        property_id: Option<&str>,
        options: BackfillOptions,
    ) -> Result<BackfillOutcome, LearningError> {
        let category = category.trim();
        if category.is_empty() {
            return Err(LearningError::InvalidRuleArguments(
                "falta la categoría".to_string(),
            ));
        }
        if scope == RuleScope::Property && property_id.is_none() {
            return Err(LearningError::InvalidRuleArguments(
                "falta el inmueble para el ámbito de propiedad".to_string(),
            ));
        }

        let mut movement = self
            .store
            .get_movement(movement_id)?
            .ok_or_else(|| LearningError::MovementNotFound(movement_id.to_string()))?;

        let learn_key = build_learn_key(&movement.counterparty, &movement.description);
        let now = Utc::now();

        let (rule, action) = match self.store.get_rule(&learn_key)? {
            Some(existing) => {
                let mut rule = existing;
                rule.category = category.to_string();
                rule.scope = scope;
                rule.property_id = property_id.map(str::to_string);
                rule.source = RuleSource::Manual;
                rule.updated_at = now;
                (rule, LogAction::UpdateRule)
            }
            None => (
                LearningRule {
                    learn_key: learn_key.clone(),
                    category: category.to_string(),
                    scope,
                    property_id: property_id.map(str::to_string),
                    source: RuleSource::Manual,
                    created_at: now,
                    updated_at: now,
                },
                LogAction::CreateRule,
            ),
        };
        self.store.upsert_rule(rule.clone())?;
        self.log(action, &rule, None)?;
        info!(learn_key = %rule.learn_key, action = ?action, "rule upserted");

        movement.status = ReconciliationStatus::ManualMatched;
        movement.learn_key = Some(learn_key.clone());
        movement.category = Some(rule.category.clone());
        movement.scope = Some(rule.scope);
        movement.property_id = rule.property_id.clone();
        let account_id = movement.account_id.clone();
        let date = movement.date;
        self.store.put_movement(movement)?;

        let period = options
            .period
            .unwrap_or_else(|| ReconciliationPeriod::calendar_year(date));
        self.backfill(&rule, movement_id, &account_id, period, options.limit)
    }

    /// Apply stored rules to a freshly imported batch.
    ///
    /// Every `Unmatched` movement gets its learn key stamped; those with a
    /// matching rule become `AutoMatched`. Movements already matched pass
    /// through untouched, which makes re-importing the same batch a no-op.
    pub fn apply_rules_on_import(
        &mut self,
        movements: Vec<Movement>,
    ) -> Result<Vec<Movement>, LearningError> {
        let mut out = Vec::with_capacity(movements.len());
        let mut applied_per_rule: HashMap<String, (LearningRule, usize)> = HashMap::new();

        for mut movement in movements {
            if movement.status != ReconciliationStatus::Unmatched {
                out.push(movement);
                continue;
            }

            let learn_key = build_learn_key(&movement.counterparty, &movement.description);
            let mut changed = movement.learn_key.as_deref() != Some(&learn_key);
            movement.learn_key = Some(learn_key.clone());

            if let Some(rule) = self.store.get_rule(&learn_key)? {
                movement.status = ReconciliationStatus::AutoMatched;
                movement.category = Some(rule.category.clone());
                movement.scope = Some(rule.scope);
                movement.property_id = rule.property_id.clone();
                changed = true;
                applied_per_rule
                    .entry(learn_key)
                    .or_insert_with(|| (rule, 0))
                    .1 += 1;
            }

            if changed {
                self.store.put_movement(movement.clone())?;
            }
            out.push(movement);
        }

        for (learn_key, (rule, count)) in applied_per_rule {
            debug!(learn_key = %learn_key, count, "rule applied on import");
            self.log(LogAction::ApplyRule, &rule, Some(count))?;
        }

        Ok(out)
    }

    /// Backfill `Unmatched` siblings of a freshly upserted rule.
    ///
    /// Candidates share the learn key and account and fall inside the
    /// period. Oldest first, up to `limit`. A failing row is skipped, not
    /// fatal for the rest of the pass.
    fn backfill(
        &mut self,
        rule: &LearningRule,
        source_movement_id: &str,
        account_id: &str,
        period: ReconciliationPeriod,
        limit: Option<usize>,
    ) -> Result<BackfillOutcome, LearningError> {
        let mut candidates: Vec<Movement> = self
            .store
            .movements_by_learn_key(&rule.learn_key)?
            .into_iter()
            .filter(|m| {
                m.id != source_movement_id
                    && m.account_id == account_id
                    && m.status == ReconciliationStatus::Unmatched
                    && period.contains(m.date)
            })
            .collect();
        candidates.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        let total = candidates.len();
        let take = limit.unwrap_or(total);
        let mut updated = 0;

        for mut movement in candidates.into_iter().take(take) {
            movement.status = ReconciliationStatus::AutoMatched;
            movement.category = Some(rule.category.clone());
            movement.scope = Some(rule.scope);
            movement.property_id = rule.property_id.clone();
            match self.store.put_movement(movement) {
                Ok(()) => updated += 1,
                Err(err) => warn!("backfill row skipped: {err}"),
            }
        }

        self.log(LogAction::Backfill, rule, Some(updated))?;
        info!(
            learn_key = %rule.learn_key,
            updated, total, "backfill finished"
        );
        Ok(BackfillOutcome { updated, total })
    }

    // The log entry carries the learn key and rule fields only. Raw
    // descriptions and account ids stay out of it.
    fn log(
        &mut self,
        action: LogAction,
        rule: &LearningRule,
        affected_count: Option<usize>,
    ) -> Result<(), StoreError> {
        self.store.append(LearningLogEntry {
            timestamp: Utc::now(),
            action,
            learn_key: rule.learn_key.clone(),
            category: rule.category.clone(),
            scope: rule.scope,
            property_id: rule.property_id.clone(),
            affected_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    use crate::store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn movement(id: &str, account: &str, when: NaiveDate, description: &str) -> Movement {
        Movement {
            id: id.to_string(),
            account_id: account.to_string(),
            date: when,
            description: description.to_string(),
            counterparty: "ENDESA ESPAÑA SA".to_string(),
            amount: Decimal::new(-4550, 2),
            status: ReconciliationStatus::Unmatched,
            learn_key: None,
            category: None,
            scope: None,
            property_id: None,
        }
    }

    fn engine_with(movements: Vec<Movement>) -> LearningEngine<MemoryStore> {
        let mut store = MemoryStore::new();
        for m in movements {
            store.insert_movement(m);
        }
        LearningEngine::new(store)
    }

    #[test]
    fn test_empty_category_rejected() {
        let mut engine = engine_with(vec![movement(
            "m1",
            "acc-1",
            date(2024, 1, 15),
            "RECIBO LUZ ENE2024",
        )]);
        let err = engine
            .perform_manual_reconciliation("m1", "  ", RuleScope::Personal, None, Default::default())
            .unwrap_err();
        assert!(matches!(err, LearningError::InvalidRuleArguments(_)));
        assert!(err.to_string().starts_with("No se pudo crear la regla"));
        assert_eq!(engine.store().rules().count(), 0);
    }

    #[test]
    fn test_property_scope_requires_property_id() {
        let mut engine = engine_with(vec![movement(
            "m1",
            "acc-1",
            date(2024, 1, 15),
            "RECIBO LUZ ENE2024",
        )]);
        let err = engine
            .perform_manual_reconciliation(
                "m1",
                "Suministros",
                RuleScope::Property,
                None,
                Default::default(),
            )
            .unwrap_err();
        assert!(matches!(err, LearningError::InvalidRuleArguments(_)));
    }

    #[test]
    fn test_missing_movement() {
        let mut engine = engine_with(vec![]);
        let err = engine
            .perform_manual_reconciliation(
                "nope",
                "Suministros",
                RuleScope::Personal,
                None,
                Default::default(),
            )
            .unwrap_err();
        assert!(matches!(err, LearningError::MovementNotFound(_)));
    }

    #[test]
    fn test_manual_reconciliation_creates_rule_and_backfills() {
        let mut engine = engine_with(vec![]);
        // Importing stamps the learn keys the backfill looks up.
        engine
            .apply_rules_on_import(vec![
                movement("m1", "acc-1", date(2024, 3, 15), "RECIBO LUZ MAR2024 REF3"),
                movement("m2", "acc-1", date(2024, 1, 15), "RECIBO LUZ ENE2024 REF1"),
                movement("m3", "acc-1", date(2024, 2, 15), "RECIBO ELECTRICIDAD FEB2024"),
                // Other account: untouched.
                movement("m4", "acc-2", date(2024, 1, 20), "RECIBO LUZ ENE2024"),
                // Other year: outside the default period.
                movement("m5", "acc-1", date(2025, 1, 15), "RECIBO LUZ ENE2025"),
            ])
            .unwrap();

        let outcome = engine
            .perform_manual_reconciliation(
                "m1",
                "Suministros",
                RuleScope::Property,
                Some("piso-centro"),
                Default::default(),
            )
            .unwrap();
        assert_eq!(outcome, BackfillOutcome { updated: 2, total: 2 });

        let store = engine.store();
        let m1 = store.movement("m1").unwrap();
        assert_eq!(m1.status, ReconciliationStatus::ManualMatched);
        assert_eq!(m1.category.as_deref(), Some("Suministros"));
        assert_eq!(m1.property_id.as_deref(), Some("piso-centro"));
        assert_eq!(m1.learn_key.as_deref(), Some("ENDESA-ESPANA|RECIBO"));

        for id in ["m2", "m3"] {
            let sibling = store.movement(id).unwrap();
            assert_eq!(sibling.status, ReconciliationStatus::AutoMatched);
            assert_eq!(sibling.category.as_deref(), Some("Suministros"));
        }
        assert_eq!(
            store.movement("m4").unwrap().status,
            ReconciliationStatus::Unmatched
        );
        assert_eq!(
            store.movement("m5").unwrap().status,
            ReconciliationStatus::Unmatched
        );

        let actions: Vec<LogAction> =
            store.log_entries().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![LogAction::CreateRule, LogAction::Backfill]);
    }

    #[test]
    fn test_backfill_limit_oldest_first() {
        // Siblings need stamped learn keys to be reachable by the backfill.
        let mut engine = engine_with(vec![]);
        let batch = vec![
            movement("m1", "acc-1", date(2024, 6, 1), "RECIBO LUZ JUN2024"),
            movement("m2", "acc-1", date(2024, 1, 1), "RECIBO LUZ ENE2024"),
            movement("m3", "acc-1", date(2024, 2, 1), "RECIBO LUZ FEB2024"),
            movement("m4", "acc-1", date(2024, 3, 1), "RECIBO LUZ MAR2024"),
        ];
        engine.apply_rules_on_import(batch).unwrap();

        let outcome = engine
            .perform_manual_reconciliation(
                "m1",
                "Suministros",
                RuleScope::Personal,
                None,
                BackfillOptions {
                    period: None,
                    limit: Some(2),
                },
            )
            .unwrap();
        assert_eq!(outcome, BackfillOutcome { updated: 2, total: 3 });

        let store = engine.store();
        assert_eq!(
            store.movement("m2").unwrap().status,
            ReconciliationStatus::AutoMatched
        );
        assert_eq!(
            store.movement("m3").unwrap().status,
            ReconciliationStatus::AutoMatched
        );
        // Newest candidate falls past the cap.
        assert_eq!(
            store.movement("m4").unwrap().status,
            ReconciliationStatus::Unmatched
        );
    }

    #[test]
    fn test_explicit_period_spans_years() {
        let mut engine = engine_with(vec![
            movement("m1", "acc-1", date(2024, 12, 15), "RECIBO LUZ DIC2024"),
        ]);
        let mut old = movement("m2", "acc-1", date(2023, 12, 15), "RECIBO LUZ DIC2023");
        old.learn_key = Some("ENDESA-ESPANA|RECIBO".to_string());
        let mut store = engine.into_store();
        store.insert_movement(old);
        let mut engine = LearningEngine::new(store);

        let outcome = engine
            .perform_manual_reconciliation(
                "m1",
                "Suministros",
                RuleScope::Personal,
                None,
                BackfillOptions {
                    period: Some(ReconciliationPeriod::new(
                        date(2023, 1, 1),
                        date(2024, 12, 31),
                    )),
                    limit: None,
                },
            )
            .unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(
            engine.store().movement("m2").unwrap().status,
            ReconciliationStatus::AutoMatched
        );
    }

    #[test]
    fn test_second_manual_reconciliation_updates_rule() {
        let mut engine = engine_with(vec![
            movement("m1", "acc-1", date(2024, 1, 15), "RECIBO LUZ ENE2024"),
            movement("m2", "acc-1", date(2024, 2, 15), "RECIBO LUZ FEB2024"),
        ]);

        engine
            .perform_manual_reconciliation(
                "m1",
                "Suministros",
                RuleScope::Personal,
                None,
                Default::default(),
            )
            .unwrap();
        engine
            .perform_manual_reconciliation(
                "m2",
                "Gastos piso",
                RuleScope::Property,
                Some("piso-centro"),
                Default::default(),
            )
            .unwrap();

        let store = engine.store();
        assert_eq!(store.rules().count(), 1);
        let rule = store.rules().next().unwrap();
        assert_eq!(rule.category, "Gastos piso");
        assert_eq!(rule.scope, RuleScope::Property);
        assert_eq!(rule.source, RuleSource::Manual);

        let actions: Vec<LogAction> =
            store.log_entries().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                LogAction::CreateRule,
                LogAction::Backfill,
                LogAction::UpdateRule,
                LogAction::Backfill,
            ]
        );
    }

    #[test]
    fn test_apply_rules_on_import() {
        let mut engine = engine_with(vec![movement(
            "m0",
            "acc-1",
            date(2024, 1, 15),
            "RECIBO LUZ ENE2024",
        )]);
        engine
            .perform_manual_reconciliation(
                "m0",
                "Suministros",
                RuleScope::Personal,
                None,
                Default::default(),
            )
            .unwrap();

        let batch = vec![
            movement("m1", "acc-1", date(2024, 2, 15), "RECIBO LUZ FEB2024"),
            movement("m2", "acc-9", date(2024, 2, 20), "RECIBO LUZ FEB2024"),
        ];
        let out = engine.apply_rules_on_import(batch).unwrap();

        // Import-time application is not account scoped.
        for m in &out {
            assert_eq!(m.status, ReconciliationStatus::AutoMatched);
            assert_eq!(m.category.as_deref(), Some("Suministros"));
            assert_eq!(m.learn_key.as_deref(), Some("ENDESA-ESPANA|RECIBO"));
        }

        let apply_entries: Vec<&LearningLogEntry> = engine
            .store()
            .log_entries()
            .iter()
            .filter(|e| e.action == LogAction::ApplyRule)
            .collect();
        assert_eq!(apply_entries.len(), 1);
        assert_eq!(apply_entries[0].affected_count, Some(2));
    }

    #[test]
    fn test_import_is_idempotent() {
        let mut engine = engine_with(vec![movement(
            "m0",
            "acc-1",
            date(2024, 1, 15),
            "RECIBO LUZ ENE2024",
        )]);
        engine
            .perform_manual_reconciliation(
                "m0",
                "Suministros",
                RuleScope::Personal,
                None,
                Default::default(),
            )
            .unwrap();

        let batch = vec![movement("m1", "acc-1", date(2024, 2, 15), "RECIBO LUZ FEB2024")];
        let first = engine.apply_rules_on_import(batch).unwrap();
        let log_len = engine.store().log_entries().len();

        // Re-import the already matched batch.
        let second = engine.apply_rules_on_import(first.clone()).unwrap();
        assert_eq!(second[0].status, first[0].status);
        assert_eq!(second[0].category, first[0].category);
        assert_eq!(engine.store().log_entries().len(), log_len);
    }

    #[test]
    fn test_manual_match_never_auto_overwritten() {
        let mut engine = engine_with(vec![
            movement("m0", "acc-1", date(2024, 1, 15), "RECIBO LUZ ENE2024"),
        ]);
        engine
            .perform_manual_reconciliation(
                "m0",
                "Suministros",
                RuleScope::Personal,
                None,
                Default::default(),
            )
            .unwrap();

        let mut pinned = movement("m1", "acc-1", date(2024, 2, 15), "RECIBO LUZ FEB2024");
        pinned.status = ReconciliationStatus::ManualMatched;
        pinned.category = Some("Otra categoría".to_string());
        let out = engine.apply_rules_on_import(vec![pinned]).unwrap();

        assert_eq!(out[0].status, ReconciliationStatus::ManualMatched);
        assert_eq!(out[0].category.as_deref(), Some("Otra categoría"));
    }

    #[test]
    fn test_log_never_contains_descriptions_or_accounts() {
        let mut engine = engine_with(vec![movement(
            "m1",
            "acc-secreto-1",
            date(2024, 1, 15),
            "RECIBO LUZ ENE2024 REF-PRIVADA",
        )]);
        engine
            .perform_manual_reconciliation(
                "m1",
                "Suministros",
                RuleScope::Personal,
                None,
                Default::default(),
            )
            .unwrap();

        let json = serde_json::to_string(engine.store().log_entries()).unwrap();
        assert!(!json.contains("acc-secreto-1"));
        assert!(!json.contains("REF-PRIVADA"));
    }
}
