//! Bank movement, learning rule, and audit log models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reconciliation state machine per movement:
/// `Unmatched → {AutoMatched | ManualMatched}`. `ManualMatched` is terminal
/// for automatic passes; `AutoMatched` can be revised by a later manual
/// reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    #[default]
    Unmatched,
    AutoMatched,
    ManualMatched,
}

/// Whether a rule files into personal finances or a specific property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    Personal,
    Property,
}

/// A bank movement. The row's lifecycle (creation/deletion) belongs to the
/// import and reconciliation flows; the learning engine only writes
/// `status`, `learn_key`, `category`, `scope` and `property_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub counterparty: String,
    pub amount: Decimal,

    #[serde(default)]
    pub status: ReconciliationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub learn_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<RuleScope>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
}

/// How a rule came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    Implicit,
    Manual,
}

/// A learning rule, unique per learn key. Created on first manual
/// reconciliation for a signature; updated on subsequent ones. Never
/// deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningRule {
    pub learn_key: String,
    pub category: String,
    pub scope: RuleScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    pub source: RuleSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit log action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    CreateRule,
    UpdateRule,
    ApplyRule,
    Backfill,
}

/// Append-only audit record.
///
/// Privacy invariant: never contains the original movement description or
/// any account identifier beyond the learn key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: LogAction,
    pub learn_key: String,
    pub category: String,
    pub scope: RuleScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_count: Option<usize>,
}

/// Inclusive date range scoping a backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReconciliationPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The calendar year containing `date` — the default backfill period.
    pub fn calendar_year(date: NaiveDate) -> Self {
        use chrono::Datelike;
        let year = date.year();
        Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
