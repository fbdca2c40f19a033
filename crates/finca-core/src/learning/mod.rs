//! Movement learning: learn keys, reconciliation rules, backfill, and
//! rule application on import.
//!
//! A manual reconciliation teaches the system a rule for the movement's
//! learn key. The rule then backfills sibling movements in the same
//! account and period, and applies automatically to future imports.

pub mod engine;
pub mod learn_key;

pub use engine::{BackfillOptions, BackfillOutcome, LearningEngine};
pub use learn_key::{build_learn_key, description_signature, normalize_counterparty};
