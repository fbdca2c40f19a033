//! Core library for the finca document-classification and movement-learning
//! pipeline.
//!
//! This crate provides:
//! - Spanish locale number and date parsing (`locale`)
//! - OCR field normalization into canonical document records (`extract`)
//! - Document classification under an auto-file policy (`classify`)
//! - Duplicate document detection (`dedup`)
//! - Bank-movement learning rules with scoped backfill (`learning`)
//!
//! The surrounding application (UI, OCR invocation, host persistence) is out
//! of scope: storage is reached through the traits in [`store`].

pub mod classify;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod learning;
pub mod locale;
pub mod models;
pub mod store;

pub use error::{FincaError, LearningError, Result, StoreError};
pub use locale::amount::{
    format_spanish_amount, format_spanish_percent, parse_spanish_amount, ParseIssue,
    ParseIssueKind, ParseOptions, ParsedAmount,
};
pub use locale::date::normalize_date;
pub use models::document::{
    CanonicalFields, ClassificationResult, DocType, FieldRequirement, RawField,
};
pub use models::movement::{
    LearningLogEntry, LearningRule, LogAction, Movement, ReconciliationPeriod,
    ReconciliationStatus, RuleScope, RuleSource,
};
pub use models::policy::ClassificationPolicy;
pub use extract::{extract, ExtractionContext};
pub use classify::{classify, RawSignals};
pub use dedup::{DocumentFingerprint, DuplicateDetector, DuplicateKind, DuplicateMatch};
pub use learning::{build_learn_key, BackfillOptions, BackfillOutcome, LearningEngine};
pub use store::{LearningLog, MemoryStore, MovementStore, RuleStore};
