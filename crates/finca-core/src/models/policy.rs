//! Classification policy configuration.
//!
//! The policy is an immutable snapshot passed into `classify`, not ambient
//! state: editing and persistence belong to the host application.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::document::{DocType, FieldRequirement};

/// Auto-file policy for the classifier. Read-only to the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationPolicy {
    /// Global auto-file switch. When off, the golden rule applies: a
    /// document also needs zero doubts to be considered clear.
    pub auto_file_enabled: bool,

    /// Per-type confidence threshold (0.0 - 1.0).
    pub confidence_threshold: HashMap<DocType, f32>,

    /// Per-type required-field checklist.
    pub required_fields: HashMap<DocType, BTreeSet<FieldRequirement>>,

    /// Invoices above this total with improvement keywords are filed as
    /// CAPEX.
    pub capex_amount_threshold: Decimal,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        let confidence_threshold = HashMap::from([
            (DocType::Invoice, 0.80),
            (DocType::Receipt, 0.75),
            (DocType::BankStatement, 0.70),
            (DocType::Contract, 0.75),
            (DocType::Other, 0.90),
        ]);

        let required_fields = HashMap::from([
            (
                DocType::Invoice,
                BTreeSet::from([
                    FieldRequirement::Provider,
                    FieldRequirement::TotalAmount,
                    FieldRequirement::IssueDate,
                ]),
            ),
            (
                DocType::Receipt,
                BTreeSet::from([FieldRequirement::Provider, FieldRequirement::TotalAmount]),
            ),
            (DocType::Contract, BTreeSet::from([FieldRequirement::Provider])),
            (DocType::BankStatement, BTreeSet::new()),
            (DocType::Other, BTreeSet::new()),
        ]);

        Self {
            auto_file_enabled: true,
            confidence_threshold,
            required_fields,
            capex_amount_threshold: Decimal::new(600, 0),
        }
    }
}

impl ClassificationPolicy {
    /// Confidence threshold for a document type.
    pub fn threshold(&self, doc_type: DocType) -> f32 {
        self.confidence_threshold
            .get(&doc_type)
            .copied()
            .unwrap_or(0.80)
    }

    /// Required fields for a document type.
    pub fn required(&self, doc_type: DocType) -> Vec<FieldRequirement> {
        self.required_fields
            .get(&doc_type)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Load a policy snapshot from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save the policy to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
