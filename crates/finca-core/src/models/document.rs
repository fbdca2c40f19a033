//! Canonical document models produced by extraction and classification.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Conservative confidence assigned to fields synthesized without an
/// explicit per-field score. Never treated as 100% confident.
pub const DEFAULT_FIELD_CONFIDENCE: f32 = 0.72;

/// A raw field as supplied by the OCR/extraction collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawField {
    /// Field name as reported by the collaborator.
    pub name: String,
    /// Raw textual value.
    pub value: String,
    /// Collaborator-reported confidence (0.0 - 1.0), when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl RawField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Canonical per-document field record.
///
/// Fixed-shape optional slots, not a generic field bag: every consumer knows
/// exactly what can be absent. Created once per extraction pass and never
/// mutated in place; re-extraction produces a new record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Spanish tax identification (NIF/CIF).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Base imponible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_amount: Option<Decimal>,

    /// Cuota de IVA.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,

    /// Masked on extraction (first 4 + last 4); the unmasked value is never
    /// retained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iban_masked: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_address: Option<String>,

    /// Per-field confidence scores, keyed by canonical slot name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub field_confidence: HashMap<String, f32>,
}

impl CanonicalFields {
    /// Check the sum invariant: when net and tax are both present, total must
    /// equal their sum within ±0.01. `None` when any amount is absent.
    ///
    /// Mismatches are flagged by the classifier, never silently corrected.
    pub fn amounts_reconcile(&self) -> Option<bool> {
        let net = self.net_amount?;
        let tax = self.tax_amount?;
        let total = self.total_amount?;
        Some(((net + tax) - total).abs() <= Decimal::new(1, 2))
    }

    fn slot_confidence(&self, slot: &str) -> f32 {
        self.field_confidence
            .get(slot)
            .copied()
            .unwrap_or(DEFAULT_FIELD_CONFIDENCE)
    }

    /// Global confidence: arithmetic mean over the fields actually present
    /// among the critical set (provider, total amount, issue date) plus any
    /// present optional fields. Absent fields are simply excluded; if no
    /// critical field was extracted, global confidence is 0.
    pub fn global_confidence(&self) -> f32 {
        let critical: [(&str, bool); 3] = [
            ("provider", self.provider.is_some()),
            ("total_amount", self.total_amount.is_some()),
            ("issue_date", self.issue_date.is_some()),
        ];
        if critical.iter().all(|(_, present)| !present) {
            return 0.0;
        }

        let optional: [(&str, bool); 7] = [
            ("tax_id", self.tax_id.is_some()),
            ("invoice_number", self.invoice_number.is_some()),
            ("due_date", self.due_date.is_some()),
            ("net_amount", self.net_amount.is_some()),
            ("tax_amount", self.tax_amount.is_some()),
            ("iban", self.iban_masked.is_some()),
            ("service_address", self.service_address.is_some()),
        ];

        let mut sum = 0.0f32;
        let mut count = 0u32;
        for (slot, present) in critical.iter().chain(optional.iter()) {
            if *present {
                sum += self.slot_confidence(slot);
                count += 1;
            }
        }
        sum / count as f32
    }
}

/// Document type as determined by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Invoice,
    Receipt,
    BankStatement,
    Contract,
    Other,
}

impl DocType {
    /// Fixed default destination per type, overridable by the CAPEX rule.
    pub fn default_destination(&self) -> &'static str {
        match self {
            DocType::Invoice => "Facturas",
            DocType::Receipt => "Recibos",
            DocType::BankStatement => "Extractos bancarios",
            DocType::Contract => "Contratos",
            DocType::Other => "Otros documentos",
        }
    }
}

/// A field the policy can require before auto-filing a document type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FieldRequirement {
    Provider,
    TaxId,
    InvoiceNumber,
    IssueDate,
    TotalAmount,
}

impl FieldRequirement {
    /// Whether the requirement is satisfied by the extracted fields.
    pub fn is_present(&self, fields: &CanonicalFields) -> bool {
        match self {
            FieldRequirement::Provider => fields.provider.is_some(),
            FieldRequirement::TaxId => fields.tax_id.is_some(),
            FieldRequirement::InvoiceNumber => fields.invoice_number.is_some(),
            FieldRequirement::IssueDate => fields.issue_date.is_some(),
            FieldRequirement::TotalAmount => fields.total_amount.is_some(),
        }
    }

    /// Human-readable doubt rendered verbatim by the UI when missing.
    pub fn doubt(&self) -> &'static str {
        match self {
            FieldRequirement::Provider => "Proveedor no identificado",
            FieldRequirement::TaxId => "NIF/CIF no identificado",
            FieldRequirement::InvoiceNumber => "Número de factura no identificado",
            FieldRequirement::IssueDate => "Fecha no válida",
            FieldRequirement::TotalAmount => "Importe no válido",
        }
    }
}

/// Derived classification value; recomputed on every call, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub doc_type: DocType,
    /// Overall confidence (0.0 - 1.0).
    pub confidence: f32,
    /// Clear to auto-file under the supplied policy.
    pub is_ready_to_file: bool,
    /// Ordered, human-readable reasons blocking auto-filing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doubts: Vec<String>,
    pub suggested_destination: String,
    pub fields: CanonicalFields,
}
