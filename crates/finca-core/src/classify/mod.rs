//! Document classification.
//!
//! A single classification pass: duplicate short-circuit, document type
//! detection by keyword priority, base-plus-boost confidence, required-field
//! doubts, the IVA cross-check, and the CAPEX destination override. Malformed
//! input never aborts classification; it degrades into low confidence and
//! doubts.

pub mod patterns;

use tracing::debug;

use crate::models::document::{CanonicalFields, ClassificationResult, DocType};
use crate::models::policy::ClassificationPolicy;
use patterns::*;

/// Doubt emitted for duplicate documents.
pub const DOUBT_DUPLICATE: &str = "Documento duplicado";
/// Doubt emitted when net + tax does not reconcile with the total.
pub const DOUBT_VAT_MISMATCH: &str = "IVA inconsistente";
/// Destination for large improvement invoices.
pub const CAPEX_DESTINATION: &str = "Inversión (CAPEX)";

// Scoring constants: a type-specific base plus additive per-field boosts,
// capped at 1.0. Tunable, not load-bearing business rules.
const BASE_SCORE_INVOICE: f32 = 0.50;
const BASE_SCORE_RECEIPT: f32 = 0.50;
const BASE_SCORE_BANK_STATEMENT: f32 = 0.60;
const BASE_SCORE_CONTRACT: f32 = 0.55;
const BASE_SCORE_OTHER: f32 = 0.30;

const BOOST_PROVIDER: f32 = 0.12;
const BOOST_TOTAL: f32 = 0.15;
const BOOST_ISSUE_DATE: f32 = 0.10;
const BOOST_TAX_ID: f32 = 0.08;
const BOOST_INVOICE_NUMBER: f32 = 0.08;
const BOOST_NET_AND_TAX: f32 = 0.05;

/// Raw signals accompanying a document into classification.
#[derive(Debug, Clone, Default)]
pub struct RawSignals {
    pub filename: String,
    pub mime_type: String,
    pub text_sample: Option<String>,
}

impl RawSignals {
    fn combined_text(&self) -> String {
        match &self.text_sample {
            Some(sample) => format!("{} {}", self.filename, sample),
            None => self.filename.clone(),
        }
    }
}

/// Classify a document under the supplied policy snapshot.
pub fn classify(
    fields: &CanonicalFields,
    signals: &RawSignals,
    policy: &ClassificationPolicy,
    is_duplicate: bool,
) -> ClassificationResult {
    if is_duplicate {
        // Short-circuit: duplicates never auto-file, whatever their fields.
        return ClassificationResult {
            doc_type: DocType::Other,
            confidence: 0.0,
            is_ready_to_file: false,
            doubts: vec![DOUBT_DUPLICATE.to_string()],
            suggested_destination: DocType::Other.default_destination().to_string(),
            fields: fields.clone(),
        };
    }

    let doc_type = detect_doc_type(fields, signals);
    let confidence = score(doc_type, fields);

    let mut doubts = Vec::new();
    let mut required_ok = true;
    for requirement in policy.required(doc_type) {
        if !requirement.is_present(fields) {
            doubts.push(requirement.doubt().to_string());
            required_ok = false;
        }
    }

    // Invoice cross-check in decimal-cent arithmetic; forces not-ready
    // regardless of confidence.
    let mut vat_ok = true;
    if doc_type == DocType::Invoice && fields.amounts_reconcile() == Some(false) {
        doubts.push(DOUBT_VAT_MISMATCH.to_string());
        vat_ok = false;
    }

    let is_ready_to_file =
        required_ok && vat_ok && meets_golden_rule(policy, doc_type, confidence, &doubts);

    let mut suggested_destination = doc_type.default_destination().to_string();
    if doc_type == DocType::Invoice && capex_applies(fields, signals, policy) {
        suggested_destination = CAPEX_DESTINATION.to_string();
    }

    debug!(
        "classified {:?} with confidence {:.2}, {} doubts, ready={}",
        doc_type,
        confidence,
        doubts.len(),
        is_ready_to_file
    );

    ClassificationResult {
        doc_type,
        confidence,
        is_ready_to_file,
        doubts,
        suggested_destination,
        fields: fields.clone(),
    }
}

/// The golden rule: clear → file, any doubt → pending. With the global
/// auto-file switch off there is no partial auto-filing: zero doubts are
/// required on top of the per-type confidence threshold.
pub fn meets_golden_rule(
    policy: &ClassificationPolicy,
    doc_type: DocType,
    confidence: f32,
    doubts: &[String],
) -> bool {
    if confidence < policy.threshold(doc_type) {
        return false;
    }
    if !policy.auto_file_enabled && !doubts.is_empty() {
        return false;
    }
    true
}

/// Document type by fixed priority:
/// Contract > BankStatement > Invoice > Receipt > Other.
fn detect_doc_type(fields: &CanonicalFields, signals: &RawSignals) -> DocType {
    let text = signals.combined_text();

    if CONTRACT_KEYWORDS.is_match(&text) {
        return DocType::Contract;
    }
    if is_bank_statement(signals) {
        return DocType::BankStatement;
    }
    let invoice_fields = fields.invoice_number.is_some()
        || (fields.provider.is_some() && fields.net_amount.is_some() && fields.tax_amount.is_some());
    if INVOICE_KEYWORDS.is_match(&text) || invoice_fields {
        return DocType::Invoice;
    }
    if RECEIPT_KEYWORDS.is_match(&text) {
        return DocType::Receipt;
    }
    DocType::Other
}

fn is_bank_statement(signals: &RawSignals) -> bool {
    if BANK_EXPORT_FILENAME.is_match(&signals.filename) {
        return true;
    }
    let tabular = TABULAR_EXTENSION.is_match(&signals.filename)
        || signals.mime_type.contains("csv")
        || signals.mime_type.contains("spreadsheet")
        || signals.mime_type.contains("ms-excel");
    let headers = signals
        .text_sample
        .as_deref()
        .map(|s| BANK_COLUMN_HEADERS.is_match(s))
        .unwrap_or(false);
    tabular && headers
}

fn score(doc_type: DocType, fields: &CanonicalFields) -> f32 {
    let base = match doc_type {
        DocType::Invoice => BASE_SCORE_INVOICE,
        DocType::Receipt => BASE_SCORE_RECEIPT,
        DocType::BankStatement => BASE_SCORE_BANK_STATEMENT,
        DocType::Contract => BASE_SCORE_CONTRACT,
        DocType::Other => BASE_SCORE_OTHER,
    };

    let mut score = base;
    if fields.provider.is_some() {
        score += BOOST_PROVIDER;
    }
    if fields.total_amount.is_some() {
        score += BOOST_TOTAL;
    }
    if fields.issue_date.is_some() {
        score += BOOST_ISSUE_DATE;
    }
    if fields.tax_id.is_some() {
        score += BOOST_TAX_ID;
    }
    if fields.invoice_number.is_some() {
        score += BOOST_INVOICE_NUMBER;
    }
    if fields.net_amount.is_some() && fields.tax_amount.is_some() {
        score += BOOST_NET_AND_TAX;
    }
    score.min(1.0)
}

fn capex_applies(
    fields: &CanonicalFields,
    signals: &RawSignals,
    policy: &ClassificationPolicy,
) -> bool {
    let Some(total) = fields.total_amount else {
        return false;
    };
    if total <= policy.capex_amount_threshold {
        return false;
    }
    CAPEX_KEYWORDS.is_match(&signals.combined_text())
}
