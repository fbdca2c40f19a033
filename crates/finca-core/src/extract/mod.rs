//! Field extraction and normalization.
//!
//! Converts the raw field list supplied by the OCR/extraction collaborator
//! into a [`CanonicalFields`] record: synonym mapping to canonical slots,
//! Spanish amount parsing, date normalization, and immediate IBAN masking.
//! Malformed values never abort extraction; they leave the slot empty.

pub mod iban;

use tracing::{debug, warn};

use crate::locale::amount::{parse_spanish_amount, ParseOptions};
use crate::locale::date::normalize_date;
use crate::models::document::{CanonicalFields, DocType, RawField, DEFAULT_FIELD_CONFIDENCE};
use iban::{mask_iban, validate_spanish_iban};

/// Context accompanying the raw fields into extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    /// Caller's guess at the document type, when it has one.
    pub doc_type_hint: Option<DocType>,
}

/// Canonical slot a raw field name can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Provider,
    TaxId,
    InvoiceNumber,
    IssueDate,
    DueDate,
    NetAmount,
    TaxAmount,
    TotalAmount,
    Iban,
    ServiceAddress,
}

fn canonical_slot(name: &str) -> Option<Slot> {
    let key = name.trim().to_lowercase().replace([' ', '-', '.'], "_");
    match key.as_str() {
        "proveedor" | "provider" | "vendor" | "supplier" | "supplier_name" | "vendor_name"
        | "emisor" | "empresa" => Some(Slot::Provider),
        "nif" | "cif" | "nif_cif" | "tax_id" | "taxid" | "vat_id" => Some(Slot::TaxId),
        "numero_factura" | "num_factura" | "nº_factura" | "invoice_number" | "invoice_id" => {
            Some(Slot::InvoiceNumber)
        }
        "fecha" | "fecha_emision" | "fecha_factura" | "issue_date" | "invoice_date" | "date" => {
            Some(Slot::IssueDate)
        }
        "fecha_vencimiento" | "vencimiento" | "due_date" => Some(Slot::DueDate),
        "base_imponible" | "base" | "importe_neto" | "net_amount" | "subtotal" => {
            Some(Slot::NetAmount)
        }
        "iva" | "cuota_iva" | "importe_iva" | "tax_amount" | "vat_amount" => Some(Slot::TaxAmount),
        "total" | "importe_total" | "importe" | "total_amount" | "total_factura"
        | "amount_due" => Some(Slot::TotalAmount),
        "iban" | "cuenta" | "numero_cuenta" | "account" | "account_number" => Some(Slot::Iban),
        "direccion_suministro" | "direccion" | "service_address" | "supply_address" => {
            Some(Slot::ServiceAddress)
        }
        _ => None,
    }
}

/// Extract a canonical field record from raw OCR fields.
///
/// Per-field confidence is copied from the input when present; fields
/// without an explicit score get [`DEFAULT_FIELD_CONFIDENCE`]. Each
/// extraction pass produces a fresh record.
pub fn extract(raw_fields: &[RawField], context: &ExtractionContext) -> CanonicalFields {
    let mut fields = CanonicalFields::default();

    for raw in raw_fields {
        let Some(slot) = canonical_slot(&raw.name) else {
            continue;
        };
        let value = raw.value.trim();
        if value.is_empty() {
            continue;
        }
        let mut confidence = raw.confidence.unwrap_or(DEFAULT_FIELD_CONFIDENCE);

        // First occurrence wins; later synonyms never overwrite.
        match slot {
            Slot::Provider if fields.provider.is_none() => {
                fields.provider = Some(value.to_string());
                fields.field_confidence.insert("provider".to_string(), confidence);
            }
            Slot::TaxId if fields.tax_id.is_none() => {
                fields.tax_id = Some(value.to_uppercase().replace([' ', '-'], ""));
                fields.field_confidence.insert("tax_id".to_string(), confidence);
            }
            Slot::InvoiceNumber if fields.invoice_number.is_none() => {
                fields.invoice_number = Some(value.to_string());
                fields
                    .field_confidence
                    .insert("invoice_number".to_string(), confidence);
            }
            Slot::IssueDate if fields.issue_date.is_none() => {
                if let Some(date) = normalize_date(value) {
                    fields.issue_date = Some(date);
                    fields.field_confidence.insert("issue_date".to_string(), confidence);
                } else {
                    debug!("unparsable issue date: {value:?}");
                }
            }
            Slot::DueDate if fields.due_date.is_none() => {
                if let Some(date) = normalize_date(value) {
                    fields.due_date = Some(date);
                    fields.field_confidence.insert("due_date".to_string(), confidence);
                }
            }
            Slot::NetAmount if fields.net_amount.is_none() => {
                if let Some(amount) = parse_amount_field(value) {
                    fields.net_amount = Some(amount);
                    fields.field_confidence.insert("net_amount".to_string(), confidence);
                }
            }
            Slot::TaxAmount if fields.tax_amount.is_none() => {
                if let Some(amount) = parse_amount_field(value) {
                    fields.tax_amount = Some(amount);
                    fields.field_confidence.insert("tax_amount".to_string(), confidence);
                }
            }
            Slot::TotalAmount if fields.total_amount.is_none() => {
                if let Some(amount) = parse_amount_field(value) {
                    fields.total_amount = Some(amount);
                    fields
                        .field_confidence
                        .insert("total_amount".to_string(), confidence);
                }
            }
            Slot::Iban if fields.iban_masked.is_none() => {
                // Masked immediately; the unmasked value is never retained.
                if !validate_spanish_iban(value) {
                    confidence *= 0.8;
                }
                fields.iban_masked = Some(mask_iban(value));
                fields.field_confidence.insert("iban".to_string(), confidence);
            }
            Slot::ServiceAddress if fields.service_address.is_none() => {
                fields.service_address = Some(value.to_string());
                fields
                    .field_confidence
                    .insert("service_address".to_string(), confidence);
            }
            _ => {}
        }
    }

    if fields.amounts_reconcile() == Some(false) {
        // Flagged downstream by the classifier, never corrected here.
        warn!("net + tax does not match total; amounts left untouched");
    }

    debug!(
        "extracted canonical fields (hint {:?}), global confidence {:.2}",
        context.doc_type_hint,
        fields.global_confidence()
    );

    fields
}

fn parse_amount_field(value: &str) -> Option<rust_decimal::Decimal> {
    // The raw value doubles as the anti-join reference: a decimal fragment
    // visible in the original text must survive parsing.
    let opts = ParseOptions::amount().with_reference(value);
    let result = parse_spanish_amount(value, &opts);
    if let Some(issue) = &result.issue {
        debug!("amount field {value:?} rejected: {}", issue.message);
    }
    result.value
}
