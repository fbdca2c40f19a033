//! Duplicate document detection.
//!
//! Two tiers: exact (same filename and byte size) and heuristic (same
//! provider, issue date, and total). A positive match short-circuits
//! classification.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::document::CanonicalFields;

/// Identifying signals retained per archived document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub id: String,
    pub filename: String,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
}

impl DocumentFingerprint {
    /// Build a fingerprint from extracted canonical fields.
    pub fn from_fields(
        id: impl Into<String>,
        filename: impl Into<String>,
        size_bytes: u64,
        fields: &CanonicalFields,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            size_bytes,
            provider: fields.provider.clone(),
            issue_date: fields.issue_date,
            total_amount: fields.total_amount,
        }
    }
}

/// How a duplicate was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    /// Same filename and byte size.
    Exact,
    /// Same provider, issue date, and total amount.
    Heuristic,
}

/// A positive duplicate match.
#[derive(Debug, Clone)]
pub struct DuplicateMatch {
    pub kind: DuplicateKind,
    pub existing_id: String,
}

/// Duplicate detector over previously archived fingerprints.
pub struct DuplicateDetector;

impl DuplicateDetector {
    pub fn new() -> Self {
        Self
    }

    /// Check a candidate against the archive. Exact matches win over
    /// heuristic ones.
    pub fn detect(
        &self,
        candidate: &DocumentFingerprint,
        existing: &[DocumentFingerprint],
    ) -> Option<DuplicateMatch> {
        for doc in existing {
            if doc.id == candidate.id {
                continue;
            }
            if doc.size_bytes == candidate.size_bytes
                && doc.filename.eq_ignore_ascii_case(&candidate.filename)
            {
                debug!("exact duplicate of {}", doc.id);
                return Some(DuplicateMatch {
                    kind: DuplicateKind::Exact,
                    existing_id: doc.id.clone(),
                });
            }
        }

        for doc in existing {
            if doc.id == candidate.id {
                continue;
            }
            if same_provider(doc, candidate)
                && doc.issue_date.is_some()
                && doc.issue_date == candidate.issue_date
                && doc.total_amount.is_some()
                && doc.total_amount == candidate.total_amount
            {
                debug!("heuristic duplicate of {}", doc.id);
                return Some(DuplicateMatch {
                    kind: DuplicateKind::Heuristic,
                    existing_id: doc.id.clone(),
                });
            }
        }

        None
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn same_provider(a: &DocumentFingerprint, b: &DocumentFingerprint) -> bool {
    match (&a.provider, &b.provider) {
        (Some(pa), Some(pb)) => pa.trim().eq_ignore_ascii_case(pb.trim()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn fingerprint(id: &str, filename: &str, size: u64) -> DocumentFingerprint {
        DocumentFingerprint {
            id: id.to_string(),
            filename: filename.to_string(),
            size_bytes: size,
            provider: None,
            issue_date: None,
            total_amount: None,
        }
    }

    #[test]
    fn test_exact_duplicate() {
        let detector = DuplicateDetector::new();
        let existing = vec![fingerprint("doc-1", "factura_enero.pdf", 48_213)];

        let candidate = fingerprint("doc-2", "Factura_Enero.PDF", 48_213);
        let result = detector.detect(&candidate, &existing).unwrap();
        assert_eq!(result.kind, DuplicateKind::Exact);
        assert_eq!(result.existing_id, "doc-1");

        // Different size: not a duplicate.
        let candidate = fingerprint("doc-3", "factura_enero.pdf", 48_999);
        assert!(detector.detect(&candidate, &existing).is_none());
    }

    #[test]
    fn test_heuristic_duplicate() {
        let detector = DuplicateDetector::new();

        let mut archived = fingerprint("doc-1", "factura_enero.pdf", 48_213);
        archived.provider = Some("Endesa Energía S.A.".to_string());
        archived.issue_date = NaiveDate::from_ymd_opt(2024, 1, 15);
        archived.total_amount = Some(Decimal::from_str("121.00").unwrap());

        let mut candidate = fingerprint("doc-2", "endesa_rescan.pdf", 51_002);
        candidate.provider = Some("ENDESA ENERGIA S.A.".to_string());
        candidate.issue_date = NaiveDate::from_ymd_opt(2024, 1, 15);
        candidate.total_amount = Some(Decimal::from_str("121.00").unwrap());

        let result = detector.detect(&candidate, &[archived]).unwrap();
        assert_eq!(result.kind, DuplicateKind::Heuristic);
    }

    #[test]
    fn test_missing_fields_never_match_heuristically() {
        let detector = DuplicateDetector::new();
        let archived = fingerprint("doc-1", "a.pdf", 100);
        let candidate = fingerprint("doc-2", "b.pdf", 200);
        assert!(detector.detect(&candidate, &[archived]).is_none());
    }

    #[test]
    fn test_self_never_matches() {
        let detector = DuplicateDetector::new();
        let doc = fingerprint("doc-1", "a.pdf", 100);
        assert!(detector.detect(&doc, std::slice::from_ref(&doc)).is_none());
    }
}
