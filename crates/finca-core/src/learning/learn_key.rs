//! Learn key derivation from movement counterparty and description.
//!
//! A learn key must be stable across months for the same recurring charge:
//! month names, reference numbers, and free-text detail vary between
//! occurrences of the same direct debit, so the signature keeps only the
//! recurring concept words.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A month token, abbreviated or full, optionally glued to digits
    // ("ENE2024", "ENERO", "FEB24").
    static ref MONTH_TOKEN: Regex = Regex::new(
        r"^(?:ENE(?:RO)?|FEB(?:RERO)?|MAR(?:ZO)?|ABR(?:IL)?|MAY(?:O)?|JUN(?:IO)?|JUL(?:IO)?|AGO(?:STO)?|SEP(?:T(?:IEMBRE)?)?|OCT(?:UBRE)?|NOV(?:IEMBRE)?|DIC(?:IEMBRE)?)\d*$"
    ).unwrap();
}

// Trailing legal-form tokens stripped from counterparty names.
const LEGAL_SUFFIXES: &[&str] = &[
    "SA",
    "SL",
    "SLU",
    "SLL",
    "SC",
    "SCP",
    "SCOOP",
    "COOP",
    "CB",
    "SOCIEDAD",
    "ANONIMA",
    "LIMITADA",
    "UNIPERSONAL",
];

// Recurring banking concept words that survive into the signature. A
// description like "RECIBO LUZ ENE2024 REF123" keeps only "RECIBO".
const CONCEPT_WORDS: &[&str] = &[
    "RECIBO",
    "ADEUDO",
    "TRANSFERENCIA",
    "NOMINA",
    "CUOTA",
    "FACTURA",
    "ALQUILER",
    "SEGURO",
    "PRESTAMO",
    "HIPOTECA",
    "DOMICILIACION",
    "COMISION",
    "SUSCRIPCION",
    "IMPUESTO",
    "COMUNIDAD",
];

fn fold_diacritics(c: char) -> char {
    match c {
        'á' | 'à' | 'Á' | 'À' => 'a',
        'é' | 'è' | 'É' | 'È' => 'e',
        'í' | 'ì' | 'Í' | 'Ì' => 'i',
        'ó' | 'ò' | 'Ó' | 'Ò' => 'o',
        'ú' | 'ù' | 'ü' | 'Ú' | 'Ù' | 'Ü' => 'u',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        other => other,
    }
}

fn clean_tokens(text: &str) -> Vec<String> {
    text.chars()
        .map(fold_diacritics)
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

// Tokens that change between occurrences of the same recurring charge.
fn is_volatile(token: &str) -> bool {
    token.len() <= 1
        || token.chars().any(|c| c.is_ascii_digit())
        || MONTH_TOKEN.is_match(token)
}

/// Normalize a counterparty name: uppercase, diacritics folded,
/// punctuation dropped, trailing legal suffixes removed.
pub fn normalize_counterparty(counterparty: &str) -> String {
    let mut tokens = clean_tokens(counterparty);
    while tokens.len() > 1 {
        let last = tokens.last().map(String::as_str).unwrap_or_default();
        // "S.A.U." tokenizes to single letters; eat those along with the
        // spelled-out suffixes.
        if LEGAL_SUFFIXES.contains(&last) || last.len() == 1 {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ")
}

/// Reduce a movement description to its stable signature.
///
/// Concept words win when present; otherwise the first non-volatile token
/// stands in. Empty when nothing stable remains.
pub fn description_signature(description: &str) -> String {
    let tokens = clean_tokens(description);

    let mut concepts: Vec<&str> = Vec::new();
    for token in &tokens {
        if CONCEPT_WORDS.contains(&token.as_str()) && !concepts.contains(&token.as_str()) {
            concepts.push(token);
        }
    }
    if !concepts.is_empty() {
        return concepts.join("-");
    }

    tokens
        .iter()
        .find(|t| !is_volatile(t))
        .cloned()
        .unwrap_or_default()
}

/// Build a learn key from counterparty and description.
///
/// Shape: `NORMALIZED-COUNTERPARTY|SIGNATURE`, counterparty spaces turned
/// into dashes. Falls back to the counterparty alone when the description
/// yields no signature.
pub fn build_learn_key(counterparty: &str, description: &str) -> String {
    let counterparty = normalize_counterparty(counterparty).replace(' ', "-");
    let signature = description_signature(description);
    if signature.is_empty() {
        counterparty
    } else {
        format!("{counterparty}|{signature}")
    }
}
