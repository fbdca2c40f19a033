//! Spanish keyword patterns for document type detection.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Contracts are structurally unambiguous and win over a weaker invoice
    // guess.
    pub static ref CONTRACT_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(contrato|arrendamiento|p[oó]liza|clausulado|condiciones\s+(?:generales|particulares))\b"
    ).unwrap();

    // Bank statement export filenames (csv/xls dumps).
    pub static ref BANK_EXPORT_FILENAME: Regex = Regex::new(
        r"(?i)(movimientos|extracto|export).*\.(csv|xls|xlsx)$"
    ).unwrap();

    // Banking column headers inside a text sample.
    pub static ref BANK_COLUMN_HEADERS: Regex = Regex::new(
        r"(?i)fecha\s+valor|concepto\s*[;,|].*importe|saldo\s+(?:disponible|posterior)"
    ).unwrap();

    pub static ref INVOICE_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(factura|n[uú]m(?:ero)?\s+(?:de\s+)?factura|base\s+imponible)\b"
    ).unwrap();

    pub static ref RECEIPT_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(recibo|adeudo|domiciliaci[oó]n|cargo\s+en\s+cuenta)\b"
    ).unwrap();

    // Improvement/renovation keywords driving the CAPEX override.
    pub static ref CAPEX_KEYWORDS: Regex = Regex::new(
        r"(?i)\b(reforma|obra|rehabilitaci[oó]n|instalaci[oó]n|sustituci[oó]n|renovaci[oó]n|carpinter[ií]a|albañiler[ií]a)\b"
    ).unwrap();

    // Spreadsheet-ish mime types and extensions.
    pub static ref TABULAR_EXTENSION: Regex = Regex::new(
        r"(?i)\.(csv|xls|xlsx)$"
    ).unwrap();
}
