//! Spanish locale parsing and formatting.

pub mod amount;
pub mod date;

pub use amount::{
    format_spanish_amount, format_spanish_percent, parse_spanish_amount, ParseIssue,
    ParseIssueKind, ParseOptions, ParsedAmount,
};
pub use date::{normalize_date, to_iso};
