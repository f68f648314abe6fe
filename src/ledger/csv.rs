//! CSV row formatting for the ledger
//!
//! Quoting follows RFC 4180: a field containing a comma, a double quote, CR
//! or LF is wrapped in double quotes and embedded quotes are doubled. Rows end
//! with `\n`.

use crate::model::PaperRecord;

/// Header row written once at the top of the ledger
pub const LEDGER_HEADER: &str = "Year,Title,Authors,Paper Link";

/// Quotes a single field when it needs it
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Formats a record as one complete ledger line, terminator included
pub fn format_row(record: &PaperRecord) -> String {
    let fields = [
        record.year.as_str(),
        record.title.as_str(),
        record.authors.as_str(),
        record.item_url.as_str(),
    ];

    let mut line = fields
        .iter()
        .map(|field| escape_field(field))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}
