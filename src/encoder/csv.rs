//! CSV encoding.
//!
//! RFC 4180 style: a header line of column names, then one line per row.
//! Fields containing a comma, a double quote, CR or LF are quoted with inner
//! quotes doubled. NULL is written as an empty field. Lines end with `\n`.

use super::{cell_to_text, ensure_encodable};
use crate::error::DbResult;
use crate::models::QueryResult;
use std::borrow::Cow;

/// Quote a field if it needs it.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn push_record<'a>(out: &mut String, fields: impl ExactSizeIterator<Item = Cow<'a, str>>) {
    // A lone empty field would otherwise produce a blank line, which readers skip
    if fields.len() == 1 {
        let mut fields = fields;
        if let Some(only) = fields.next() {
            if only.is_empty() {
                out.push_str("\"\"");
            } else {
                out.push_str(&escape_field(&only));
            }
        }
        out.push('\n');
        return;
    }

    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(&field));
    }
    out.push('\n');
}

/// Encode a result as a CSV document.
///
/// Fails with an encoding error before producing any output if a cell
/// cannot be represented.
pub fn encode_csv(result: &QueryResult) -> DbResult<String> {
    ensure_encodable(result)?;

    let mut out = String::new();
    push_record(&mut out, result.columns.iter().map(|c| Cow::Borrowed(c.as_str())));
    for row in &result.rows {
        push_record(
            &mut out,
            row.iter()
                .map(|cell| Cow::Owned(cell_to_text(cell).unwrap_or_default())),
        );
    }
    Ok(out)
}
