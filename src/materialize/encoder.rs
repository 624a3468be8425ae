//! Value Encoder - The only place SQL literals and identifiers are escaped
//!
//! The remote engine receives statements as single-line text, so every
//! literal built for a statement must come through [`encode`] and every
//! column name through [`quote_identifier`].

use crate::table::{format_timestamp, parse_timestamp, CellValue, NativeType};
use tracing::debug;

const NULL: &str = "NULL";

/// Render one cell as a SQL literal. Never fails: values that do not fit
/// their column's tag degrade to a quoted text form.
pub fn encode(value: &CellValue, native: NativeType) -> String {
    match value {
        CellValue::Null => NULL.to_string(),
        CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        CellValue::Temporal(ts) => timestamp_literal(&format_timestamp(ts)),
        CellValue::Integer(i) => match native {
            NativeType::Temporal => degrade(&i.to_string(), native),
            _ => i.to_string(),
        },
        CellValue::Float(f) => encode_float(*f),
        CellValue::Composite(json) => quote_text(&canonical_json(json).to_string()),
        CellValue::Text(s) => match native {
            NativeType::Temporal => match parse_timestamp(s) {
                Some(ts) => timestamp_literal(&format_timestamp(&ts)),
                None => degrade(s, native),
            },
            _ => quote_text(s),
        },
    }
}

fn timestamp_literal(text: &str) -> String {
    format!("TIMESTAMP '{}'", text)
}

fn degrade(text: &str, native: NativeType) -> String {
    debug!("Encoding {:?} as text in a {} column", text, native);
    quote_text(text)
}

/// Copy of a JSON value with object keys sorted at every level, so the
/// text form does not depend on map ordering features.
fn canonical_json(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical_json(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonical_json).collect())
        }
        other => other.clone(),
    }
}

/// NaN and infinities have no decimal form; they load as NULL.
fn encode_float(f: f64) -> String {
    if f.is_finite() {
        f.to_string()
    } else {
        NULL.to_string()
    }
}

/// Quote free text as a single-line SQL string literal
pub fn quote_text(text: &str) -> String {
    format!("'{}'", escape_text(text))
}

/// Smart quotes become ASCII, apostrophes are doubled, and line breaks and
/// tabs become single spaces.
pub fn escape_text(text: &str) -> String {
    let normalized: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();

    normalized
        .replace('\'', "''")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('\t', " ")
}

/// Double-quote a column name, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
