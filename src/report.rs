//! Structured output records and their renderers.
//!
//! A record is an ordered list of (key, typed value) pairs. The key order is
//! part of the interface — it is declared once in [OUTPUT_FIELDS] and reused
//! for every record so tabular consumers can align columns across
//! transmissions — and both renderers preserve it. The emission timestamp is
//! stamped here, outside the ordered field list.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Field keys every record carries, in emission order.
pub const OUTPUT_FIELDS: [&str; 7] = [
    "model",
    "id",
    "battery_ok",
    "button",
    "learn",
    "repeat",
    "encrypted",
];

/// A typed record value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl FieldValue {
    fn to_json(&self) -> Value {
        match self {
            FieldValue::Str(s) => Value::from(s.as_str()),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Bool(b) => Value::from(*b),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
        }
    }
}

/// One decoded transmission, field order fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    fields: Vec<(&'static str, FieldValue)>,
}

impl Report {
    /// Build a record. The keys must match [OUTPUT_FIELDS] exactly; a decoder
    /// producing anything else is a bug.
    pub fn new(fields: Vec<(&'static str, FieldValue)>) -> Self {
        debug_assert!(
            fields.iter().map(|(k, _)| *k).eq(OUTPUT_FIELDS),
            "record keys must match OUTPUT_FIELDS"
        );
        Self { fields }
    }

    pub fn fields(&self) -> &[(&'static str, FieldValue)] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Render one record as a JSON object on a single line, `time` first, then
/// the declared fields in order.
pub fn render_jsonl(report: &Report, time: DateTime<Utc>) -> String {
    let mut map = Map::new();
    map.insert(
        "time".to_string(),
        Value::from(time.format("%Y-%m-%d %H:%M:%S").to_string()),
    );
    for (key, value) in report.fields() {
        map.insert((*key).to_string(), value.to_json());
    }
    Value::Object(map).to_string()
}

/// Render one record as an aligned key/value block for terminal reading.
pub fn render_table(report: &Report, time: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "time        : {}\n",
        time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    for (key, value) in report.fields() {
        out.push_str(&format!("{:<12}: {}\n", key, value));
    }
    out
}
