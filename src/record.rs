//! The record type that flows through a chain.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::flow::FlowError;

/// Column order shared by every output format.
pub const FIELD_NAMES: [&str; 5] = ["record_id", "name", "score", "active", "source"];

/// One data row.
///
/// Records are never mutated by transformations; each step builds new ones.
/// `record_id` is supplied by the source and is not required to be unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_id: i64,
    pub name: String,
    pub score: f64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub active: bool,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "unknown".to_string()
}

/// Text form of a boolean in CSV cells, text lines and step names.
pub fn format_flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// `1`, `true`, `yes` and `y` in any case are true; any other text is false.
pub fn parse_flag(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y")
}

/// Accepts JSON booleans as well as the `True`/`False` cells of CSV output.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Text(text) => parse_flag(&text),
    })
}

impl Record {
    pub fn new(
        record_id: i64,
        name: impl Into<String>,
        score: f64,
        active: bool,
        source: impl Into<String>,
    ) -> Self {
        Self {
            record_id,
            name: name.into(),
            score,
            active,
            source: source.into(),
        }
    }

    /// Copy with a different score and active flag.
    pub fn with_score(&self, score: f64, active: bool) -> Self {
        Self {
            score,
            active,
            ..self.clone()
        }
    }

    /// Decode a record from a loosely-typed JSON object.
    ///
    /// Numbers may arrive as strings, `active` may be a bool, a number or a
    /// yes/no style string, and a missing `source` becomes `"unknown"`.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("expected an object, got {}", json_kind(value)))?;

        let field = |name: &str| obj.get(name).ok_or_else(|| format!("missing field '{}'", name));

        let record_id = to_int(field("record_id")?).ok_or("field 'record_id' is not an integer")?;
        let name = to_text(field("name")?);
        let score = to_float(field("score")?).ok_or("field 'score' is not a finite number")?;
        let active = to_bool(field("active")?);
        let source = obj.get("source").map(to_text).unwrap_or_else(default_source);

        Ok(Self {
            record_id,
            name,
            score,
            active,
            source,
        })
    }
}

/// Decode a top-level JSON array of records.
///
/// Every bad item is reported in a single [`FlowError::Validation`].
pub fn records_from_json(payload: &Value) -> Result<Vec<Record>, FlowError> {
    let items = payload.as_array().ok_or_else(|| {
        FlowError::InvalidArgument("Expected top-level JSON array for records".to_string())
    })?;

    let mut records = Vec::with_capacity(items.len());
    let mut problems = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        match Record::from_json(item) {
            Ok(record) => records.push(record),
            Err(reason) => problems.push(format!("record[{}]: {}", idx, reason)),
        }
    }

    if problems.is_empty() {
        Ok(records)
    } else {
        Err(FlowError::Validation(problems))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Finite numbers only; `NaN` and infinities cannot be written back as JSON.
fn to_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|f: &f64| f.is_finite())
}

fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => parse_flag(s),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_strict_types() {
        let record = Record::from_json(&json!({
            "record_id": 1, "name": "Mia", "score": 78.5, "active": true, "source": "file"
        }))
        .unwrap();
        assert_eq!(record, Record::new(1, "Mia", 78.5, true, "file"));
    }

    #[test]
    fn test_from_json_lenient_values() {
        let record = Record::from_json(&json!({
            "record_id": "7", "name": "Eve", "score": "55", "active": " Yes "
        }))
        .unwrap();
        assert_eq!(record.record_id, 7);
        assert_eq!(record.score, 55.0);
        assert!(record.active);
        assert_eq!(record.source, "unknown");
    }

    #[test]
    fn test_from_json_falsy_strings() {
        let record = Record::from_json(&json!({
            "record_id": 2, "name": "Bob", "score": 1, "active": "no"
        }))
        .unwrap();
        assert!(!record.active);
    }

    #[test]
    fn test_from_json_rejects_non_finite_scores() {
        for score in ["NaN", "inf", "-Infinity"] {
            let err = Record::from_json(&json!({
                "record_id": 1, "name": "Mia", "score": score, "active": true
            }))
            .unwrap_err();
            assert_eq!(err, "field 'score' is not a finite number");
        }
    }

    #[test]
    fn test_non_finite_score_is_a_batch_problem() {
        let payload = json!([
            {"record_id": 1, "name": "Mia", "score": "NaN", "active": true},
            {"record_id": 2, "name": "Noah", "score": 61.0, "active": false},
        ]);
        match records_from_json(&payload) {
            Err(FlowError::Validation(problems)) => {
                assert_eq!(problems, vec!["record[0]: field 'score' is not a finite number"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_active_flag_spellings() {
        let parse = |active: &str| -> bool {
            let text = format!(
                r#"{{"record_id": 1, "name": "Mia", "score": 1.0, "active": {}}}"#,
                active
            );
            serde_json::from_str::<Record>(&text).unwrap().active
        };
        assert!(parse("true"));
        assert!(parse(r#""True""#));
        assert!(parse("1"));
        assert!(!parse(r#""False""#));
        assert!(!parse("false"));
        assert_eq!(format_flag(true), "True");
        assert_eq!(format_flag(false), "False");
    }

    #[test]
    fn test_from_json_missing_field() {
        let err = Record::from_json(&json!({"record_id": 1, "score": 2.0, "active": true})).unwrap_err();
        assert_eq!(err, "missing field 'name'");
    }

    #[test]
    fn test_records_from_json_rejects_object() {
        let result = records_from_json(&json!({"record_id": 1}));
        assert!(matches!(result, Err(FlowError::InvalidArgument(_))));
    }

    #[test]
    fn test_records_from_json_aggregates_problems() {
        let payload = json!([
            {"record_id": 1, "name": "Mia", "score": 78.5, "active": true},
            {"record_id": "x", "name": "Noah", "score": 61.0, "active": false},
            {"record_id": 3, "name": "Liam", "active": true},
        ]);

        match records_from_json(&payload) {
            Err(FlowError::Validation(problems)) => {
                assert_eq!(problems.len(), 2);
                assert!(problems[0].starts_with("record[1]"));
                assert!(problems[1].starts_with("record[2]"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_with_score_keeps_other_fields() {
        let record = Record::new(4, "Emma", 55.1, true, "file");
        let updated = record.with_score(30.0, false);
        assert_eq!(updated.name, "Emma");
        assert_eq!(updated.record_id, 4);
        assert_eq!(record.score, 55.1);
        assert!(!updated.active);
    }
}
