//! # Variable Binding
//!
//! Connects text elements to per-recipient data. Two mechanisms, layered:
//!
//! 1. **Direct binding** — a text element bound to a column has its whole
//!    content replaced by that row's value.
//! 2. **Placeholder interpolation** — `{{name}}` occurrences inside content
//!    are substituted wherever the row (or the document / built-in variables)
//!    carries a value. Unmatched placeholders stay verbatim, so a designer
//!    immediately sees which column name is misspelled.
//!
//! [`resolve`] is a pure function of its inputs; the editor preview and the
//! batch generator call the same code path.

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::LaureaError;

/// Inferred type of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarType {
    String,
    Number,
}

/// A dataset column: header name plus inferred type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VarType,
}

/// One recipient's values, keyed by column name. Scalars only.
pub type DataRow = HashMap<String, serde_json::Value>;

/// Parsed recipient data: declared columns plus one row per recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub variables: Vec<Variable>,
    pub rows: Vec<DataRow>,
}

impl Dataset {
    /// Parse CSV bytes. The header row declares the variables; column types
    /// are inferred by scanning values (a column is numeric only when every
    /// non-empty value parses as a number).
    pub fn from_csv(bytes: &[u8]) -> Result<Self, LaureaError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| LaureaError::Dataset(format!("invalid CSV header: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(LaureaError::Dataset("CSV has no header row".into()));
        }

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| LaureaError::Dataset(format!("invalid CSV record: {}", e)))?;
            if record.len() != headers.len() {
                return Err(LaureaError::Dataset(format!(
                    "row {} has {} fields, expected {}",
                    raw_rows.len() + 1,
                    record.len(),
                    headers.len()
                )));
            }
            raw_rows.push(record.iter().map(str::to_string).collect());
        }

        let variables: Vec<Variable> = headers
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let numeric = raw_rows
                    .iter()
                    .map(|row| row[col].as_str())
                    .filter(|v| !v.is_empty())
                    .all(|v| v.parse::<f64>().is_ok());
                let has_values = raw_rows.iter().any(|row| !row[col].is_empty());
                Variable {
                    name: name.clone(),
                    var_type: if numeric && has_values {
                        VarType::Number
                    } else {
                        VarType::String
                    },
                }
            })
            .collect();

        let rows = raw_rows
            .into_iter()
            .map(|raw| {
                variables
                    .iter()
                    .zip(raw)
                    .map(|(var, value)| {
                        let json = if value.is_empty() {
                            serde_json::Value::Null
                        } else if var.var_type == VarType::Number {
                            value
                                .parse::<f64>()
                                .ok()
                                .and_then(serde_json::Number::from_f64)
                                .map(serde_json::Value::Number)
                                .unwrap_or(serde_json::Value::String(value))
                        } else {
                            serde_json::Value::String(value)
                        };
                        (var.name.clone(), json)
                    })
                    .collect()
            })
            .collect();

        Ok(Self { variables, rows })
    }
}

/// Render a JSON scalar as display text. Whole numbers drop the `.0`.
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    return format!("{}", f as i64);
                }
            }
            n.to_string()
        }
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Resolve a text element's content against one data row.
///
/// Direct binding wins: when `is_variable` is set and the row carries a
/// non-null value for `variable`, the whole content is replaced. Otherwise
/// `{{name}}` placeholders are substituted for every variable the row has a
/// non-null value for, then for the fallback variables (document statics
/// merged over built-ins). Unmatched placeholders are left verbatim.
pub fn resolve(
    text: &str,
    is_variable: bool,
    variable: Option<&str>,
    row: &DataRow,
    fallback: &HashMap<String, String>,
) -> String {
    if is_variable {
        if let Some(name) = variable {
            if let Some(value) = row.get(name).filter(|v| !v.is_null()) {
                return value_to_string(value);
            }
        }
    }

    let mut out = text.to_string();
    for (name, value) in row {
        if !value.is_null() {
            out = out.replace(
                &format!("{{{{{}}}}}", name),
                &value_to_string(value),
            );
        }
    }
    for (name, value) in fallback {
        out = out.replace(&format!("{{{{{}}}}}", name), value);
    }
    out
}

/// Built-in interpolation variables, available without any dataset:
/// today's date in a few formats. Row values and document statics override
/// these on name collision.
pub fn builtin_variables() -> HashMap<String, String> {
    let now = Local::now();
    let mut vars = HashMap::new();
    vars.insert("date".to_string(), now.format("%B %-d, %Y").to_string());
    vars.insert("date_short".to_string(), now.format("%Y-%m-%d").to_string());
    vars.insert("year".to_string(), now.year().to_string());
    vars.insert("month".to_string(), now.format("%B").to_string());
    vars.insert("day".to_string(), now.format("%-d").to_string());
    vars
}

/// Document statics merged over the built-ins (statics win).
pub fn merged_fallback(statics: &HashMap<String, String>) -> HashMap<String, String> {
    let mut vars = builtin_variables();
    for (k, v) in statics {
        vars.insert(k.clone(), v.clone());
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(pairs: &[(&str, serde_json::Value)]) -> DataRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn direct_binding_replaces_whole_content() {
        let r = row(&[("name", serde_json::json!("Alice"))]);
        let out = resolve("ignored {{name}}", true, Some("name"), &r, &HashMap::new());
        assert_eq!(out, "Alice");
    }

    #[test]
    fn direct_binding_with_null_value_falls_back_to_interpolation() {
        let r = row(&[
            ("name", serde_json::Value::Null),
            ("course", serde_json::json!("Rust 101")),
        ]);
        let out = resolve(
            "{{name}} passed {{course}}",
            true,
            Some("name"),
            &r,
            &HashMap::new(),
        );
        assert_eq!(out, "{{name}} passed Rust 101");
    }

    #[test]
    fn unmatched_placeholders_stay_verbatim() {
        let out = resolve(
            "Hello {{nmae}}",
            false,
            None,
            &row(&[("name", serde_json::json!("Alice"))]),
            &HashMap::new(),
        );
        assert_eq!(out, "Hello {{nmae}}");
    }

    #[test]
    fn resolve_is_idempotent_on_plain_output() {
        let r = row(&[("name", serde_json::json!("Alice"))]);
        let once = resolve("Hello {{name}}", false, None, &r, &HashMap::new());
        let twice = resolve(&once, false, None, &r, &HashMap::new());
        assert_eq!(once, twice);
        assert_eq!(once, "Hello Alice");
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        let r = row(&[
            ("score", serde_json::json!(95.0)),
            ("grade", serde_json::json!(3.75)),
        ]);
        let out = resolve("{{score}} / {{grade}}", false, None, &r, &HashMap::new());
        assert_eq!(out, "95 / 3.75");
    }

    #[test]
    fn row_values_override_fallback() {
        let mut fallback = HashMap::new();
        fallback.insert("year".to_string(), "1999".to_string());
        let r = row(&[("year", serde_json::json!("2026"))]);
        let out = resolve("Class of {{year}}", false, None, &r, &fallback);
        assert_eq!(out, "Class of 2026");
    }

    #[test]
    fn builtin_date_variables_interpolate() {
        let out = resolve(
            "Issued {{year}}",
            false,
            None,
            &DataRow::new(),
            &builtin_variables(),
        );
        assert!(!out.contains("{{"), "unresolved: {}", out);
    }

    #[test]
    fn csv_infers_column_types() {
        let csv = b"name,score,note\nAlice,95,good\nBob,80,\n";
        let ds = Dataset::from_csv(csv).unwrap();
        assert_eq!(
            ds.variables,
            vec![
                Variable {
                    name: "name".into(),
                    var_type: VarType::String
                },
                Variable {
                    name: "score".into(),
                    var_type: VarType::Number
                },
                Variable {
                    name: "note".into(),
                    var_type: VarType::String
                },
            ]
        );
        assert_eq!(ds.rows.len(), 2);
        assert_eq!(ds.rows[0]["score"], serde_json::json!(95.0));
        assert_eq!(ds.rows[1]["note"], serde_json::Value::Null);
    }

    #[test]
    fn csv_rejects_ragged_rows() {
        let err = Dataset::from_csv(b"a,b\n1\n").unwrap_err();
        assert!(matches!(err, LaureaError::Dataset(_)));
    }

    #[test]
    fn csv_with_no_data_rows_parses_empty() {
        let ds = Dataset::from_csv(b"name,score\n").unwrap();
        assert_eq!(ds.rows.len(), 0);
        assert_eq!(ds.variables.len(), 2);
    }
}
