pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` payload of an envelope, or the value itself.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Payment grids serialise as `{columns: [...], rows: [{cash_down, payments}]}`.
pub(crate) fn as_grid(value: &Value) -> Option<(&Vec<Value>, &Vec<Value>)> {
    let map = value.as_object()?;
    match (map.get("columns"), map.get("rows")) {
        (Some(Value::Array(cols)), Some(Value::Array(rows))) => Some((cols, rows)),
        _ => None,
    }
}

/// Flatten nested objects into dotted field names
/// (`breakdown.monthly_payment`). Arrays are left as single values.
pub(crate) fn flatten(map: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into("", map, &mut out);
    out
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => flatten_into(&name, inner, out),
            other => out.push((name, other.clone())),
        }
    }
}

/// Grid column header: option key when present, else term/mileage.
pub(crate) fn column_label(column: &Value) -> String {
    if let Some(Value::String(key)) = column.get("key") {
        return key.clone();
    }
    match (column.get("term_months"), column.get("mileage")) {
        (Some(t), Some(m)) => format!("{}mo/{}mi", t, m),
        _ => column.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_breakdown() {
        let v = json!({
            "breakdown": { "monthly_payment": "348.12", "monthly_tax": "23.53" },
            "unpaid_balance": "0"
        });
        let flat = flatten(v.as_object().unwrap());
        let names: Vec<&str> = flat.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["breakdown.monthly_payment", "breakdown.monthly_tax", "unpaid_balance"]
        );
    }

    #[test]
    fn test_grid_detection() {
        let g = json!({ "result": { "columns": [{"key": "36_12000"}], "rows": [] } });
        assert!(as_grid(result_of(&g)).is_some());
        assert!(as_grid(&json!({ "rows": [] })).is_none());
        assert_eq!(column_label(&json!({"key": "36_12000"})), "36_12000");
    }
}
