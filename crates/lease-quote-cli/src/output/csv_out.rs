use serde_json::Value;
use std::io;

use super::{as_grid, column_label, flatten, result_of};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let result = result_of(value);

    if let Some((columns, rows)) = as_grid(result) {
        write_grid(&mut wtr, columns, rows);
    } else {
        match result {
            Value::Object(map) => match map.get("options") {
                // Quote sheets: one record per priced option
                Some(Value::Array(options)) => write_records(&mut wtr, options),
                _ => {
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in flatten(map) {
                        let _ = wtr.write_record([key, format_csv_value(&val)]);
                    }
                }
            },
            Value::Array(arr) => write_records(&mut wtr, arr),
            other => {
                let _ = wtr.write_record([format_csv_value(other)]);
            }
        }
    }

    let _ = wtr.flush();
}

fn write_grid(wtr: &mut StdoutWriter<'_>, columns: &[Value], rows: &[Value]) {
    let mut header = vec!["cash_down".to_string()];
    header.extend(columns.iter().map(column_label));
    let _ = wtr.write_record(&header);

    for row in rows {
        let mut record = vec![row.get("cash_down").map(format_csv_value).unwrap_or_default()];
        if let Some(Value::Array(payments)) = row.get("payments") {
            record.extend(payments.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn write_records(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<String> = flatten(first).into_iter().map(|(k, _)| k).collect();
    let _ = wtr.write_record(&headers);

    for item in arr {
        if let Value::Object(map) = item {
            let flat = flatten(map);
            let row: Vec<String> = headers
                .iter()
                .map(|h| {
                    flat.iter()
                        .find(|(k, _)| k == h)
                        .map(|(_, v)| format_csv_value(v))
                        .unwrap_or_default()
                })
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
