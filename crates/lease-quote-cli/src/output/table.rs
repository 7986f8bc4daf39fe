use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{as_grid, column_label, flatten, result_of};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    let result = result_of(value);

    if let Some((columns, rows)) = as_grid(result) {
        print_grid(columns, rows);
    } else {
        match result {
            Value::Object(map) if map.contains_key("options") => print_quote_sheet(result),
            Value::Object(_) => print_fields(result),
            Value::Array(arr) => print_rows(arr),
            other => println!("{}", format_value(other)),
        }
    }

    if let Some(envelope) = value.as_object() {
        if let Some(Value::Array(warnings)) = envelope.get("warnings") {
            if !warnings.is_empty() {
                println!("\nWarnings:");
                for w in warnings.iter().filter_map(Value::as_str) {
                    println!("  - {}", w);
                }
            }
        }
        if let Some(Value::String(meth)) = envelope.get("methodology") {
            println!("\nMethodology: {}", meth);
        }
    }
}

fn print_fields(value: &Value) {
    let Value::Object(map) = value else {
        return;
    };
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten(map) {
        builder.push_record([key, format_value(&val)]);
    }
    println!("{}", Table::from(builder));
}

/// Cash down down the side, one column per option.
fn print_grid(columns: &[Value], rows: &[Value]) {
    let mut builder = Builder::default();
    let mut header = vec!["Cash Down".to_string()];
    header.extend(columns.iter().map(column_label));
    builder.push_record(header);

    for row in rows {
        let mut record = vec![row.get("cash_down").map(format_value).unwrap_or_default()];
        if let Some(Value::Array(payments)) = row.get("payments") {
            record.extend(payments.iter().map(format_value));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

/// Vehicle header followed by one row per priced option.
fn print_quote_sheet(sheet: &Value) {
    if let Some(vehicle) = sheet.get("vehicle") {
        let describe = |k: &str| vehicle.get(k).map(format_value).unwrap_or_default();
        println!(
            "{} {} {} {}  VIN {}  MSRP {}",
            describe("year"),
            describe("make"),
            describe("model"),
            describe("trim"),
            describe("vin"),
            describe("msrp"),
        );
    }

    let mut builder = Builder::default();
    builder.push_record([
        "Option",
        "Money Factor",
        "Residual",
        "Lease Cash",
        "Cap Reduction",
        "Payment",
        "Unpaid",
    ]);
    if let Some(Value::Array(options)) = sheet.get("options") {
        for p in options {
            let field = |path: &[&str]| {
                path.iter()
                    .try_fold(p, |v, k| v.get(*k))
                    .map(format_value)
                    .unwrap_or_default()
            };
            builder.push_record([
                field(&["key"]),
                field(&["option", "money_factor"]),
                field(&["option", "residual_value"]),
                field(&["option", "lease_cash_used"]),
                field(&["quote", "breakdown", "cap_cost_reduction"]),
                field(&["quote", "breakdown", "monthly_payment"]),
                field(&["quote", "unpaid_balance"]),
            ]);
        }
    }
    println!("{}", Table::from(builder));
}

fn print_rows(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = flatten(first).into_iter().map(|(k, _)| k).collect();
        let mut builder = Builder::default();
        builder.push_record(headers.clone());

        for item in arr {
            if let Value::Object(map) = item {
                let flat = flatten(map);
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        flat.iter()
                            .find(|(k, _)| k == h)
                            .map(|(_, v)| format_value(v))
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }
        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
