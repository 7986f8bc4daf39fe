use serde_json::Value;

use super::{as_grid, flatten, result_of};

/// Headline fields, most specific first. Nested fields use dotted names.
const PRIORITY_KEYS: [&str; 6] = [
    "total_due_at_signing",
    "breakdown.monthly_payment",
    "monthly_payment",
    "capped_ccr",
    "unpaid_balance",
    "consumed.lease_cash",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    // Quote sheet: best option's key and payment
    if let Some(Value::Array(options)) = result.get("options") {
        match options.first() {
            Some(best) => println!(
                "{} {}",
                best.get("key").map(format_minimal).unwrap_or_default(),
                best.pointer("/quote/breakdown/monthly_payment")
                    .map(format_minimal)
                    .unwrap_or_default()
            ),
            None => println!("no options"),
        }
        return;
    }

    // Grid: first row
    if let Some((_, rows)) = as_grid(result) {
        if let Some(first) = rows.first() {
            println!("{}", format_minimal(first));
        }
        return;
    }

    if let Value::Object(map) = result {
        let flat = flatten(map);
        for key in PRIORITY_KEYS {
            if let Some((_, val)) = flat.iter().find(|(k, v)| k == key && !v.is_null()) {
                println!("{}", format_minimal(val));
                return;
            }
        }
        if let Some((key, val)) = flat.first() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
