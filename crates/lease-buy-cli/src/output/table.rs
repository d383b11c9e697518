use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_scalar, payload, scalar_fields};

/// Render a result as tables: headline fields first, then one table per
/// nested record or list (schedules, sweep points, scenario outcomes).
pub fn print_table(value: &Value) {
    match payload(value) {
        Value::Object(result) => print_object(result),
        Value::Array(rows) => print_rows(rows),
        other => println!("{}", format_scalar(other)),
    }

    if let Some(envelope) = value.as_object() {
        print_notes(envelope);
    }
}

fn print_object(map: &Map<String, Value>) {
    print_fields(map);

    for (key, val) in map {
        match val {
            Value::Array(rows) if key == "matrix" => {
                println!("\n{}", title(key));
                print_matrix(map, rows);
            }
            Value::Array(rows) if rows.iter().any(Value::is_object) => {
                println!("\n{}", title(key));
                print_rows(rows);
            }
            Value::Object(inner) if inner.values().any(|v| !v.is_object()) => {
                println!("\n{}", title(key));
                print_fields(inner);
            }
            _ => {}
        }
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut any = false;
    for (key, val) in scalar_fields(map) {
        builder.push_record([key.as_str(), &format_scalar(val)]);
        any = true;
    }
    if any {
        println!("{}", Table::from(builder));
    }
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for row in rows {
            println!("{}", format_scalar(row));
        }
        return;
    };

    let headers: Vec<&str> = scalar_fields(first).map(|(k, _)| k.as_str()).collect();
    let mut builder = Builder::default();
    builder.push_record(headers.iter().copied());
    for row in rows.iter().filter_map(Value::as_object) {
        builder.push_record(
            headers
                .iter()
                .map(|h| row.get(*h).map(format_scalar).unwrap_or_default()),
        );
    }
    println!("{}", Table::from(builder));
}

/// Two-way grid with the x values down the side and y values across the top.
fn print_matrix(map: &Map<String, Value>, rows: &[Value]) {
    let labels = |key: &str| -> Vec<String> {
        map.get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().map(format_scalar).collect())
            .unwrap_or_default()
    };
    let x_values = labels("x_values");
    let y_values = labels("y_values");

    let mut builder = Builder::default();
    let mut header = vec![String::from("x \\ y")];
    header.extend(y_values);
    builder.push_record(header);

    for (i, row) in rows.iter().enumerate() {
        let mut record = vec![x_values.get(i).cloned().unwrap_or_default()];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(|c| match c {
                Value::Null => String::from("ERROR"),
                other => format_scalar(other),
            }));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn print_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

fn title(key: &str) -> String {
    key.replace('_', " ").to_uppercase()
}
