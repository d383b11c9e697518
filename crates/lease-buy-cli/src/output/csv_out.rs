use serde_json::{Map, Value};
use std::io;

use super::{format_scalar, payload, scalar_fields};

/// Lists worth exporting, in order of preference.
const ROW_KEYS: [&str; 8] = [
    "points",
    "schedule",
    "outcomes",
    "tornado",
    "years",
    "ownership_flows",
    "decisions",
    "value_path",
];

/// Write the primary table of a result as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match payload(value) {
        Value::Object(result) => {
            if let Some(Value::Array(matrix)) = result.get("matrix") {
                write_matrix(&mut wtr, result, matrix);
            } else if let Some(rows) = primary_rows(result) {
                write_rows(&mut wtr, rows);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in scalar_fields(result) {
                    let _ = wtr.write_record([key.as_str(), &format_scalar(val)]);
                }
            }
        }
        Value::Array(rows) => write_rows(&mut wtr, rows),
        other => {
            let _ = wtr.write_record([&format_scalar(other)]);
        }
    }

    let _ = wtr.flush();
}

fn primary_rows(result: &Map<String, Value>) -> Option<&[Value]> {
    let direct = ROW_KEYS
        .iter()
        .find_map(|k| result.get(*k).and_then(Value::as_array));
    // Cash-flow and amortization results nest their lists one level down.
    let nested = || {
        result.values().filter_map(Value::as_object).find_map(|inner| {
            ROW_KEYS
                .iter()
                .find_map(|k| inner.get(*k).and_then(Value::as_array))
        })
    };
    direct.or_else(nested).map(Vec::as_slice)
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for row in rows {
            let _ = wtr.write_record([&format_scalar(row)]);
        }
        return;
    };

    let headers: Vec<&str> = scalar_fields(first).map(|(k, _)| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for row in rows.iter().filter_map(Value::as_object) {
        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(format_scalar).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&record);
    }
}

/// Long format: one line per (x, y) cell, empty difference for failed cells.
fn write_matrix(wtr: &mut csv::Writer<io::StdoutLock<'_>>, result: &Map<String, Value>, matrix: &[Value]) {
    let axis = |key: &str| -> Vec<String> {
        result
            .get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().map(format_scalar).collect())
            .unwrap_or_default()
    };
    let x_values = axis("x_values");
    let y_values = axis("y_values");

    let _ = wtr.write_record(["x_value", "y_value", "npv_difference"]);
    for (i, row) in matrix.iter().enumerate() {
        let Some(cells) = row.as_array() else { continue };
        for (j, cell) in cells.iter().enumerate() {
            let _ = wtr.write_record([
                x_values.get(i).map(String::as_str).unwrap_or_default(),
                y_values.get(j).map(String::as_str).unwrap_or_default(),
                format_scalar(cell).as_str(),
            ]);
        }
    }
}
