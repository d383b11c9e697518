use serde_json::Value;

use super::{format_scalar, payload};

/// Headline fields, most specific first.
const HEADLINE_KEYS: [&str; 8] = [
    "npv_difference",
    "recommendation",
    "value",
    "break_even_value",
    "most_sensitive",
    "best_scenario",
    "annual_payment",
    "net_property_equity",
];

/// Print the single answer a script is most likely to want, e.g. the NPV
/// difference of a comparison or the recommendation of a decision.
pub fn print_minimal(value: &Value) {
    let result = payload(value);

    if let Value::Object(map) = result {
        let nested = ["summary", "ownership"]
            .iter()
            .filter_map(|k| map.get(*k).and_then(Value::as_object));
        for candidate in std::iter::once(map).chain(nested) {
            if let Some(v) = HEADLINE_KEYS
                .iter()
                .filter_map(|k| candidate.get(*k))
                .find(|v| !v.is_null())
            {
                println!("{}", format_scalar(v));
                return;
            }
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_scalar(val));
            return;
        }
    }

    println!("{}", format_scalar(result));
}
