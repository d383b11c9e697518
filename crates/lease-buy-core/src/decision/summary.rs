use std::fmt::Write;

use rust_decimal::Decimal;

use super::engine::DecisionResult;
use crate::types::Money;

/// Whole-currency amount with thousands separators, e.g. `$1,250,000` or `-$3,400`.
pub fn format_currency(amount: Money) -> String {
    let rounded = amount.round_dp(0);
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < Decimal::ZERO {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Plain-text executive summary for terminals and reports.
pub fn render_summary(decision: &DecisionResult) -> String {
    if decision.is_error() {
        return format!(
            "Analysis Error: cannot provide an investment recommendation ({})\n",
            decision.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    let s = &decision.executive_summary;
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "Investment Recommendation: {}", decision.recommendation);
    let _ = writeln!(
        out,
        "Confidence Level: {} ({} tolerance)",
        decision.confidence_level.label(),
        decision.risk_tolerance
    );
    if let Some(risk) = &decision.risk {
        let _ = writeln!(out, "Risk Level: {} (score {})", risk.level.label(), risk.score);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Primary Analysis: {}", s.primary_reason);
    let _ = writeln!(out, "Decision: {}", s.decision_summary);

    if !s.supporting_factors.is_empty() {
        let _ = writeln!(out, "\nKey Supporting Factors:");
        for f in &s.supporting_factors {
            let _ = writeln!(out, "  - {f}");
        }
    }
    if !s.key_considerations.is_empty() {
        let _ = writeln!(out, "\nKey Considerations:");
        for c in s.key_considerations.iter().take(3) {
            let _ = writeln!(out, "  - {c}");
        }
    }
    if let Some(note) = &s.confidence_note {
        let _ = writeln!(out, "\nConfidence Assessment: {note}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::engine::{make_decision, RiskTolerance};
    use crate::npv::NpvEngine;
    use crate::params::CalculationParameters;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec!(0)), "$0");
        assert_eq!(format_currency(dec!(999)), "$999");
        assert_eq!(format_currency(dec!(1000)), "$1,000");
        assert_eq!(format_currency(dec!(1234567.6)), "$1,234,568");
        assert_eq!(format_currency(dec!(-3400)), "-$3,400");
    }

    #[test]
    fn test_render_summary_sections() {
        let r = NpvEngine::default().compare(&CalculationParameters::default());
        let d = make_decision(&r, RiskTolerance::Moderate);
        let text = render_summary(&d);
        assert!(text.starts_with("Investment Recommendation: "));
        assert!(text.contains("Primary Analysis: "));
        assert!(text.contains("Confidence Assessment: "));
    }

    #[test]
    fn test_render_error_summary() {
        let r = NpvEngine::default().compare(&CalculationParameters {
            cost_of_capital: dec!(-100),
            ..Default::default()
        });
        let d = make_decision(&r, RiskTolerance::Moderate);
        assert!(render_summary(&d).starts_with("Analysis Error"));
    }
}
