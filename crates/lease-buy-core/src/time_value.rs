use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::LeaseBuyError;
use crate::types::{Money, Percent, Rate};
use crate::LeaseBuyResult;

fn overflowed(what: &str) -> LeaseBuyError {
    LeaseBuyError::CalculationError(format!("{what} overflowed"))
}

/// `amount * pct / 100`, reporting overflow instead of panicking.
pub fn percent_of(amount: Money, pct: Percent) -> LeaseBuyResult<Money> {
    amount
        .checked_mul(pct)
        .map(|v| v / dec!(100))
        .ok_or_else(|| overflowed(&format!("{pct}% of {amount}")))
}

/// Sum of line items; `what` names the total in the error.
pub fn checked_total(what: &str, items: impl IntoIterator<Item = Money>) -> LeaseBuyResult<Money> {
    items
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| overflowed(what))
}

pub fn checked_difference(what: &str, a: Money, b: Money) -> LeaseBuyResult<Money> {
    a.checked_sub(b).ok_or_else(|| overflowed(what))
}

pub fn checked_product(what: &str, a: Decimal, b: Decimal) -> LeaseBuyResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflowed(what))
}

/// Convert a whole-number percentage (5 = 5%) into a decimal rate.
pub fn pct_to_rate(pct: Percent) -> Rate {
    pct / dec!(100)
}

/// `(1 + pct/100)^periods`, reporting overflow instead of panicking.
pub fn compound_factor(pct: Percent, periods: u32) -> LeaseBuyResult<Decimal> {
    let base = Decimal::ONE + pct_to_rate(pct);
    base.checked_powi(i64::from(periods))
        .ok_or_else(|| {
            LeaseBuyError::CalculationError(format!(
                "compounding {pct}% over {periods} periods overflowed"
            ))
        })
}

/// Year-1 indexed escalation: year 1 is the base amount, year N is
/// `base * (1 + pct/100)^(N-1)`.
pub fn escalate(base: Money, pct: Percent, year: u32) -> LeaseBuyResult<Money> {
    if year == 0 {
        return Err(LeaseBuyError::InvalidInput {
            field: "year".into(),
            reason: "Years are 1-indexed".into(),
        });
    }
    let factor = compound_factor(pct, year - 1)?;
    base.checked_mul(factor)
        .ok_or_else(|| LeaseBuyError::CalculationError(format!("escalation of {base} overflowed")))
}

/// Present value of a single amount received at the end of `year`.
pub fn present_value(amount: Money, discount_pct: Percent, year: u32) -> LeaseBuyResult<Money> {
    if discount_pct <= dec!(-100) {
        return Err(LeaseBuyError::CalculationError(
            "Discount rate must be greater than -100%".into(),
        ));
    }
    if discount_pct.is_zero() {
        return Ok(amount);
    }
    let factor = compound_factor(discount_pct, year)?;
    if factor.is_zero() {
        return Err(LeaseBuyError::DivisionByZero {
            context: format!("discount factor at year {year}"),
        });
    }
    amount
        .checked_div(factor)
        .ok_or_else(|| LeaseBuyError::CalculationError(format!("discounting {amount} overflowed")))
}

/// Sum of present values for a series of annual flows. The first flow is
/// discounted one full year.
pub fn discounted_sum(discount_pct: Percent, flows: &[Money]) -> LeaseBuyResult<Money> {
    let mut total = Decimal::ZERO;
    for (idx, cf) in flows.iter().enumerate() {
        let pv = present_value(*cf, discount_pct, idx as u32 + 1)?;
        total = total.checked_add(pv).ok_or_else(|| overflowed("discounted sum"))?;
    }
    Ok(total)
}

/// Future value of a lump sum compounded annually.
pub fn future_value(amount: Money, growth_pct: Percent, years: u32) -> LeaseBuyResult<Money> {
    let factor = compound_factor(growth_pct, years)?;
    amount
        .checked_mul(factor)
        .ok_or_else(|| LeaseBuyError::CalculationError(format!("growing {amount} overflowed")))
}

/// Level annual payment that retires `principal` over `years`.
/// A zero rate repays straight-line.
pub fn level_payment(principal: Money, rate_pct: Percent, years: u32) -> LeaseBuyResult<Money> {
    if years == 0 {
        return Err(LeaseBuyError::InvalidInput {
            field: "years".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }
    if rate_pct.is_zero() {
        return Ok(principal / Decimal::from(years));
    }

    let rate = pct_to_rate(rate_pct);
    let factor = compound_factor(rate_pct, years)?;
    let annuity_factor = factor - Decimal::ONE;

    if annuity_factor.is_zero() {
        return Err(LeaseBuyError::DivisionByZero {
            context: "level payment annuity factor".into(),
        });
    }

    principal
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(factor))
        .and_then(|v| v.checked_div(annuity_factor))
        .ok_or_else(|| LeaseBuyError::CalculationError("level payment overflowed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_escalate_year_one_is_base() {
        assert_eq!(escalate(dec!(1000), dec!(3), 1).unwrap(), dec!(1000));
        assert_eq!(escalate(dec!(1000), dec!(3), 2).unwrap(), dec!(1030));
        assert_eq!(escalate(dec!(1000), dec!(3), 3).unwrap(), dec!(1060.9));
    }

    #[test]
    fn test_escalate_rejects_year_zero() {
        assert!(escalate(dec!(1000), dec!(3), 0).is_err());
    }

    #[test]
    fn test_present_value_discounts_from_year_one() {
        let pv = present_value(dec!(1100), dec!(10), 1).unwrap();
        assert_eq!(pv, dec!(1000));
    }

    #[test]
    fn test_present_value_rejects_minus_hundred() {
        assert!(present_value(dec!(100), dec!(-100), 1).is_err());
    }

    #[test]
    fn test_discounted_sum_zero_rate() {
        let flows = vec![dec!(50), dec!(50), dec!(50)];
        assert_eq!(discounted_sum(dec!(0), &flows).unwrap(), dec!(150));
    }

    #[test]
    fn test_level_payment_known_answer() {
        // 100,000 at 5% over 20 years ≈ 8,024.26
        let pmt = level_payment(dec!(100000), dec!(5), 20).unwrap();
        assert!((pmt - dec!(8024.26)).abs() < dec!(0.01));
    }

    #[test]
    fn test_checked_helpers_report_overflow() {
        assert_eq!(percent_of(dec!(500000), dec!(30)).unwrap(), dec!(150000));
        assert!(percent_of(Decimal::MAX, dec!(30)).is_err());
        assert_eq!(checked_total("costs", [dec!(1), dec!(2), dec!(3)]).unwrap(), dec!(6));
        assert!(matches!(
            checked_total("costs", [Decimal::MAX, Decimal::MAX]),
            Err(LeaseBuyError::CalculationError(_))
        ));
        assert!(checked_difference("gap", Decimal::MIN, Decimal::MAX).is_err());
        assert!(checked_product("area", Decimal::MAX, dec!(2)).is_err());
    }

    #[test]
    fn test_level_payment_zero_rate_is_straight_line() {
        assert_eq!(level_payment(dec!(350000), dec!(0), 20).unwrap(), dec!(17500));
    }
}
