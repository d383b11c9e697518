//! Annual level-payment loan amortization.
//!
//! Each entry's closing balance is the next entry's opening balance. The
//! final year retires whatever balance remains, so a full schedule always
//! closes at exactly zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LeaseBuyError;
use crate::time_value::{
    checked_difference, checked_product, checked_total, level_payment, pct_to_rate,
};
use crate::types::{Money, Percent};
use crate::LeaseBuyResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationEntry {
    pub year: u32,
    pub opening_balance: Money,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub principal: Money,
    pub annual_rate_pct: Percent,
    pub term_years: u32,
    pub annual_payment: Money,
    pub total_payments: Money,
    pub total_interest: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the annual schedule. An empty schedule means an all-cash purchase.
pub fn schedule(
    principal: Money,
    annual_rate_pct: Percent,
    term_years: u32,
) -> LeaseBuyResult<Vec<AmortizationEntry>> {
    check_terms(principal, annual_rate_pct)?;
    if term_years == 0 {
        return Ok(Vec::new());
    }

    let payment = level_payment(principal, annual_rate_pct, term_years)?;
    let rate = pct_to_rate(annual_rate_pct);

    let mut entries = Vec::with_capacity(term_years as usize);
    let mut balance = principal;

    for year in 1..=term_years {
        let opening_balance = balance;
        let interest = checked_product("loan interest", opening_balance, rate)?;
        let (principal_paid, paid) = if year == term_years {
            (opening_balance, checked_total("final loan payment", [opening_balance, interest])?)
        } else {
            (checked_difference("loan principal", payment, interest)?, payment)
        };
        balance = checked_difference("loan balance", opening_balance, principal_paid)?;

        entries.push(AmortizationEntry {
            year,
            opening_balance,
            payment: paid,
            interest,
            principal: principal_paid,
            closing_balance: balance,
        });
    }

    Ok(entries)
}

/// Level annual payment, or zero when there is nothing to finance.
pub fn annual_payment(
    principal: Money,
    annual_rate_pct: Percent,
    term_years: u32,
) -> LeaseBuyResult<Money> {
    check_terms(principal, annual_rate_pct)?;
    if term_years == 0 || principal.is_zero() {
        return Ok(Decimal::ZERO);
    }
    level_payment(principal, annual_rate_pct, term_years)
}

/// Outstanding balance after `year` payments. Zero once the term is over.
pub fn remaining_balance(
    principal: Money,
    annual_rate_pct: Percent,
    term_years: u32,
    year: u32,
) -> LeaseBuyResult<Money> {
    if year == 0 {
        check_terms(principal, annual_rate_pct)?;
        return Ok(principal);
    }
    let entries = schedule(principal, annual_rate_pct, term_years)?;
    Ok(entries
        .get(year as usize - 1)
        .map(|e| e.closing_balance)
        .unwrap_or(Decimal::ZERO))
}

/// Interest/principal split for a single 1-indexed year, `None` beyond the term.
pub fn payment_breakdown(
    principal: Money,
    annual_rate_pct: Percent,
    term_years: u32,
    year: u32,
) -> LeaseBuyResult<Option<AmortizationEntry>> {
    if year == 0 {
        return Err(LeaseBuyError::InvalidInput {
            field: "year".into(),
            reason: "Years are 1-indexed".into(),
        });
    }
    let entries = schedule(principal, annual_rate_pct, term_years)?;
    Ok(entries.into_iter().nth(year as usize - 1))
}

pub fn summarize(
    principal: Money,
    annual_rate_pct: Percent,
    term_years: u32,
) -> LeaseBuyResult<LoanSummary> {
    let entries = schedule(principal, annual_rate_pct, term_years)?;
    let total_payments = checked_total("total loan payments", entries.iter().map(|e| e.payment))?;
    let total_interest = checked_total("total loan interest", entries.iter().map(|e| e.interest))?;

    Ok(LoanSummary {
        principal,
        annual_rate_pct,
        term_years,
        annual_payment: annual_payment(principal, annual_rate_pct, term_years)?,
        total_payments,
        total_interest,
    })
}

fn check_terms(principal: Money, annual_rate_pct: Percent) -> LeaseBuyResult<()> {
    if principal < Decimal::ZERO {
        return Err(LeaseBuyError::InvalidLoanTerms(format!(
            "principal must be non-negative, got {principal}"
        )));
    }
    if annual_rate_pct < Decimal::ZERO {
        return Err(LeaseBuyError::InvalidLoanTerms(format!(
            "annual rate must be non-negative, got {annual_rate_pct}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_schedule_closes_at_zero() {
        let entries = schedule(dec!(350000), dec!(5), 20).unwrap();
        assert_eq!(entries.len(), 20);
        assert_eq!(entries.last().unwrap().closing_balance, Decimal::ZERO);

        let principal_total: Decimal = entries.iter().map(|e| e.principal).sum();
        assert!((principal_total - dec!(350000)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_balances_chain() {
        let entries = schedule(dec!(200000), dec!(6.5), 15).unwrap();
        for pair in entries.windows(2) {
            assert_eq!(pair[0].closing_balance, pair[1].opening_balance);
        }
    }

    #[test]
    fn test_first_year_interest() {
        let entries = schedule(dec!(100000), dec!(5), 20).unwrap();
        assert_eq!(entries[0].interest, dec!(5000));
        assert!((entries[0].payment - dec!(8024.26)).abs() < dec!(0.01));
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let entries = schedule(dec!(350000), dec!(0), 20).unwrap();
        for e in &entries {
            assert_eq!(e.payment, dec!(17500));
            assert_eq!(e.interest, Decimal::ZERO);
        }
    }

    #[test]
    fn test_zero_term_is_empty() {
        assert!(schedule(dec!(350000), dec!(5), 0).unwrap().is_empty());
        assert_eq!(annual_payment(dec!(350000), dec!(5), 0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_negative_principal_rejected() {
        let err = schedule(dec!(-1), dec!(5), 10).unwrap_err();
        assert!(matches!(err, LeaseBuyError::InvalidLoanTerms(_)));
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let a = schedule(dec!(123456.78), dec!(4.25), 25).unwrap();
        let b = schedule(dec!(123456.78), dec!(4.25), 25).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_remaining_balance_and_breakdown() {
        assert_eq!(remaining_balance(dec!(1000), dec!(5), 10, 0).unwrap(), dec!(1000));
        assert_eq!(remaining_balance(dec!(1000), dec!(5), 10, 10).unwrap(), Decimal::ZERO);
        assert_eq!(remaining_balance(dec!(1000), dec!(5), 10, 12).unwrap(), Decimal::ZERO);
        assert!(payment_breakdown(dec!(1000), dec!(5), 10, 11).unwrap().is_none());
        let y3 = payment_breakdown(dec!(1000), dec!(5), 10, 3).unwrap().unwrap();
        assert_eq!(y3.year, 3);
    }

    #[test]
    fn test_summary_totals() {
        let s = summarize(dec!(1000), dec!(0), 4).unwrap();
        assert_eq!(s.total_payments, dec!(1000));
        assert_eq!(s.total_interest, Decimal::ZERO);
        assert_eq!(s.annual_payment, dec!(250));
    }
}
