use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::decimal::{Money, Rate};
use crate::errors::{RentalError, Result};
use crate::types::{EscalationCadence, EscalationRule};

/// upper bound on a single escalation step (1000%)
const MAX_ESCALATION_RATE: Decimal = dec!(10);

/// true when `date` is the final day of its month
pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt()
        .map(|next| next.month() != date.month())
        .unwrap_or(true)
}

/// whole calendar months from `start` to `at`
///
/// A month is complete once the start's day-of-month is reached. When the
/// target month is too short to contain that day, its last day completes it,
/// so a schedule starting on the 31st steps through Feb 28/29 cleanly.
pub fn whole_months_between(start: NaiveDate, at: NaiveDate) -> u32 {
    if at <= start {
        return 0;
    }

    let mut months = (at.year() - start.year()) * 12 + at.month() as i32 - start.month() as i32;
    if at.day() < start.day() && !is_last_day_of_month(at) {
        months -= 1;
    }

    months.max(0) as u32
}

/// computes the rent in effect at a point in a contract's life
pub struct EscalationCalculator;

impl EscalationCalculator {
    /// reject rates the engine cannot compound meaningfully
    pub fn validate_rule(rule: &EscalationRule) -> Result<()> {
        if let EscalationRule::Percentage { rate, .. } = rule {
            let r = rate.as_decimal();
            if r < Decimal::ZERO || r >= MAX_ESCALATION_RATE {
                return Err(RentalError::InvalidContract {
                    message: format!("escalation rate {} out of range", rate),
                });
            }
        }
        Ok(())
    }

    /// zero-based count of full escalation periods between `start` and `at`
    pub fn period_index(rule: &EscalationRule, start: NaiveDate, at: NaiveDate) -> u32 {
        match rule.cadence() {
            None => 0,
            Some(cadence) => Self::periods_elapsed(start, at, cadence),
        }
    }

    /// whole cadence periods from `start` to `at`
    pub fn periods_elapsed(start: NaiveDate, at: NaiveDate, cadence: EscalationCadence) -> u32 {
        whole_months_between(start, at) / cadence.months()
    }

    /// escalated amount for a base that is already effective
    pub fn amount_at(base: Money, rule: &EscalationRule, period_index: u32) -> Result<Money> {
        Self::scaled_amount_at(base, None, rule, period_index)
    }

    /// escalated amount, applying a partial-rental percentage first
    pub fn scaled_amount_at(
        base: Money,
        rental_percentage: Option<Decimal>,
        rule: &EscalationRule,
        period_index: u32,
    ) -> Result<Money> {
        Self::unrounded_amount_at(base, rental_percentage, rule, period_index).map(Money::from_decimal)
    }

    /// same as `scaled_amount_at` but without the final rounding
    ///
    /// Everything stays in unrounded decimal so callers that scale further
    /// (proration) still round exactly once.
    pub fn unrounded_amount_at(
        base: Money,
        rental_percentage: Option<Decimal>,
        rule: &EscalationRule,
        period_index: u32,
    ) -> Result<Decimal> {
        let mut effective = base.as_decimal();
        if let Some(percentage) = rental_percentage {
            effective = effective * percentage / dec!(100);
        }

        let factor = match rule {
            EscalationRule::None => Decimal::ONE,
            EscalationRule::Percentage { rate, .. } => compound(*rate, period_index)?,
        };

        effective
            .checked_mul(factor)
            .ok_or(RentalError::AmountOverflow {
                periods: period_index,
            })
    }

    /// amount in effect on `at` for a contract starting on `start`
    pub fn amount_on(
        base: Money,
        rental_percentage: Option<Decimal>,
        rule: &EscalationRule,
        start: NaiveDate,
        at: NaiveDate,
    ) -> Result<Money> {
        let index = Self::period_index(rule, start, at);
        Self::scaled_amount_at(base, rental_percentage, rule, index)
    }
}

fn compound(rate: Rate, periods: u32) -> Result<Decimal> {
    rate.compound_factor(periods)
        .ok_or(RentalError::AmountOverflow { periods })
}
