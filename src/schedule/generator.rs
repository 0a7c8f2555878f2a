use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{FinalPeriodPolicy, ScheduleConfig};
use crate::contract::PropertyContract;
use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::escalation::EscalationCalculator;
use crate::schedule::ScheduleEntry;
use crate::types::{ContractId, EntryId};

/// one billing period of a contract, before it becomes an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedPeriod {
    pub sequence: u32,
    pub period_start: NaiveDate,
    /// inclusive
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    /// days covered / days in a full period; None for full periods
    pub proration: Option<(i64, i64)>,
}

impl PlannedPeriod {
    fn contains(&self, date: NaiveDate) -> bool {
        self.period_start <= date && date <= self.period_end
    }
}

/// changes needed to bring a stored schedule in line with its contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDiff {
    pub contract_id: ContractId,
    /// untouched entries to drop
    pub removed: Vec<EntryId>,
    /// invoiced or paid entries kept as they are
    pub preserved: Vec<EntryId>,
    pub added: Vec<ScheduleEntry>,
}

impl ScheduleDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// expands a contract into dated obligations
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleGenerator {
    policy: FinalPeriodPolicy,
}

impl ScheduleGenerator {
    pub fn new(policy: FinalPeriodPolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.final_period_policy)
    }

    pub fn policy(&self) -> FinalPeriodPolicy {
        self.policy
    }

    /// billing periods from start through end
    ///
    /// Due dates step from the start date itself (start + k * cadence), so a
    /// schedule opening on the 31st does not drift after a short month.
    pub fn plan(&self, contract: &PropertyContract) -> Result<Vec<PlannedPeriod>> {
        contract.validate()?;

        let step = contract.payment_frequency.months();
        let start = contract.start_date;
        let end = contract.end_date;
        let mut periods = Vec::new();
        let mut k: u32 = 0;

        loop {
            let period_start = add_months(start, k * step)?;
            if period_start > end {
                break;
            }
            let next_start = add_months(start, (k + 1) * step)?;
            let sequence = k + 1;

            // full period when the day before the next due date is still inside the contract
            if let Some(last) = next_start.pred_opt().filter(|last| *last <= end) {
                periods.push(PlannedPeriod {
                    sequence,
                    period_start,
                    period_end: last,
                    due_date: period_start,
                    proration: None,
                });
                k += 1;
                continue;
            }

            // a due date on the end date itself is an ordinary obligation
            if period_start == end {
                periods.push(PlannedPeriod {
                    sequence,
                    period_start,
                    period_end: end,
                    due_date: period_start,
                    proration: None,
                });
                break;
            }

            let remaining_days = (end - period_start).num_days();
            match self.policy {
                FinalPeriodPolicy::DatedAtEnd => periods.push(PlannedPeriod {
                    sequence,
                    period_start,
                    period_end: end,
                    due_date: end,
                    proration: None,
                }),
                FinalPeriodPolicy::Prorated => periods.push(PlannedPeriod {
                    sequence,
                    period_start,
                    period_end: end,
                    due_date: period_start,
                    proration: Some((remaining_days + 1, (next_start - period_start).num_days())),
                }),
                FinalPeriodPolicy::Skip => {}
            }
            break;
        }

        Ok(periods)
    }

    /// full entry sequence for a contract snapshot; deterministic
    pub fn generate(&self, contract: &PropertyContract) -> Result<Vec<ScheduleEntry>> {
        let periods = self.plan(contract)?;
        let mut entries = Vec::with_capacity(periods.len());

        for period in periods {
            if let Some(entry) = self.materialize(contract, &period)? {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    /// diff against existing entries, protecting anything invoiced or paid
    ///
    /// A protected entry blocks generation of any new entry whose billing
    /// period contains its due date.
    pub fn regenerate(
        &self,
        contract: &PropertyContract,
        existing: &[ScheduleEntry],
    ) -> Result<ScheduleDiff> {
        let periods = self.plan(contract)?;

        let (kept, dropped): (Vec<&ScheduleEntry>, Vec<&ScheduleEntry>) =
            existing.iter().partition(|e| !e.is_removable());

        let mut added = Vec::new();
        for period in periods {
            if kept.iter().any(|e| period.contains(e.due_date)) {
                continue;
            }
            if let Some(entry) = self.materialize(contract, &period)? {
                added.push(entry);
            }
        }

        Ok(ScheduleDiff {
            contract_id: contract.id,
            removed: dropped.iter().map(|e| e.id).collect(),
            preserved: kept.iter().map(|e| e.id).collect(),
            added,
        })
    }

    fn materialize(
        &self,
        contract: &PropertyContract,
        period: &PlannedPeriod,
    ) -> Result<Option<ScheduleEntry>> {
        let period_index =
            EscalationCalculator::period_index(&contract.escalation, contract.start_date, period.due_date);

        let raw = EscalationCalculator::unrounded_amount_at(
            contract.base_amount,
            contract.rental_percentage,
            &contract.escalation,
            period_index,
        )?;

        let amount = match period.proration {
            Some((covered, full)) if full > 0 => {
                Money::from_decimal(raw * Decimal::from(covered) / Decimal::from(full))
            }
            _ => Money::from_decimal(raw),
        };

        // a sliver of a period can round to nothing
        if !amount.is_positive() {
            return Ok(None);
        }

        Ok(Some(ScheduleEntry::new(
            contract.id,
            period.sequence,
            period.due_date,
            period_index,
            amount,
        )))
    }
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or(RentalError::InvalidContract {
            message: format!("date overflow adding {} months to {}", months, date),
        })
}
