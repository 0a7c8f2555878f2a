/// serialization support for the rental book
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::landlord::Landlord;
use crate::schedule::{ContractSchedule, ScheduleEntry};
use crate::types::{ContractId, EntryId, EntryStatus, InvoiceId};

/// current layout version of `BookSnapshot`
pub const SNAPSHOT_VERSION: u32 = 1;

/// full persisted state of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub version: u32,
    #[serde(default)]
    pub config: EngineConfig,
    pub landlords: Vec<Landlord>,
    pub schedules: Vec<ContractSchedule>,
}

impl BookSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// serializable view of an entry with its status as of a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub id: EntryId,
    pub contract_id: ContractId,
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub paid: Money,
    pub remaining_balance: Money,
    pub credit: Money,
    /// derived; `Overdue` appears here, never in storage
    pub status: EntryStatus,
    pub days_overdue: u32,
    pub invoice_id: Option<InvoiceId>,
    pub payment_date: Option<NaiveDate>,
}

impl EntryView {
    pub fn from_entry(entry: &ScheduleEntry, as_of: NaiveDate) -> Self {
        EntryView {
            id: entry.id,
            contract_id: entry.contract_id,
            sequence: entry.sequence,
            due_date: entry.due_date,
            amount: entry.amount,
            paid: entry.partial_payment_amount,
            remaining_balance: entry.remaining_balance,
            credit: entry.credit_amount,
            status: entry.status_on(as_of),
            days_overdue: entry.days_overdue(as_of),
            invoice_id: entry.invoice_id.clone(),
            payment_date: entry.payment_date,
        }
    }
}

/// serializable view of a contract's schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleView {
    pub contract_id: ContractId,
    pub as_of: NaiveDate,
    pub entries: Vec<EntryView>,
    pub total_amount: Money,
    pub total_paid: Money,
    pub total_remaining: Money,
    pub overdue_count: usize,
    pub next_due: Option<NaiveDate>,
}

impl ScheduleView {
    pub fn from_schedule(schedule: &ContractSchedule, as_of: NaiveDate) -> Self {
        ScheduleView {
            contract_id: schedule.contract_id,
            as_of,
            entries: schedule
                .entries
                .iter()
                .map(|e| EntryView::from_entry(e, as_of))
                .collect(),
            total_amount: schedule.total_amount(),
            total_paid: schedule.total_paid(),
            total_remaining: schedule.total_remaining(),
            overdue_count: schedule.overdue_entries(as_of).count(),
            next_due: schedule.next_due().map(|e| e.due_date),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_entry_view_derives_overdue() {
        let entry = ScheduleEntry::new(Uuid::new_v4(), 1, date(2024, 1, 1), 0, Money::from_major(250));
        let view = EntryView::from_entry(&entry, date(2024, 1, 11));

        assert_eq!(view.status, EntryStatus::Overdue);
        assert_eq!(view.days_overdue, 10);
        assert_eq!(entry.status, EntryStatus::Pending);
    }

    #[test]
    fn test_schedule_view_json_keeps_money_as_strings() {
        let contract = Uuid::new_v4();
        let mut schedule = ContractSchedule::new(contract);
        schedule
            .entries
            .push(ScheduleEntry::new(contract, 1, date(2024, 3, 1), 0, Money::from_str_exact("1102.50").unwrap()));

        let view = ScheduleView::from_schedule(&schedule, date(2024, 2, 1));
        assert_eq!(view.next_due, Some(date(2024, 3, 1)));
        assert_eq!(view.overdue_count, 0);

        let json = view.to_json().unwrap();
        assert!(json.contains("\"1102.50\""));
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(BookSnapshot::from_json("{ not json").is_err());
    }
}
