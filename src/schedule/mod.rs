pub mod generator;
pub mod reconciler;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::types::{ContractId, EntryId, EntryStatus, InvoiceId};

pub use generator::{PlannedPeriod, ScheduleDiff, ScheduleGenerator};
pub use reconciler::{PaymentNotification, PaymentOutcome, ScheduleReconciler};

/// stable entry id: the same contract and due date always map to the same id
pub fn entry_id_for(contract_id: ContractId, due_date: NaiveDate) -> EntryId {
    let name = due_date.format("%Y-%m-%d").to_string();
    Uuid::new_v5(&contract_id, name.as_bytes())
}

/// one dated rental obligation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: EntryId,
    pub contract_id: ContractId,
    /// 1-based position in the generated schedule
    pub sequence: u32,
    pub due_date: NaiveDate,
    /// escalation periods elapsed at the due date
    pub period_index: u32,
    pub amount: Money,
    pub partial_payment_amount: Money,
    pub remaining_balance: Money,
    /// excess accepted in overpayment-as-credit mode
    pub credit_amount: Money,
    /// stored status, never `Overdue`
    pub status: EntryStatus,
    pub invoice_id: Option<InvoiceId>,
    pub payment_date: Option<NaiveDate>,
    /// notification references already applied
    #[serde(default)]
    pub applied_references: Vec<String>,
}

impl ScheduleEntry {
    pub fn new(
        contract_id: ContractId,
        sequence: u32,
        due_date: NaiveDate,
        period_index: u32,
        amount: Money,
    ) -> Self {
        Self {
            id: entry_id_for(contract_id, due_date),
            contract_id,
            sequence,
            due_date,
            period_index,
            amount,
            partial_payment_amount: Money::ZERO,
            remaining_balance: amount,
            credit_amount: Money::ZERO,
            status: EntryStatus::Pending,
            invoice_id: None,
            payment_date: None,
            applied_references: Vec::new(),
        }
    }

    pub fn has_invoice(&self) -> bool {
        self.invoice_id.is_some()
    }

    pub fn has_payment(&self) -> bool {
        self.partial_payment_amount.is_positive()
    }

    /// untouched entries may be dropped on regeneration
    pub fn is_removable(&self) -> bool {
        self.status == EntryStatus::Pending && !self.has_invoice() && !self.has_payment()
    }

    pub fn is_settled(&self) -> bool {
        self.status == EntryStatus::Paid
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && !self.is_settled()
    }

    /// status as seen on `today`; overdue is derived here, never stored
    pub fn status_on(&self, today: NaiveDate) -> EntryStatus {
        if self.is_overdue(today) {
            EntryStatus::Overdue
        } else {
            self.status
        }
    }

    /// days past due on `today`, zero when settled or not yet due
    pub fn days_overdue(&self, today: NaiveDate) -> u32 {
        if self.is_overdue(today) {
            (today - self.due_date).num_days() as u32
        } else {
            0
        }
    }

    /// balance and status agreement for an entry loaded from outside
    pub fn check_consistency(&self) -> Result<()> {
        let problem = if !self.amount.is_positive() {
            Some("amount must be positive")
        } else if self.partial_payment_amount.is_negative() || self.partial_payment_amount > self.amount {
            Some("paid amount outside 0..=amount")
        } else if self.remaining_balance != self.amount - self.partial_payment_amount {
            Some("remaining balance does not match amount minus paid")
        } else if self.credit_amount.is_negative() {
            Some("credit is negative")
        } else {
            match self.status {
                EntryStatus::Overdue => Some("overdue is never stored"),
                EntryStatus::Pending if self.has_payment() || self.has_invoice() => {
                    Some("pending entry carries an invoice or payment")
                }
                EntryStatus::InvoiceCreated if !self.has_invoice() || self.has_payment() => {
                    Some("invoiced entry needs an invoice and no payment")
                }
                EntryStatus::PartiallyPaid if !self.has_payment() || self.remaining_balance.is_zero() => {
                    Some("partially paid entry needs a payment and a balance")
                }
                EntryStatus::Paid if !self.remaining_balance.is_zero() => Some("paid entry has a balance"),
                _ => None,
            }
        };

        match problem {
            Some(message) => Err(RentalError::InvalidContract {
                message: format!("entry {}: {}", self.id, message),
            }),
            None => Ok(()),
        }
    }
}

/// the entry set owned by one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSchedule {
    pub contract_id: ContractId,
    pub entries: Vec<ScheduleEntry>,
}

impl ContractSchedule {
    pub fn new(contract_id: ContractId) -> Self {
        Self {
            contract_id,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, entry_id: EntryId) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    pub fn get_mut(&mut self, entry_id: EntryId) -> Result<&mut ScheduleEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or(RentalError::EntryNotFound { id: entry_id })
    }

    pub fn total_amount(&self) -> Money {
        self.entries.iter().map(|e| e.amount).sum()
    }

    pub fn total_paid(&self) -> Money {
        self.entries.iter().map(|e| e.partial_payment_amount).sum()
    }

    pub fn total_remaining(&self) -> Money {
        self.entries.iter().map(|e| e.remaining_balance).sum()
    }

    pub fn total_credit(&self) -> Money {
        self.entries.iter().map(|e| e.credit_amount).sum()
    }

    pub fn overdue_entries(&self, today: NaiveDate) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.iter().filter(move |e| e.is_overdue(today))
    }

    /// first entry not yet settled, in due-date order
    pub fn next_due(&self) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| !e.is_settled())
    }

    /// drop removed entries, insert added ones, keep due-date order
    pub fn apply_diff(&mut self, diff: &ScheduleDiff) {
        self.entries.retain(|e| !diff.removed.contains(&e.id));
        self.entries.extend(diff.added.iter().cloned());
        self.sort();
    }

    /// keep entries in due-date order
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.sequence.cmp(&b.sequence)));
    }
}
