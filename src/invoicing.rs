use chrono::{Duration, NaiveDate};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::errors::{RentalError, Result};
use crate::schedule::ScheduleEntry;
use crate::types::{EntryId, InvoiceId};

/// external accounting subsystem that issues invoices
pub trait InvoiceIssuer {
    /// create an invoice for the entry and return its id
    ///
    /// Implementations report failures as `RentalError::InvoiceCreation`;
    /// the book never retries on its own.
    fn create_invoice(&self, entry: &ScheduleEntry) -> Result<InvoiceId>;
}

/// first day an invoice may be issued for `due_date`
pub fn invoice_window_opens(due_date: NaiveDate, advance_days: u32) -> NaiveDate {
    due_date - Duration::days(i64::from(advance_days))
}

/// an entry still needs an invoice and its window is open on `as_of`
pub fn is_invoiceable(entry: &ScheduleEntry, as_of: NaiveDate, advance_days: u32) -> bool {
    !entry.has_invoice() && !entry.is_settled() && as_of >= invoice_window_opens(entry.due_date, advance_days)
}

/// reject issuance before the advance window opens
pub fn check_invoice_window(entry: &ScheduleEntry, as_of: NaiveDate, advance_days: u32) -> Result<()> {
    let opens_on = invoice_window_opens(entry.due_date, advance_days);
    if as_of < opens_on {
        return Err(RentalError::OutsideInvoiceWindow {
            entry_id: entry.id,
            due_date: entry.due_date,
            opens_on,
        });
    }
    Ok(())
}

/// mock invoice issuer for testing
#[derive(Debug)]
pub struct MockInvoiceIssuer {
    prefix: String,
    next_number: AtomicU64,
    failing: AtomicBool,
    issued: Mutex<Vec<EntryId>>,
}

impl MockInvoiceIssuer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next_number: AtomicU64::new(1),
            failing: AtomicBool::new(false),
            issued: Mutex::new(Vec::new()),
        }
    }

    /// make every following call fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// entries an invoice was created for, in call order
    pub fn issued(&self) -> Vec<EntryId> {
        self.issued
            .lock()
            .map(|issued| issued.clone())
            .unwrap_or_default()
    }
}

impl Default for MockInvoiceIssuer {
    fn default() -> Self {
        Self::new("INV")
    }
}

impl InvoiceIssuer for MockInvoiceIssuer {
    fn create_invoice(&self, entry: &ScheduleEntry) -> Result<InvoiceId> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RentalError::InvoiceCreation {
                message: format!("accounting unavailable for entry {}", entry.id),
            });
        }

        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        self.issued
            .lock()
            .map_err(|_| RentalError::poisoned("mock invoice log"))?
            .push(entry.id);
        Ok(format!("{}-{:05}", self.prefix, number))
    }
}
