use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ContractId, ContractStatus, EntryId, EntryStatus, InvoiceId, LandlordId, PropertyId};

/// all events that can be emitted by the rental book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // contract lifecycle events
    LandlordAdded {
        landlord_id: LandlordId,
        name: String,
        timestamp: DateTime<Utc>,
    },
    ContractAdded {
        contract_id: ContractId,
        landlord_id: LandlordId,
        property_id: PropertyId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        base_amount: Money,
        timestamp: DateTime<Utc>,
    },
    ContractDatesChanged {
        contract_id: ContractId,
        old_start: NaiveDate,
        old_end: NaiveDate,
        new_start: NaiveDate,
        new_end: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    ContractStatusChanged {
        contract_id: ContractId,
        old_status: ContractStatus,
        new_status: ContractStatus,
        timestamp: DateTime<Utc>,
    },

    // schedule events
    ScheduleGenerated {
        contract_id: ContractId,
        added: usize,
        removed: usize,
        preserved: usize,
        total_amount: Money,
        timestamp: DateTime<Utc>,
    },
    EntryRemoved {
        contract_id: ContractId,
        entry_id: EntryId,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    // reconciliation events
    InvoiceLinked {
        contract_id: ContractId,
        entry_id: EntryId,
        invoice_id: InvoiceId,
        timestamp: DateTime<Utc>,
    },
    PaymentApplied {
        contract_id: ContractId,
        entry_id: EntryId,
        amount: Money,
        remaining_balance: Money,
        status: EntryStatus,
        reference: Option<String>,
        timestamp: DateTime<Utc>,
    },
    EntrySettled {
        contract_id: ContractId,
        entry_id: EntryId,
        payment_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    CreditRecorded {
        contract_id: ContractId,
        entry_id: EntryId,
        credit: Money,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// contract the event concerns, if any
    pub fn contract_id(&self) -> Option<ContractId> {
        match self {
            Event::LandlordAdded { .. } => None,
            Event::ContractAdded { contract_id, .. }
            | Event::ContractDatesChanged { contract_id, .. }
            | Event::ContractStatusChanged { contract_id, .. }
            | Event::ScheduleGenerated { contract_id, .. }
            | Event::EntryRemoved { contract_id, .. }
            | Event::InvoiceLinked { contract_id, .. }
            | Event::PaymentApplied { contract_id, .. }
            | Event::EntrySettled { contract_id, .. }
            | Event::CreditRecorded { contract_id, .. } => Some(*contract_id),
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
