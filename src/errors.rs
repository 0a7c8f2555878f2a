use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ContractId, ContractStatus, EntryId, InvoiceId, LandlordId, PropertyId};

/// broad category of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// bad input shape, rejected before any mutation
    Validation,
    /// two active contracts would share a property on some day
    Overlap,
    /// illegal transition, entry left untouched
    State,
    /// external invoicing or payment subsystem failed
    Collaborator,
    NotFound,
    Internal,
}

#[derive(Error, Debug)]
pub enum RentalError {
    #[error("invalid contract: {message}")]
    InvalidContract {
        message: String,
    },

    #[error("unrecognized payment frequency: {value}")]
    InvalidFrequency {
        value: String,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPayment {
        amount: Money,
    },

    #[error("invalid invoice id: {message}")]
    InvalidInvoiceId {
        message: String,
    },

    #[error("escalated amount overflows after {periods} periods")]
    AmountOverflow {
        periods: u32,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("property {property_id} already leased by contract {conflicting_contract} ({start} to {end})")]
    Overlap {
        property_id: PropertyId,
        conflicting_contract: ContractId,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("entry {entry_id} already linked to invoice {invoice_id}")]
    AlreadyLinked {
        entry_id: EntryId,
        invoice_id: InvoiceId,
    },

    #[error("entry {entry_id} is already settled")]
    AlreadySettled {
        entry_id: EntryId,
    },

    #[error("payment {attempted} exceeds remaining balance {remaining} on entry {entry_id}")]
    Overpayment {
        entry_id: EntryId,
        remaining: Money,
        attempted: Money,
    },

    #[error("payment reference {reference} already applied to entry {entry_id}")]
    DuplicatePayment {
        entry_id: EntryId,
        reference: String,
    },

    #[error("entry {entry_id} has no linked invoice")]
    InvoiceRequired {
        entry_id: EntryId,
    },

    #[error("entry {entry_id} due {due_date} cannot be invoiced before {opens_on}")]
    OutsideInvoiceWindow {
        entry_id: EntryId,
        due_date: NaiveDate,
        opens_on: NaiveDate,
    },

    #[error("contract {contract_id} is {status:?} and accepts no new schedule entries")]
    ContractClosed {
        contract_id: ContractId,
        status: ContractStatus,
    },

    #[error("invoice creation failed: {message}")]
    InvoiceCreation {
        message: String,
    },

    #[error("landlord not found: {id}")]
    LandlordNotFound {
        id: LandlordId,
    },

    #[error("contract not found: {id}")]
    ContractNotFound {
        id: ContractId,
    },

    #[error("schedule entry not found: {id}")]
    EntryNotFound {
        id: EntryId,
    },

    #[error("lock poisoned: {resource}")]
    LockPoisoned {
        resource: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RentalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RentalError::InvalidContract { .. }
            | RentalError::InvalidFrequency { .. }
            | RentalError::InvalidPayment { .. }
            | RentalError::InvalidConfiguration { .. }
            | RentalError::InvalidInvoiceId { .. }
            | RentalError::AmountOverflow { .. } => ErrorKind::Validation,
            RentalError::Overlap { .. } => ErrorKind::Overlap,
            RentalError::AlreadyLinked { .. }
            | RentalError::AlreadySettled { .. }
            | RentalError::Overpayment { .. }
            | RentalError::DuplicatePayment { .. }
            | RentalError::InvoiceRequired { .. }
            | RentalError::OutsideInvoiceWindow { .. }
            | RentalError::ContractClosed { .. } => ErrorKind::State,
            RentalError::InvoiceCreation { .. } => ErrorKind::Collaborator,
            RentalError::LandlordNotFound { .. }
            | RentalError::ContractNotFound { .. }
            | RentalError::EntryNotFound { .. } => ErrorKind::NotFound,
            RentalError::LockPoisoned { .. } | RentalError::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn poisoned(resource: impl Into<String>) -> Self {
        RentalError::LockPoisoned {
            resource: resource.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RentalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_kinds() {
        let overlap = RentalError::Overlap {
            property_id: Uuid::nil(),
            conflicting_contract: Uuid::nil(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        };
        assert_eq!(overlap.kind(), ErrorKind::Overlap);
        assert_eq!(
            RentalError::AlreadySettled { entry_id: Uuid::nil() }.kind(),
            ErrorKind::State
        );
        assert_eq!(
            RentalError::InvalidPayment { amount: Money::ZERO }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            RentalError::InvoiceCreation { message: "down".to_string() }.kind(),
            ErrorKind::Collaborator
        );
    }

    #[test]
    fn test_overlap_message_names_conflict() {
        let id = Uuid::new_v4();
        let err = RentalError::Overlap {
            property_id: Uuid::nil(),
            conflicting_contract: id,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        };
        assert!(err.to_string().contains(&id.to_string()));
    }
}
