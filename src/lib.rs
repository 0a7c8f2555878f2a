pub mod aggregate;
pub mod book;
pub mod config;
pub mod contract;
pub mod decimal;
pub mod errors;
pub mod escalation;
pub mod events;
pub mod invoicing;
pub mod landlord;
pub mod schedule;
pub mod serialization;
pub mod types;
pub mod validator;

// re-export key types
pub use aggregate::{Aggregator, LandlordSummary};
pub use book::RentalBook;
pub use config::{EngineConfig, FinalPeriodPolicy, InvoicingConfig, ReconciliationConfig, ScheduleConfig};
pub use contract::{PropertyContract, PropertyContractBuilder};
pub use decimal::{Money, Rate};
pub use errors::{ErrorKind, RentalError, Result};
pub use escalation::EscalationCalculator;
pub use events::{Event, EventStore};
pub use invoicing::{InvoiceIssuer, MockInvoiceIssuer};
pub use landlord::Landlord;
pub use schedule::{
    ContractSchedule, PaymentNotification, PaymentOutcome, ScheduleDiff, ScheduleEntry,
    ScheduleGenerator, ScheduleReconciler,
};
pub use serialization::{BookSnapshot, EntryView, ScheduleView};
pub use types::{
    ContractId, ContractStatus, EntryId, EntryStatus, EscalationCadence, EscalationRule, InvoiceId,
    LandlordId, PaymentFrequency, PropertyId,
};
pub use validator::ContractValidator;

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
