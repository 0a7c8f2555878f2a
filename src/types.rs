use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::decimal::Rate;
use crate::errors::RentalError;

/// unique identifier for a landlord
pub type LandlordId = Uuid;

/// unique identifier for a property contract
pub type ContractId = Uuid;

/// unique identifier for a leased property
pub type PropertyId = Uuid;

/// unique identifier for a schedule entry
pub type EntryId = Uuid;

/// identifier assigned by the external invoicing subsystem
pub type InvoiceId = String;

/// how often rent falls due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentFrequency {
    Monthly,
    Quarterly,
    Annually,
}

impl PaymentFrequency {
    /// calendar months between consecutive due dates
    pub fn months(&self) -> u32 {
        match self {
            PaymentFrequency::Monthly => 1,
            PaymentFrequency::Quarterly => 3,
            PaymentFrequency::Annually => 12,
        }
    }

    /// number of due dates in a year
    pub fn periods_per_year(&self) -> u32 {
        12 / self.months()
    }
}

impl FromStr for PaymentFrequency {
    type Err = RentalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(PaymentFrequency::Monthly),
            "quarterly" => Ok(PaymentFrequency::Quarterly),
            "annually" | "annual" | "yearly" => Ok(PaymentFrequency::Annually),
            _ => Err(RentalError::InvalidFrequency {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentFrequency::Monthly => "Monthly",
            PaymentFrequency::Quarterly => "Quarterly",
            PaymentFrequency::Annually => "Annually",
        };
        f.write_str(s)
    }
}

/// contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    /// in force, participates in overlap checks and aggregates
    Active,
    /// drafted or suspended
    Inactive,
    /// ran to its end date
    Expired,
    /// ended early
    Terminated,
}

impl ContractStatus {
    /// expired and terminated contracts never receive new entries
    pub fn is_closed(&self) -> bool {
        matches!(self, ContractStatus::Expired | ContractStatus::Terminated)
    }
}

impl FromStr for ContractStatus {
    type Err = RentalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ContractStatus::Active),
            "inactive" => Ok(ContractStatus::Inactive),
            "expired" => Ok(ContractStatus::Expired),
            "terminated" => Ok(ContractStatus::Terminated),
            _ => Err(RentalError::InvalidContract {
                message: format!("unknown contract status '{}'", s),
            }),
        }
    }
}

/// status of a schedule entry as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    Pending,
    InvoiceCreated,
    PartiallyPaid,
    Paid,
    /// derived at query time, never stored
    Overdue,
}

impl EntryStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, EntryStatus::Paid)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryStatus::Pending => "Pending",
            EntryStatus::InvoiceCreated => "Invoice Created",
            EntryStatus::PartiallyPaid => "Partially Paid",
            EntryStatus::Paid => "Paid",
            EntryStatus::Overdue => "Overdue",
        };
        f.write_str(s)
    }
}

/// how often an escalation step applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscalationCadence {
    Annual,
    Monthly,
}

impl EscalationCadence {
    pub fn months(&self) -> u32 {
        match self {
            EscalationCadence::Annual => 12,
            EscalationCadence::Monthly => 1,
        }
    }
}

/// contractual rent escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EscalationRule {
    #[default]
    None,
    /// compounding percentage increase at each cadence boundary
    Percentage { rate: Rate, cadence: EscalationCadence },
}

impl EscalationRule {
    pub fn annual(rate: Rate) -> Self {
        EscalationRule::Percentage {
            rate,
            cadence: EscalationCadence::Annual,
        }
    }

    pub fn monthly(rate: Rate) -> Self {
        EscalationRule::Percentage {
            rate,
            cadence: EscalationCadence::Monthly,
        }
    }

    pub fn cadence(&self) -> Option<EscalationCadence> {
        match self {
            EscalationRule::None => None,
            EscalationRule::Percentage { cadence, .. } => Some(*cadence),
        }
    }
}
