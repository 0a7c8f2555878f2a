use serde::{Deserialize, Serialize};

use crate::errors::{RentalError, Result};

/// engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub schedule: ScheduleConfig,
    pub reconciliation: ReconciliationConfig,
    pub invoicing: InvoicingConfig,
}

/// what to do with a trailing period shorter than the payment cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FinalPeriodPolicy {
    /// one entry dated at the contract end, full periodic amount
    #[default]
    DatedAtEnd,
    /// entry dated at the period start, amount scaled by days covered
    Prorated,
    /// no entry for the trailing period
    Skip,
}

/// schedule generation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScheduleConfig {
    pub final_period_policy: FinalPeriodPolicy,
}

/// payment application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// accept payments above the remaining balance and hold the excess as credit
    pub overpayment_as_credit: bool,
    /// reject payments on entries with no linked invoice
    pub require_invoice_before_payment: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            overpayment_as_credit: false,
            require_invoice_before_payment: true,
        }
    }
}

/// advance invoicing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoicingConfig {
    /// earliest lead time before the due date an invoice may be issued
    pub advance_invoice_days: u32,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            advance_invoice_days: 30,
        }
    }
}

/// longest lead time accepted for advance invoicing
const MAX_ADVANCE_INVOICE_DAYS: u32 = 366;

impl EngineConfig {
    /// strict invoicing: every payment must follow an issued invoice
    pub fn invoice_first() -> Self {
        Self {
            reconciliation: ReconciliationConfig {
                overpayment_as_credit: false,
                require_invoice_before_payment: true,
            },
            ..Self::default()
        }
    }

    /// excess payments are kept as tenant credit
    pub fn with_credit() -> Self {
        Self {
            reconciliation: ReconciliationConfig {
                overpayment_as_credit: true,
                require_invoice_before_payment: true,
            },
            ..Self::default()
        }
    }

    /// payments are accepted on pending entries with no invoice linked
    pub fn pay_without_invoice() -> Self {
        Self {
            reconciliation: ReconciliationConfig {
                overpayment_as_credit: false,
                require_invoice_before_payment: false,
            },
            ..Self::default()
        }
    }

    pub fn final_period_policy(mut self, policy: FinalPeriodPolicy) -> Self {
        self.schedule.final_period_policy = policy;
        self
    }

    /// load from a json document; missing sections fall back to defaults
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.invoicing.advance_invoice_days > MAX_ADVANCE_INVOICE_DAYS {
            return Err(RentalError::InvalidConfiguration {
                message: format!(
                    "advance_invoice_days {} exceeds {}",
                    self.invoicing.advance_invoice_days, MAX_ADVANCE_INVOICE_DAYS
                ),
            });
        }
        Ok(())
    }
}
