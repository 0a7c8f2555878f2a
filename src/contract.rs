use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::escalation::EscalationCalculator;
use crate::types::{
    ContractId, ContractStatus, EscalationRule, LandlordId, PaymentFrequency, PropertyId,
};

/// one rental agreement between a landlord and a leased property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyContract {
    pub id: ContractId,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub base_amount: Money,
    pub payment_frequency: PaymentFrequency,
    pub escalation: EscalationRule,
    pub status: ContractStatus,
    /// share of the property rented, 0 < p <= 100
    pub rental_percentage: Option<Decimal>,
}

impl PropertyContract {
    pub fn builder() -> PropertyContractBuilder {
        PropertyContractBuilder::new()
    }

    /// shape checks that need no other contract
    pub fn validate(&self) -> Result<()> {
        validate_dates(self.start_date, self.end_date)?;

        if !self.base_amount.is_positive() {
            return Err(RentalError::InvalidContract {
                message: format!("base amount must be positive, got {}", self.base_amount),
            });
        }

        if let Some(percentage) = self.rental_percentage {
            if percentage <= Decimal::ZERO || percentage > dec!(100) {
                return Err(RentalError::InvalidContract {
                    message: format!("rental percentage {} outside (0, 100]", percentage),
                });
            }
        }

        EscalationCalculator::validate_rule(&self.escalation)
    }

    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }

    /// inclusive range test
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// periodic amount in effect on `as_of`, escalation applied
    ///
    /// Dates before the start use the opening amount, dates after the end
    /// use the final amount.
    pub fn current_amount(&self, as_of: NaiveDate) -> Result<Money> {
        let at = as_of.max(self.start_date).min(self.end_date);
        EscalationCalculator::amount_on(
            self.base_amount,
            self.rental_percentage,
            &self.escalation,
            self.start_date,
            at,
        )
    }

    /// current periodic amount normalized to a year
    pub fn annualized_amount(&self, as_of: NaiveDate) -> Result<Money> {
        let periodic = self.current_amount(as_of)?;
        Ok(periodic * Decimal::from(self.payment_frequency.periods_per_year()))
    }
}

pub(crate) fn validate_dates(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end <= start {
        return Err(RentalError::InvalidContract {
            message: format!("end date {} must be after start date {}", end, start),
        });
    }
    Ok(())
}

/// builder for property contracts
#[derive(Debug, Default)]
pub struct PropertyContractBuilder {
    id: Option<ContractId>,
    landlord_id: Option<LandlordId>,
    property_id: Option<PropertyId>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    base_amount: Option<Money>,
    payment_frequency: Option<PaymentFrequency>,
    escalation: EscalationRule,
    status: Option<ContractStatus>,
    rental_percentage: Option<Decimal>,
}

impl PropertyContractBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: ContractId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn landlord(mut self, landlord_id: LandlordId) -> Self {
        self.landlord_id = Some(landlord_id);
        self
    }

    pub fn property(mut self, property_id: PropertyId) -> Self {
        self.property_id = Some(property_id);
        self
    }

    pub fn period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.base_amount = Some(amount);
        self
    }

    pub fn frequency(mut self, frequency: PaymentFrequency) -> Self {
        self.payment_frequency = Some(frequency);
        self
    }

    pub fn escalation(mut self, rule: EscalationRule) -> Self {
        self.escalation = rule;
        self
    }

    pub fn status(mut self, status: ContractStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn rental_percentage(mut self, percentage: Decimal) -> Self {
        self.rental_percentage = Some(percentage);
        self
    }

    pub fn build(self) -> Result<PropertyContract> {
        let landlord_id = self.landlord_id.ok_or(RentalError::InvalidContract {
            message: "landlord required".to_string(),
        })?;

        let property_id = self.property_id.ok_or(RentalError::InvalidContract {
            message: "property required".to_string(),
        })?;

        let (start_date, end_date) = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(RentalError::InvalidContract {
                    message: "start and end dates required".to_string(),
                })
            }
        };

        let base_amount = self.base_amount.ok_or(RentalError::InvalidContract {
            message: "base amount required".to_string(),
        })?;

        let contract = PropertyContract {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            landlord_id,
            property_id,
            start_date,
            end_date,
            base_amount,
            payment_frequency: self.payment_frequency.unwrap_or(PaymentFrequency::Monthly),
            escalation: self.escalation,
            status: self.status.unwrap_or(ContractStatus::Active),
            rental_percentage: self.rental_percentage,
        };

        contract.validate()?;
        Ok(contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn base_builder() -> PropertyContractBuilder {
        PropertyContract::builder()
            .landlord(Uuid::new_v4())
            .property(Uuid::new_v4())
            .period(date(2024, 1, 1), date(2026, 12, 31))
            .amount(Money::from_major(1000))
    }

    #[test]
    fn test_builder_defaults() {
        let contract = base_builder().build().unwrap();
        assert_eq!(contract.status, ContractStatus::Active);
        assert_eq!(contract.payment_frequency, PaymentFrequency::Monthly);
        assert_eq!(contract.escalation, EscalationRule::None);
        assert!(contract.rental_percentage.is_none());
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let reversed = base_builder().period(date(2024, 6, 1), date(2024, 1, 1)).build();
        assert!(matches!(reversed, Err(RentalError::InvalidContract { .. })));

        let same_day = base_builder().period(date(2024, 6, 1), date(2024, 6, 1)).build();
        assert!(matches!(same_day, Err(RentalError::InvalidContract { .. })));

        let zero = base_builder().amount(Money::ZERO).build();
        assert!(matches!(zero, Err(RentalError::InvalidContract { .. })));

        let negative = base_builder().amount(Money::from_major(-5)).build();
        assert!(negative.is_err());

        let over = base_builder().rental_percentage(dec!(120)).build();
        assert!(over.is_err());

        let none = base_builder().rental_percentage(Decimal::ZERO).build();
        assert!(none.is_err());

        let missing = PropertyContract::builder().property(Uuid::new_v4()).build();
        assert!(missing.is_err());
    }

    #[test]
    fn test_current_amount_tracks_anniversaries() {
        let contract = base_builder()
            .escalation(EscalationRule::annual(Rate::from_percentage(5)))
            .build()
            .unwrap();

        assert_eq!(contract.current_amount(date(2023, 6, 1)).unwrap(), Money::from_major(1000));
        assert_eq!(contract.current_amount(date(2024, 12, 31)).unwrap(), Money::from_major(1000));
        assert_eq!(contract.current_amount(date(2025, 1, 1)).unwrap(), Money::from_major(1050));
        assert_eq!(
            contract.current_amount(date(2030, 1, 1)).unwrap(),
            Money::from_str_exact("1102.50").unwrap()
        );
    }

    #[test]
    fn test_annualized_amount() {
        let quarterly = base_builder()
            .frequency(PaymentFrequency::Quarterly)
            .amount(Money::from_major(3000))
            .build()
            .unwrap();
        assert_eq!(quarterly.annualized_amount(date(2024, 3, 1)).unwrap(), Money::from_major(12_000));

        let partial = base_builder().rental_percentage(dec!(25)).build().unwrap();
        assert_eq!(partial.annualized_amount(date(2024, 3, 1)).unwrap(), Money::from_major(3000));
    }

    #[test]
    fn test_covers_is_inclusive() {
        let contract = base_builder().build().unwrap();
        assert!(contract.covers(date(2024, 1, 1)));
        assert!(contract.covers(date(2026, 12, 31)));
        assert!(!contract.covers(date(2027, 1, 1)));
    }
}
