use chrono::NaiveDate;

use crate::contract::{validate_dates, PropertyContract};
use crate::errors::{RentalError, Result};
use crate::types::{ContractId, PropertyId};

/// guards the one-active-lease-per-property-per-day invariant
pub struct ContractValidator;

impl ContractValidator {
    /// check a proposed range against every active contract on the property
    ///
    /// Boundaries are inclusive: a lease ending on day X and another starting
    /// on day X overlap.
    pub fn validate<'a, I>(
        contracts: I,
        property_id: PropertyId,
        start: NaiveDate,
        end: NaiveDate,
        excluding: Option<ContractId>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = &'a PropertyContract>,
    {
        validate_dates(start, end)?;

        let conflict = contracts.into_iter().find(|other| {
            other.property_id == property_id
                && other.is_active()
                && Some(other.id) != excluding
                && ranges_overlap(start, end, other.start_date, other.end_date)
        });

        match conflict {
            Some(other) => Err(RentalError::Overlap {
                property_id,
                conflicting_contract: other.id,
                start: other.start_date,
                end: other.end_date,
            }),
            None => Ok(()),
        }
    }

    /// validate a full contract, skipping itself
    pub fn validate_contract<'a, I>(contracts: I, candidate: &PropertyContract) -> Result<()>
    where
        I: IntoIterator<Item = &'a PropertyContract>,
    {
        candidate.validate()?;
        Self::validate(
            contracts,
            candidate.property_id,
            candidate.start_date,
            candidate.end_date,
            Some(candidate.id),
        )
    }
}

/// inclusive interval intersection
pub fn ranges_overlap(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start <= b_end && a_end >= b_start
}
