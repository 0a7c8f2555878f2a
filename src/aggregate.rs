use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::landlord::Landlord;
use crate::schedule::ContractSchedule;
use crate::types::LandlordId;

/// dashboard read model for one landlord
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandlordSummary {
    pub landlord_id: LandlordId,
    pub name: String,
    pub as_of: NaiveDate,
    pub active_contracts: usize,
    pub total_active_rent: Money,
    pub projected_annual_revenue: Money,
    pub total_scheduled: Money,
    pub total_paid: Money,
    pub outstanding_balance: Money,
    pub total_credit: Money,
    pub overdue_entries: usize,
    pub overdue_amount: Money,
}

/// roll-ups over a landlord's contracts and schedules, always recomputed
pub struct Aggregator;

impl Aggregator {
    /// current periodic rent summed over active contracts
    pub fn total_active_rent(landlord: &Landlord, as_of: NaiveDate) -> Result<Money> {
        landlord.total_rental_amount(as_of)
    }

    /// current periodic rent normalized to a year, summed over active contracts
    pub fn projected_annual_revenue(landlord: &Landlord, as_of: NaiveDate) -> Result<Money> {
        let mut total = Decimal::ZERO;
        for contract in landlord.active_contracts() {
            let periodic = contract.current_amount(as_of)?;
            total += periodic.as_decimal() * Decimal::from(contract.payment_frequency.periods_per_year());
        }
        Ok(Money::from_decimal(total))
    }

    pub fn total_active_rent_now(landlord: &Landlord, time_provider: &SafeTimeProvider) -> Result<Money> {
        Self::total_active_rent(landlord, time_provider.now().date_naive())
    }

    pub fn projected_annual_revenue_now(
        landlord: &Landlord,
        time_provider: &SafeTimeProvider,
    ) -> Result<Money> {
        Self::projected_annual_revenue(landlord, time_provider.now().date_naive())
    }

    /// full summary; `schedules` should be the landlord's own contract schedules
    pub fn summarize<'a, I>(landlord: &Landlord, schedules: I, as_of: NaiveDate) -> Result<LandlordSummary>
    where
        I: IntoIterator<Item = &'a ContractSchedule>,
    {
        let mut summary = LandlordSummary {
            landlord_id: landlord.id,
            name: landlord.name.clone(),
            as_of,
            active_contracts: landlord.active_contracts().count(),
            total_active_rent: Self::total_active_rent(landlord, as_of)?,
            projected_annual_revenue: Self::projected_annual_revenue(landlord, as_of)?,
            total_scheduled: Money::ZERO,
            total_paid: Money::ZERO,
            outstanding_balance: Money::ZERO,
            total_credit: Money::ZERO,
            overdue_entries: 0,
            overdue_amount: Money::ZERO,
        };

        for schedule in schedules {
            if landlord.contract(schedule.contract_id).is_none() {
                continue;
            }
            summary.total_scheduled += schedule.total_amount();
            summary.total_paid += schedule.total_paid();
            summary.outstanding_balance += schedule.total_remaining();
            summary.total_credit += schedule.total_credit();
            for entry in schedule.overdue_entries(as_of) {
                summary.overdue_entries += 1;
                summary.overdue_amount += entry.remaining_balance;
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::PropertyContract;
    use crate::decimal::Rate;
    use crate::schedule::ScheduleGenerator;
    use crate::types::{ContractStatus, EscalationRule, PaymentFrequency};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn landlord() -> Landlord {
        let mut landlord = Landlord::new("Skyline Media").unwrap();
        let monthly = PropertyContract::builder()
            .landlord(landlord.id)
            .property(Uuid::new_v4())
            .period(date(2024, 1, 1), date(2026, 12, 31))
            .amount(Money::from_major(1000))
            .escalation(EscalationRule::annual(Rate::from_percentage(5)))
            .build()
            .unwrap();
        let quarterly = PropertyContract::builder()
            .landlord(landlord.id)
            .property(Uuid::new_v4())
            .period(date(2024, 1, 1), date(2024, 12, 31))
            .amount(Money::from_major(3000))
            .frequency(PaymentFrequency::Quarterly)
            .build()
            .unwrap();
        let closed = PropertyContract::builder()
            .landlord(landlord.id)
            .property(Uuid::new_v4())
            .period(date(2024, 1, 1), date(2024, 12, 31))
            .amount(Money::from_major(9999))
            .status(ContractStatus::Terminated)
            .build()
            .unwrap();
        landlord.contracts = vec![monthly, quarterly, closed];
        landlord
    }

    #[test]
    fn test_totals_skip_inactive_contracts() {
        let landlord = landlord();
        let as_of = date(2024, 6, 1);

        assert_eq!(Aggregator::total_active_rent(&landlord, as_of).unwrap(), Money::from_major(4000));
        // 1000 * 12 + 3000 * 4
        assert_eq!(
            Aggregator::projected_annual_revenue(&landlord, as_of).unwrap(),
            Money::from_major(24_000)
        );
    }

    #[test]
    fn test_projection_uses_escalated_amount() {
        let landlord = landlord();
        assert_eq!(
            Aggregator::projected_annual_revenue(&landlord, date(2025, 3, 1)).unwrap(),
            Money::from_major(1050 * 12 + 3000 * 4)
        );
    }

    #[test]
    fn test_now_variants_use_clock() {
        let landlord = landlord();
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()));

        assert_eq!(Aggregator::total_active_rent_now(&landlord, &time).unwrap(), Money::from_major(4050));

        time.test_control().unwrap().advance(chrono::Duration::days(366));
        assert_eq!(
            Aggregator::total_active_rent_now(&landlord, &time).unwrap(),
            Money::from_str_exact("4102.50").unwrap()
        );
    }

    #[test]
    fn test_summary_counts_overdue() {
        let landlord = landlord();
        let generator = ScheduleGenerator::default();
        let schedules: Vec<ContractSchedule> = landlord
            .active_contracts()
            .map(|c| {
                let mut schedule = ContractSchedule::new(c.id);
                schedule.entries = generator.generate(c).unwrap();
                schedule
            })
            .collect();

        let summary = Aggregator::summarize(&landlord, &schedules, date(2024, 2, 15)).unwrap();
        assert_eq!(summary.active_contracts, 2);
        // monthly Jan 1 and Feb 1, quarterly Jan 1
        assert_eq!(summary.overdue_entries, 3);
        assert_eq!(summary.overdue_amount, Money::from_major(5000));
        assert_eq!(summary.total_paid, Money::ZERO);
        assert_eq!(summary.outstanding_balance, summary.total_scheduled);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"overdue_entries\":3"));
    }
}
