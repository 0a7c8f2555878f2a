/// escalation - compounding rent increases and final-period policies
use rental_schedule_rs::chrono::NaiveDate;
use rental_schedule_rs::{
    EscalationCalculator, EscalationRule, FinalPeriodPolicy, Money, PropertyContract, Rate,
    ScheduleGenerator, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== escalation example ===\n");

    // 5% annual escalation on a 1000/month lease
    let rule = EscalationRule::annual(Rate::from_percentage(5));
    for year in 0..4 {
        let amount = EscalationCalculator::amount_at(Money::from_major(1000), &rule, year)?;
        println!("year {}: {}", year + 1, amount);
    }

    // a lease that ends mid-period
    let contract = PropertyContract::builder()
        .landlord(Uuid::new_v4())
        .property(Uuid::new_v4())
        .period(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2026, 3, 15).unwrap())
        .amount(Money::from_major(1000))
        .escalation(rule)
        .build()?;

    for policy in [FinalPeriodPolicy::DatedAtEnd, FinalPeriodPolicy::Prorated, FinalPeriodPolicy::Skip] {
        let entries = ScheduleGenerator::new(policy).generate(&contract)?;
        let last = entries.last().ok_or("empty schedule")?;
        println!(
            "\n{:?}: {} entries, last due {} for {}",
            policy,
            entries.len(),
            last.due_date,
            last.amount
        );
    }

    Ok(())
}
