/// quick start - minimal example to get started
use rental_schedule_rs::chrono::NaiveDate;
use rental_schedule_rs::{
    EngineConfig, Landlord, Money, PaymentFrequency, PaymentNotification, PropertyContract, RentalBook,
    SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let book = RentalBook::new(EngineConfig::default())?;

    // register a landlord and one quarterly billboard lease
    let landlord = book.add_landlord(Landlord::new("Metro Billboards")?, &time)?;
    let contract = PropertyContract::builder()
        .landlord(landlord)
        .property(Uuid::new_v4())
        .period(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
        .amount(Money::from_major(3000))
        .frequency(PaymentFrequency::Quarterly)
        .build()?;

    let entries = book.add_contract(contract, &time)?;
    for entry in &entries {
        println!("{}  {}  {}", entry.due_date, entry.amount, entry.status);
    }

    // pay the first quarter in two parts
    let first = entries[0].id;
    book.link_invoice(first, "INV-0001", &time)?;
    book.apply_payment(&PaymentNotification::new(first, Money::from_major(1200), entries[0].due_date), &time)?;
    let outcome = book.apply_payment(&PaymentNotification::new(first, Money::from_major(1800), entries[0].due_date), &time)?;

    println!("\nfirst quarter: {} (remaining {})", outcome.status, outcome.remaining_balance);
    Ok(())
}
