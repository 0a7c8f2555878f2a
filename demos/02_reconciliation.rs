/// reconciliation - partial payments, duplicates, credit and overdue tracking
use chrono::{Duration, TimeZone, Utc};
use rental_schedule_rs::{
    EngineConfig, Landlord, Money, PaymentNotification, PropertyContract, RentalBook, SafeTimeProvider,
    TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== reconciliation example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();

    // excess payments are kept as credit instead of rejected
    let book = RentalBook::new(EngineConfig::with_credit())?;
    let landlord = book.add_landlord(Landlord::new("Harbor Signs")?, &time)?;
    let contract = PropertyContract::builder()
        .landlord(landlord)
        .property(Uuid::new_v4())
        .period(time.now().date_naive(), time.now().date_naive() + Duration::days(365))
        .amount(Money::from_major(800))
        .build()?;
    let entries = book.add_contract(contract, &time)?;
    book.link_invoice(entries[0].id, "INV-2024-01", &time)?;

    let january = PaymentNotification::new(entries[0].id, Money::from_major(500), time.now().date_naive())
        .with_reference("bank-0001");
    book.apply_payment(&january, &time)?;

    // the bank redelivers the same notification
    match book.apply_payment(&january, &time) {
        Ok(_) => println!("unexpected double application"),
        Err(err) => println!("redelivery rejected: {}", err),
    }

    let top_up = PaymentNotification::new(entries[0].id, Money::from_major(350), time.now().date_naive())
        .with_reference("bank-0002");
    let outcome = book.apply_payment(&top_up, &time)?;
    println!("january: {} with {} credit", outcome.status, outcome.credit);

    // three months later nothing else has been paid
    controller.advance(Duration::days(95));
    for entry in book.overdue_entries_now(&time)? {
        println!(
            "overdue: {} {} ({} days)",
            entry.due_date,
            entry.remaining_balance,
            entry.days_overdue(time.now().date_naive())
        );
    }

    let summary = book.summary_now(landlord, &time)?;
    println!("\n{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
