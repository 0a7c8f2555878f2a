/// invoicing - advance invoice window and the accounting collaborator
use chrono::{Duration, TimeZone, Utc};
use rental_schedule_rs::{
    EngineConfig, Landlord, MockInvoiceIssuer, Money, PaymentFrequency, PaymentNotification,
    PropertyContract, RentalBook, SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== invoicing example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    let controller = time.test_control().unwrap();

    // payments are only accepted against issued invoices
    let book = RentalBook::new(EngineConfig::invoice_first())?;
    let issuer = MockInvoiceIssuer::new("ACME");

    let landlord = book.add_landlord(Landlord::new("Coastal Outdoor")?, &time)?;
    let contract = PropertyContract::builder()
        .landlord(landlord)
        .property(Uuid::new_v4())
        .period(time.now().date_naive(), time.now().date_naive() + Duration::days(365))
        .amount(Money::from_major(4500))
        .frequency(PaymentFrequency::Quarterly)
        .build()?;
    book.add_contract(contract, &time)?;

    // a driver loop: once a month, issue whatever has entered its window
    for _ in 0..6 {
        let today = time.now().date_naive();
        for entry in book.entries_due_for_invoicing(today)? {
            let invoice = book.issue_invoice(entry.id, &issuer, &time)?;
            println!("{}: issued {} for entry due {}", today, invoice, entry.due_date);

            book.apply_payment(&PaymentNotification::new(entry.id, entry.amount, today), &time)?;
        }
        controller.advance(Duration::days(30));
    }

    for event in book.take_events()? {
        println!("{:?}", event);
    }
    Ok(())
}
