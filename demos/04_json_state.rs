/// json state - export a book, restore it and render a schedule view
use chrono::{TimeZone, Utc};
use rental_schedule_rs::{
    EngineConfig, EscalationRule, Landlord, Money, PaymentNotification, PropertyContract, Rate, RentalBook,
    SafeTimeProvider, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== json state serialization ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    let config = EngineConfig::from_json_str(r#"{ "invoicing": { "advance_invoice_days": 14 } }"#)?;
    let book = RentalBook::new(config)?;

    let landlord = Landlord::new("Northline Media")?.with_detail("email", "billing@northline.example");
    let landlord_id = book.add_landlord(landlord, &time)?;
    let contract = PropertyContract::builder()
        .landlord(landlord_id)
        .property(Uuid::new_v4())
        .period(time.now().date_naive(), time.now().date_naive() + chrono::Duration::days(400))
        .amount(Money::from_major(1000))
        .escalation(EscalationRule::annual(Rate::from_percentage(3)))
        .build()?;
    let contract_id = contract.id;
    let entries = book.add_contract(contract, &time)?;

    book.link_invoice(entries[0].id, "INV-2024-001", &time)?;
    book.apply_payment(&PaymentNotification::new(entries[0].id, Money::from_major(400), time.now().date_naive()), &time)?;

    // stage 1: export
    let json = book.to_json()?;
    println!("exported {} bytes", json.len());

    // stage 2: restore and keep working
    let restored = RentalBook::from_json(&json)?;
    println!("{}", restored.schedule_view(contract_id, time.now().date_naive())?.to_json()?);

    Ok(())
}
