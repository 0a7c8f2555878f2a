use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ReconciliationConfig;
use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::schedule::ScheduleEntry;
use crate::types::{EntryId, EntryStatus, InvoiceId};

/// payment event as delivered by the payment collaborator (at-least-once)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub entry_id: EntryId,
    pub amount: Money,
    pub date: NaiveDate,
    /// collaborator-side id used to drop redeliveries
    pub reference: Option<String>,
}

impl PaymentNotification {
    pub fn new(entry_id: EntryId, amount: Money, date: NaiveDate) -> Self {
        Self {
            entry_id,
            amount,
            date,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// result of a successful payment application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub entry_id: EntryId,
    /// portion that reduced the balance
    pub applied: Money,
    /// portion held as credit
    pub credit: Money,
    pub previous_status: EntryStatus,
    pub status: EntryStatus,
    pub remaining_balance: Money,
}

impl PaymentOutcome {
    pub fn settled(&self) -> bool {
        self.status == EntryStatus::Paid
    }
}

/// drives the entry state machine
///
/// ```text
/// Pending ──link──▶ InvoiceCreated ──pay < balance──▶ PartiallyPaid
///                         │                                 │
///                         └──────pay ≥ balance──▶ Paid ◀────┘
/// ```
///
/// Every check runs before the first write, so a rejected call leaves the
/// entry exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct ScheduleReconciler {
    config: ReconciliationConfig,
}

impl ScheduleReconciler {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    /// attach the external invoice; at most one per entry
    pub fn link_invoice(&self, entry: &mut ScheduleEntry, invoice_id: &str) -> Result<EntryStatus> {
        let invoice_id = invoice_id.trim();
        if invoice_id.is_empty() {
            return Err(RentalError::InvalidInvoiceId {
                message: "invoice id is empty".to_string(),
            });
        }

        if let Some(existing) = &entry.invoice_id {
            warn!(entry_id = %entry.id, existing = %existing, requested = %invoice_id, "invoice already linked");
            return Err(RentalError::AlreadyLinked {
                entry_id: entry.id,
                invoice_id: existing.clone(),
            });
        }

        if entry.is_settled() {
            return Err(RentalError::AlreadySettled { entry_id: entry.id });
        }

        entry.invoice_id = Some(InvoiceId::from(invoice_id));
        if entry.status == EntryStatus::Pending {
            entry.status = EntryStatus::InvoiceCreated;
        }

        debug!(entry_id = %entry.id, invoice_id = %invoice_id, status = %entry.status, "invoice linked");
        Ok(entry.status)
    }

    /// apply a full or partial payment
    pub fn apply_payment(
        &self,
        entry: &mut ScheduleEntry,
        amount: Money,
        date: NaiveDate,
        reference: Option<&str>,
    ) -> Result<PaymentOutcome> {
        if !amount.is_positive() {
            return Err(RentalError::InvalidPayment { amount });
        }

        if let Some(reference) = reference {
            if entry.applied_references.iter().any(|r| r == reference) {
                debug!(entry_id = %entry.id, reference, "duplicate payment notification");
                return Err(RentalError::DuplicatePayment {
                    entry_id: entry.id,
                    reference: reference.to_string(),
                });
            }
        }

        if entry.is_settled() {
            return Err(RentalError::AlreadySettled { entry_id: entry.id });
        }

        if self.config.require_invoice_before_payment && !entry.has_invoice() {
            return Err(RentalError::InvoiceRequired { entry_id: entry.id });
        }

        let remaining = entry.remaining_balance;
        let (applied, credit) = if amount > remaining {
            if !self.config.overpayment_as_credit {
                warn!(entry_id = %entry.id, %amount, %remaining, "overpayment rejected");
                return Err(RentalError::Overpayment {
                    entry_id: entry.id,
                    remaining,
                    attempted: amount,
                });
            }
            (remaining, amount - remaining)
        } else {
            (amount, Money::ZERO)
        };

        let previous_status = entry.status;
        entry.partial_payment_amount += applied;
        entry.remaining_balance = entry.remaining_balance.saturating_sub(applied);
        entry.credit_amount += credit;
        if let Some(reference) = reference {
            entry.applied_references.push(reference.to_string());
        }

        if entry.remaining_balance.is_zero() {
            entry.status = EntryStatus::Paid;
            entry.payment_date = Some(date);
        } else {
            entry.status = EntryStatus::PartiallyPaid;
        }

        debug!(
            entry_id = %entry.id,
            %applied,
            %credit,
            remaining = %entry.remaining_balance,
            status = %entry.status,
            "payment applied"
        );

        Ok(PaymentOutcome {
            entry_id: entry.id,
            applied,
            credit,
            previous_status,
            status: entry.status,
            remaining_balance: entry.remaining_balance,
        })
    }

    pub fn apply_notification(
        &self,
        entry: &mut ScheduleEntry,
        notification: &PaymentNotification,
    ) -> Result<PaymentOutcome> {
        if entry.id != notification.entry_id {
            return Err(RentalError::EntryNotFound {
                id: notification.entry_id,
            });
        }
        self.apply_payment(
            entry,
            notification.amount,
            notification.date,
            notification.reference.as_deref(),
        )
    }

    /// entries past due and unsettled on `today`, in input order
    pub fn overdue<'a, I>(entries: I, today: NaiveDate) -> Vec<&'a ScheduleEntry>
    where
        I: IntoIterator<Item = &'a ScheduleEntry>,
    {
        entries.into_iter().filter(|e| e.is_overdue(today)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(amount: i64) -> ScheduleEntry {
        ScheduleEntry::new(Uuid::new_v4(), 1, date(2024, 1, 1), 0, Money::from_major(amount))
    }

    fn invoiced(amount: i64) -> ScheduleEntry {
        let mut e = entry(amount);
        ScheduleReconciler::default().link_invoice(&mut e, "INV-001").unwrap();
        e
    }

    #[test]
    fn test_link_invoice_moves_to_invoice_created() {
        let mut e = entry(3000);
        let status = ScheduleReconciler::default().link_invoice(&mut e, "INV-001").unwrap();
        assert_eq!(status, EntryStatus::InvoiceCreated);
        assert_eq!(e.invoice_id.as_deref(), Some("INV-001"));
    }

    #[test]
    fn test_second_link_is_rejected_and_changes_nothing() {
        let reconciler = ScheduleReconciler::default();
        let mut e = invoiced(3000);
        let before = e.clone();

        let same = reconciler.link_invoice(&mut e, "INV-001").unwrap_err();
        assert!(matches!(same, RentalError::AlreadyLinked { .. }));
        let other = reconciler.link_invoice(&mut e, "INV-999").unwrap_err();
        assert!(matches!(other, RentalError::AlreadyLinked { ref invoice_id, .. } if invoice_id == "INV-001"));
        assert_eq!(e, before);
    }

    #[test]
    fn test_empty_invoice_id_rejected() {
        let mut e = entry(100);
        assert!(matches!(
            ScheduleReconciler::default().link_invoice(&mut e, "  "),
            Err(RentalError::InvalidInvoiceId { .. })
        ));
        assert!(e.invoice_id.is_none());
    }

    #[test]
    fn test_partial_then_full_payment() {
        let reconciler = ScheduleReconciler::default();
        let mut e = invoiced(3000);

        let first = reconciler
            .apply_payment(&mut e, Money::from_major(1200), date(2024, 1, 5), None)
            .unwrap();
        assert_eq!(first.status, EntryStatus::PartiallyPaid);
        assert_eq!(e.partial_payment_amount, Money::from_major(1200));
        assert_eq!(e.remaining_balance, Money::from_major(1800));
        assert!(e.payment_date.is_none());

        let second = reconciler
            .apply_payment(&mut e, Money::from_major(1800), date(2024, 1, 20), None)
            .unwrap();
        assert!(second.settled());
        assert_eq!(second.previous_status, EntryStatus::PartiallyPaid);
        assert_eq!(e.status, EntryStatus::Paid);
        assert_eq!(e.remaining_balance, Money::ZERO);
        assert_eq!(e.payment_date, Some(date(2024, 1, 20)));
    }

    #[test]
    fn test_pending_payment_requires_invoice_by_default() {
        let mut e = entry(3000);
        let before = e.clone();
        let err = ScheduleReconciler::default()
            .apply_payment(&mut e, Money::from_major(1200), date(2024, 1, 5), None)
            .unwrap_err();
        assert!(matches!(err, RentalError::InvoiceRequired { .. }));
        assert_eq!(e, before);
    }

    #[test]
    fn test_payment_without_invoice_when_relaxed() {
        let reconciler = ScheduleReconciler::new(ReconciliationConfig {
            overpayment_as_credit: false,
            require_invoice_before_payment: false,
        });
        let mut e = entry(3000);
        let outcome = reconciler
            .apply_payment(&mut e, Money::from_major(1200), date(2024, 1, 5), None)
            .unwrap();
        assert_eq!(outcome.status, EntryStatus::PartiallyPaid);
        assert_eq!(e.remaining_balance, Money::from_major(1800));
    }

    #[test]
    fn test_invoice_required_mode() {
        let reconciler = ScheduleReconciler::new(ReconciliationConfig {
            overpayment_as_credit: false,
            require_invoice_before_payment: true,
        });
        let mut e = entry(3000);
        let err = reconciler
            .apply_payment(&mut e, Money::from_major(10), date(2024, 1, 5), None)
            .unwrap_err();
        assert!(matches!(err, RentalError::InvoiceRequired { .. }));

        reconciler.link_invoice(&mut e, "INV-7").unwrap();
        assert!(reconciler
            .apply_payment(&mut e, Money::from_major(10), date(2024, 1, 5), None)
            .is_ok());
    }

    #[test]
    fn test_paid_is_terminal() {
        let reconciler = ScheduleReconciler::default();
        let mut e = invoiced(500);
        reconciler.apply_payment(&mut e, Money::from_major(500), date(2024, 1, 2), None).unwrap();
        let before = e.clone();

        let err = reconciler
            .apply_payment(&mut e, Money::from_major(1), date(2024, 1, 3), None)
            .unwrap_err();
        assert!(matches!(err, RentalError::AlreadySettled { .. }));
        assert_eq!(e, before);
    }

    #[test]
    fn test_invalid_amounts() {
        let reconciler = ScheduleReconciler::default();
        let mut e = invoiced(500);
        let before = e.clone();

        assert!(matches!(
            reconciler.apply_payment(&mut e, Money::ZERO, date(2024, 1, 2), None),
            Err(RentalError::InvalidPayment { .. })
        ));
        assert!(matches!(
            reconciler.apply_payment(&mut e, Money::from_major(-5), date(2024, 1, 2), None),
            Err(RentalError::InvalidPayment { .. })
        ));
        assert_eq!(e, before);
    }

    #[test]
    fn test_sub_cent_notification_is_rejected() {
        let reconciler = ScheduleReconciler::default();
        let mut e = invoiced(500);
        let before = e.clone();
        let json = format!(
            r#"{{ "entry_id": "{}", "amount": "0.001", "date": "2024-01-02", "reference": "dust" }}"#,
            e.id
        );
        let notification: PaymentNotification = serde_json::from_str(&json).unwrap();
        assert!(notification.amount.is_zero());

        let err = reconciler.apply_notification(&mut e, &notification).unwrap_err();
        assert!(matches!(err, RentalError::InvalidPayment { .. }));
        assert_eq!(e, before);
    }

    #[test]
    fn test_overpayment_rejected_by_default() {
        let reconciler = ScheduleReconciler::default();
        let mut e = invoiced(500);
        reconciler.apply_payment(&mut e, Money::from_major(200), date(2024, 1, 2), None).unwrap();
        let before = e.clone();

        let err = reconciler
            .apply_payment(&mut e, Money::from_major(301), date(2024, 1, 3), None)
            .unwrap_err();
        match err {
            RentalError::Overpayment { remaining, attempted, .. } => {
                assert_eq!(remaining, Money::from_major(300));
                assert_eq!(attempted, Money::from_major(301));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(e, before);
    }

    #[test]
    fn test_overpayment_as_credit() {
        let reconciler = ScheduleReconciler::new(ReconciliationConfig {
            overpayment_as_credit: true,
            require_invoice_before_payment: false,
        });
        let mut e = invoiced(500);

        let outcome = reconciler
            .apply_payment(&mut e, Money::from_major(650), date(2024, 1, 2), None)
            .unwrap();
        assert_eq!(outcome.applied, Money::from_major(500));
        assert_eq!(outcome.credit, Money::from_major(150));
        assert_eq!(e.status, EntryStatus::Paid);
        assert_eq!(e.partial_payment_amount, Money::from_major(500));
        assert_eq!(e.remaining_balance, Money::ZERO);
        assert_eq!(e.credit_amount, Money::from_major(150));
    }

    #[test]
    fn test_redelivered_notification_does_not_double_apply() {
        let reconciler = ScheduleReconciler::default();
        let mut e = invoiced(3000);
        let notification = PaymentNotification::new(e.id, Money::from_major(1000), date(2024, 1, 3))
            .with_reference("pay-42");

        reconciler.apply_notification(&mut e, &notification).unwrap();
        let before = e.clone();

        let err = reconciler.apply_notification(&mut e, &notification).unwrap_err();
        assert!(matches!(err, RentalError::DuplicatePayment { .. }));
        assert_eq!(e, before);
        assert_eq!(e.remaining_balance, Money::from_major(2000));
    }

    #[test]
    fn test_link_after_partial_payment_keeps_status() {
        let reconciler = ScheduleReconciler::new(ReconciliationConfig {
            overpayment_as_credit: false,
            require_invoice_before_payment: false,
        });
        let mut e = entry(1000);
        reconciler.apply_payment(&mut e, Money::from_major(100), date(2024, 1, 2), None).unwrap();

        let status = reconciler.link_invoice(&mut e, "INV-late").unwrap();
        assert_eq!(status, EntryStatus::PartiallyPaid);
    }

    #[test]
    fn test_overdue_view() {
        let reconciler = ScheduleReconciler::default();
        let mut paid = invoiced(100);
        reconciler.apply_payment(&mut paid, Money::from_major(100), date(2024, 3, 1), None).unwrap();
        let open = entry(100);
        let today = date(2024, 6, 1);

        assert_eq!(paid.status_on(today), EntryStatus::Paid);
        assert_eq!(open.status_on(today), EntryStatus::Overdue);

        let entries = vec![paid.clone(), open.clone()];
        let overdue = ScheduleReconciler::overdue(&entries, today);
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, open.id);
    }

    proptest! {
        #[test]
        fn prop_balance_identity_holds(payments in proptest::collection::vec(1i64..200_000, 0..20)) {
            let reconciler = ScheduleReconciler::default();
            let mut e = invoiced(5000);

            for cents in payments {
                let _ = reconciler.apply_payment(&mut e, Money::from_minor(cents), date(2024, 1, 2), None);
                prop_assert_eq!(e.remaining_balance, e.amount - e.partial_payment_amount);
                prop_assert!(!e.remaining_balance.is_negative());
                prop_assert!(e.partial_payment_amount <= e.amount);
                prop_assert_eq!(e.status == EntryStatus::Paid, e.remaining_balance.is_zero());
            }
        }
    }
}
