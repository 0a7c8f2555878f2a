use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use hourglass_rs::SafeTimeProvider;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::aggregate::{Aggregator, LandlordSummary};
use crate::config::EngineConfig;
use crate::contract::PropertyContract;
use crate::decimal::Money;
use crate::errors::{RentalError, Result};
use crate::events::{Event, EventStore};
use crate::invoicing::{check_invoice_window, is_invoiceable, InvoiceIssuer};
use crate::landlord::Landlord;
use crate::schedule::{
    ContractSchedule, PaymentNotification, PaymentOutcome, ScheduleDiff, ScheduleEntry,
    ScheduleGenerator, ScheduleReconciler,
};
use crate::serialization::{BookSnapshot, ScheduleView, SNAPSHOT_VERSION};
use crate::types::{ContractId, ContractStatus, EntryId, EntryStatus, InvoiceId, LandlordId};
use crate::validator::ContractValidator;

/// landlords and the contracts they own
#[derive(Debug, Default)]
struct Registry {
    landlords: BTreeMap<LandlordId, Landlord>,
    owners: HashMap<ContractId, LandlordId>,
}

impl Registry {
    fn contracts(&self) -> impl Iterator<Item = &PropertyContract> {
        self.landlords.values().flat_map(|l| l.contracts.iter())
    }

    fn landlord(&self, id: LandlordId) -> Result<&Landlord> {
        self.landlords.get(&id).ok_or(RentalError::LandlordNotFound { id })
    }

    fn contract(&self, id: ContractId) -> Result<&PropertyContract> {
        self.owners
            .get(&id)
            .and_then(|owner| self.landlords.get(owner))
            .and_then(|l| l.contract(id))
            .ok_or(RentalError::ContractNotFound { id })
    }

    fn contract_mut(&mut self, id: ContractId) -> Result<&mut PropertyContract> {
        let owner = *self.owners.get(&id).ok_or(RentalError::ContractNotFound { id })?;
        self.landlords
            .get_mut(&owner)
            .and_then(|l| l.contract_mut(id))
            .ok_or(RentalError::ContractNotFound { id })
    }
}

type SharedSchedule = Arc<Mutex<ContractSchedule>>;

/// in-process store and command surface for rental schedules
///
/// Lock order is registry, then a contract's schedule, then the event store.
/// Payment and invoice commands never touch the registry, so they only
/// contend with other writers on the same contract.
pub struct RentalBook {
    config: EngineConfig,
    generator: ScheduleGenerator,
    reconciler: ScheduleReconciler,
    registry: RwLock<Registry>,
    schedules: DashMap<ContractId, SharedSchedule>,
    entry_index: DashMap<EntryId, ContractId>,
    events: Mutex<EventStore>,
}

impl RentalBook {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            generator: ScheduleGenerator::from_config(&config.schedule),
            reconciler: ScheduleReconciler::new(config.reconciliation.clone()),
            config,
            registry: RwLock::new(Registry::default()),
            schedules: DashMap::new(),
            entry_index: DashMap::new(),
            events: Mutex::new(EventStore::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // registry commands

    pub fn add_landlord(&self, landlord: Landlord, time_provider: &SafeTimeProvider) -> Result<LandlordId> {
        if !landlord.contracts.is_empty() {
            return Err(RentalError::InvalidContract {
                message: "contracts must be added through add_contract".to_string(),
            });
        }

        let mut registry = self.write_registry()?;
        if registry.landlords.contains_key(&landlord.id) {
            return Err(RentalError::InvalidContract {
                message: format!("landlord {} already exists", landlord.id),
            });
        }

        let id = landlord.id;
        let name = landlord.name.clone();
        registry.landlords.insert(id, landlord);
        drop(registry);

        info!(landlord_id = %id, name = %name, "landlord added");
        self.emit(vec![Event::LandlordAdded {
            landlord_id: id,
            name,
            timestamp: time_provider.now(),
        }])?;
        Ok(id)
    }

    /// validate, store and schedule a new contract
    ///
    /// Overlap validation and insertion happen under one registry write
    /// lock, so two racing contracts on the same property cannot both pass.
    pub fn add_contract(
        &self,
        contract: PropertyContract,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<ScheduleEntry>> {
        let mut registry = self.write_registry()?;

        registry.landlord(contract.landlord_id)?;
        if registry.owners.contains_key(&contract.id) {
            return Err(RentalError::InvalidContract {
                message: format!("contract {} already exists", contract.id),
            });
        }

        contract.validate()?;
        if contract.is_active() {
            ContractValidator::validate_contract(registry.contracts(), &contract)?;
        }

        let entries = if contract.status.is_closed() {
            Vec::new()
        } else {
            self.generator.generate(&contract)?
        };

        let mut schedule = ContractSchedule::new(contract.id);
        schedule.entries = entries.clone();
        for entry in &entries {
            self.entry_index.insert(entry.id, contract.id);
        }
        self.schedules.insert(contract.id, Arc::new(Mutex::new(schedule)));

        let now = time_provider.now();
        let added = Event::ContractAdded {
            contract_id: contract.id,
            landlord_id: contract.landlord_id,
            property_id: contract.property_id,
            start_date: contract.start_date,
            end_date: contract.end_date,
            base_amount: contract.base_amount,
            timestamp: now,
        };
        let generated = Event::ScheduleGenerated {
            contract_id: contract.id,
            added: entries.len(),
            removed: 0,
            preserved: 0,
            total_amount: entries.iter().map(|e| e.amount).sum(),
            timestamp: now,
        };

        info!(
            contract_id = %contract.id,
            property_id = %contract.property_id,
            start = %contract.start_date,
            end = %contract.end_date,
            entries = entries.len(),
            "contract added"
        );

        registry.owners.insert(contract.id, contract.landlord_id);
        if let Some(landlord) = registry.landlords.get_mut(&contract.landlord_id) {
            landlord.contracts.push(contract);
        }
        drop(registry);

        self.emit(vec![added, generated])?;
        Ok(entries)
    }

    /// move a contract's dates and regenerate its open entries
    pub fn update_contract_dates(
        &self,
        contract_id: ContractId,
        start: NaiveDate,
        end: NaiveDate,
        time_provider: &SafeTimeProvider,
    ) -> Result<ScheduleDiff> {
        let mut registry = self.write_registry()?;
        let current = registry.contract(contract_id)?.clone();

        if current.status.is_closed() {
            return Err(RentalError::ContractClosed {
                contract_id,
                status: current.status,
            });
        }

        let mut candidate = current.clone();
        candidate.start_date = start;
        candidate.end_date = end;
        candidate.validate()?;
        if candidate.is_active() {
            ContractValidator::validate_contract(registry.contracts(), &candidate)?;
        }

        let now = time_provider.now();
        let (diff, mut events) = self.regenerate_locked(&candidate, now)?;

        *registry.contract_mut(contract_id)? = candidate;
        drop(registry);

        info!(
            contract_id = %contract_id,
            old_start = %current.start_date,
            old_end = %current.end_date,
            new_start = %start,
            new_end = %end,
            "contract dates changed"
        );

        events.insert(
            0,
            Event::ContractDatesChanged {
                contract_id,
                old_start: current.start_date,
                old_end: current.end_date,
                new_start: start,
                new_end: end,
                timestamp: now,
            },
        );
        self.emit(events)?;
        Ok(diff)
    }

    /// change a contract's status; Expired and Terminated are final
    ///
    /// Re-activation re-runs overlap validation. Materialized entries are
    /// left as they are in every case.
    pub fn set_contract_status(
        &self,
        contract_id: ContractId,
        status: ContractStatus,
        time_provider: &SafeTimeProvider,
    ) -> Result<ContractStatus> {
        let mut registry = self.write_registry()?;
        let current = registry.contract(contract_id)?.clone();

        if current.status == status {
            return Ok(status);
        }
        if current.status.is_closed() {
            return Err(RentalError::ContractClosed {
                contract_id,
                status: current.status,
            });
        }
        if status == ContractStatus::Active {
            let mut candidate = current.clone();
            candidate.status = status;
            ContractValidator::validate_contract(registry.contracts(), &candidate)?;
        }

        registry.contract_mut(contract_id)?.status = status;
        drop(registry);

        info!(contract_id = %contract_id, old = ?current.status, new = ?status, "contract status changed");
        self.emit(vec![Event::ContractStatusChanged {
            contract_id,
            old_status: current.status,
            new_status: status,
            timestamp: time_provider.now(),
        }])?;
        Ok(current.status)
    }

    /// bring the stored schedule in line with the contract
    pub fn regenerate_schedule(
        &self,
        contract_id: ContractId,
        time_provider: &SafeTimeProvider,
    ) -> Result<ScheduleDiff> {
        let registry = self.read_registry()?;
        let contract = registry.contract(contract_id)?;

        if contract.status.is_closed() {
            return Err(RentalError::ContractClosed {
                contract_id,
                status: contract.status,
            });
        }

        let (diff, events) = self.regenerate_locked(contract, time_provider.now())?;
        drop(registry);

        self.emit(events)?;
        Ok(diff)
    }

    /// caller holds the registry lock
    fn regenerate_locked(
        &self,
        contract: &PropertyContract,
        now: DateTime<Utc>,
    ) -> Result<(ScheduleDiff, Vec<Event>)> {
        let shared = self.shared_schedule(contract.id)?;
        let mut schedule = lock_schedule(&shared)?;

        let diff = self.generator.regenerate(contract, &schedule.entries)?;
        let mut events = Vec::with_capacity(diff.removed.len() + 1);

        for entry in schedule.entries.iter().filter(|e| diff.removed.contains(&e.id)) {
            events.push(Event::EntryRemoved {
                contract_id: contract.id,
                entry_id: entry.id,
                due_date: entry.due_date,
                timestamp: now,
            });
        }

        schedule.apply_diff(&diff);
        for id in &diff.removed {
            self.entry_index.remove(id);
        }
        for entry in &diff.added {
            self.entry_index.insert(entry.id, contract.id);
        }

        events.push(Event::ScheduleGenerated {
            contract_id: contract.id,
            added: diff.added.len(),
            removed: diff.removed.len(),
            preserved: diff.preserved.len(),
            total_amount: schedule.total_amount(),
            timestamp: now,
        });

        debug!(
            contract_id = %contract.id,
            added = diff.added.len(),
            removed = diff.removed.len(),
            preserved = diff.preserved.len(),
            "schedule regenerated"
        );
        Ok((diff, events))
    }

    // reconciliation commands

    pub fn link_invoice(
        &self,
        entry_id: EntryId,
        invoice_id: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<EntryStatus> {
        let (contract_id, shared) = self.schedule_for_entry(entry_id)?;
        let mut schedule = lock_schedule(&shared)?;
        let entry = schedule.get_mut(entry_id)?;

        let status = self.reconciler.link_invoice(entry, invoice_id)?;
        let linked = entry.invoice_id.clone().unwrap_or_default();
        drop(schedule);

        self.emit(vec![Event::InvoiceLinked {
            contract_id,
            entry_id,
            invoice_id: linked,
            timestamp: time_provider.now(),
        }])?;
        Ok(status)
    }

    /// apply a payment notification; redeliveries with a seen reference are rejected
    pub fn apply_payment(
        &self,
        notification: &PaymentNotification,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentOutcome> {
        let (contract_id, shared) = self.schedule_for_entry(notification.entry_id)?;
        let mut schedule = lock_schedule(&shared)?;
        let entry = schedule.get_mut(notification.entry_id)?;

        let outcome = self.reconciler.apply_notification(entry, notification)?;
        let payment_date = entry.payment_date;
        drop(schedule);

        info!(
            entry_id = %outcome.entry_id,
            applied = %outcome.applied,
            remaining = %outcome.remaining_balance,
            status = %outcome.status,
            "payment applied"
        );

        let now = time_provider.now();
        let mut events = vec![Event::PaymentApplied {
            contract_id,
            entry_id: outcome.entry_id,
            amount: outcome.applied,
            remaining_balance: outcome.remaining_balance,
            status: outcome.status,
            reference: notification.reference.clone(),
            timestamp: now,
        }];
        if outcome.credit.is_positive() {
            events.push(Event::CreditRecorded {
                contract_id,
                entry_id: outcome.entry_id,
                credit: outcome.credit,
                timestamp: now,
            });
        }
        if let Some(payment_date) = payment_date.filter(|_| outcome.settled()) {
            events.push(Event::EntrySettled {
                contract_id,
                entry_id: outcome.entry_id,
                payment_date,
                timestamp: now,
            });
        }
        self.emit(events)?;
        Ok(outcome)
    }

    /// issue an invoice through the collaborator and link it
    ///
    /// The collaborator is called with no lock held. If another caller links
    /// an invoice in the meantime the link fails with `AlreadyLinked` and the
    /// freshly issued invoice id is left for the caller to void.
    pub fn issue_invoice(
        &self,
        entry_id: EntryId,
        issuer: &dyn InvoiceIssuer,
        time_provider: &SafeTimeProvider,
    ) -> Result<InvoiceId> {
        let today = time_provider.now().date_naive();
        let snapshot = self.entry(entry_id)?;

        if let Some(existing) = &snapshot.invoice_id {
            return Err(RentalError::AlreadyLinked {
                entry_id,
                invoice_id: existing.clone(),
            });
        }
        if snapshot.is_settled() {
            return Err(RentalError::AlreadySettled { entry_id });
        }
        check_invoice_window(&snapshot, today, self.config.invoicing.advance_invoice_days)?;

        let invoice_id = issuer.create_invoice(&snapshot).map_err(|err| {
            warn!(entry_id = %entry_id, error = %err, "invoice creation failed");
            err
        })?;

        if let Err(err) = self.link_invoice(entry_id, &invoice_id, time_provider) {
            warn!(entry_id = %entry_id, invoice_id = %invoice_id, error = %err, "issued invoice could not be linked");
            return Err(err);
        }
        Ok(invoice_id)
    }

    // queries

    pub fn landlord(&self, landlord_id: LandlordId) -> Result<Landlord> {
        Ok(self.read_registry()?.landlord(landlord_id)?.clone())
    }

    pub fn contract(&self, contract_id: ContractId) -> Result<PropertyContract> {
        Ok(self.read_registry()?.contract(contract_id)?.clone())
    }

    pub fn schedule(&self, contract_id: ContractId) -> Result<ContractSchedule> {
        let shared = self.shared_schedule(contract_id)?;
        let schedule = lock_schedule(&shared)?;
        Ok(schedule.clone())
    }

    pub fn schedule_view(&self, contract_id: ContractId, as_of: NaiveDate) -> Result<ScheduleView> {
        Ok(ScheduleView::from_schedule(&self.schedule(contract_id)?, as_of))
    }

    pub fn entry(&self, entry_id: EntryId) -> Result<ScheduleEntry> {
        let (_, shared) = self.schedule_for_entry(entry_id)?;
        let schedule = lock_schedule(&shared)?;
        schedule
            .get(entry_id)
            .cloned()
            .ok_or(RentalError::EntryNotFound { id: entry_id })
    }

    /// unsettled entries past due on `as_of`, oldest first
    pub fn overdue_entries(&self, as_of: NaiveDate) -> Result<Vec<ScheduleEntry>> {
        self.collect_entries(|e| e.is_overdue(as_of))
    }

    pub fn overdue_entries_now(&self, time_provider: &SafeTimeProvider) -> Result<Vec<ScheduleEntry>> {
        self.overdue_entries(time_provider.now().date_naive())
    }

    /// entries with no invoice whose advance window is open on `as_of`
    pub fn entries_due_for_invoicing(&self, as_of: NaiveDate) -> Result<Vec<ScheduleEntry>> {
        let days = self.config.invoicing.advance_invoice_days;
        self.collect_entries(|e| is_invoiceable(e, as_of, days))
    }

    pub fn total_active_rent(&self, landlord_id: LandlordId, as_of: NaiveDate) -> Result<Money> {
        let registry = self.read_registry()?;
        Aggregator::total_active_rent(registry.landlord(landlord_id)?, as_of)
    }

    pub fn projected_annual_revenue(&self, landlord_id: LandlordId, as_of: NaiveDate) -> Result<Money> {
        let registry = self.read_registry()?;
        Aggregator::projected_annual_revenue(registry.landlord(landlord_id)?, as_of)
    }

    pub fn summary(&self, landlord_id: LandlordId, as_of: NaiveDate) -> Result<LandlordSummary> {
        let registry = self.read_registry()?;
        let landlord = registry.landlord(landlord_id)?;

        let mut schedules = Vec::with_capacity(landlord.contracts.len());
        for contract in &landlord.contracts {
            let shared = self.shared_schedule(contract.id)?;
            let schedule = lock_schedule(&shared)?;
            schedules.push(schedule.clone());
        }

        Aggregator::summarize(landlord, &schedules, as_of)
    }

    pub fn summary_now(&self, landlord_id: LandlordId, time_provider: &SafeTimeProvider) -> Result<LandlordSummary> {
        self.summary(landlord_id, time_provider.now().date_naive())
    }

    /// drain events emitted since the last call
    pub fn take_events(&self) -> Result<Vec<Event>> {
        Ok(self.lock_events()?.take_events())
    }

    // persistence

    pub fn snapshot(&self) -> Result<BookSnapshot> {
        let registry = self.read_registry()?;

        let mut schedules = Vec::with_capacity(registry.owners.len());
        for landlord in registry.landlords.values() {
            for contract in &landlord.contracts {
                let shared = self.shared_schedule(contract.id)?;
                let schedule = lock_schedule(&shared)?;
                schedules.push(schedule.clone());
            }
        }

        Ok(BookSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.config.clone(),
            landlords: registry.landlords.values().cloned().collect(),
            schedules,
        })
    }

    /// rebuild a book, re-checking overlap and ownership on the way in
    pub fn from_snapshot(snapshot: BookSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RentalError::InvalidConfiguration {
                message: format!("unsupported snapshot version {}", snapshot.version),
            });
        }

        let book = Self::new(snapshot.config)?;
        {
            let mut registry = book.write_registry()?;
            for mut landlord in snapshot.landlords {
                let contracts = std::mem::take(&mut landlord.contracts);
                let landlord_id = landlord.id;
                registry.landlords.insert(landlord_id, landlord);

                for contract in contracts {
                    if contract.landlord_id != landlord_id || registry.owners.contains_key(&contract.id) {
                        return Err(RentalError::InvalidContract {
                            message: format!("contract {} has inconsistent ownership", contract.id),
                        });
                    }
                    contract.validate()?;
                    if contract.is_active() {
                        ContractValidator::validate_contract(registry.contracts(), &contract)?;
                    }
                    registry.owners.insert(contract.id, landlord_id);
                    book.schedules
                        .insert(contract.id, Arc::new(Mutex::new(ContractSchedule::new(contract.id))));
                    if let Some(owner) = registry.landlords.get_mut(&landlord_id) {
                        owner.contracts.push(contract);
                    }
                }
            }
        }

        for mut schedule in snapshot.schedules {
            let shared = book.shared_schedule(schedule.contract_id)?;
            if schedule.entries.iter().any(|e| e.contract_id != schedule.contract_id) {
                return Err(RentalError::InvalidContract {
                    message: format!("schedule {} holds foreign entries", schedule.contract_id),
                });
            }
            for entry in &schedule.entries {
                entry.check_consistency()?;
                book.entry_index.insert(entry.id, schedule.contract_id);
            }
            schedule.sort();
            *lock_schedule(&shared)? = schedule;
        }

        info!(contracts = book.schedules.len(), entries = book.entry_index.len(), "book restored");
        Ok(book)
    }

    pub fn to_json(&self) -> Result<String> {
        self.snapshot()?.to_json()
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Self::from_snapshot(BookSnapshot::from_json(s)?)
    }

    // internals

    fn collect_entries<F>(&self, mut keep: F) -> Result<Vec<ScheduleEntry>>
    where
        F: FnMut(&ScheduleEntry) -> bool,
    {
        let shared: Vec<SharedSchedule> = self.schedules.iter().map(|s| Arc::clone(s.value())).collect();

        let mut entries = Vec::new();
        for schedule in &shared {
            let schedule = lock_schedule(schedule)?;
            entries.extend(schedule.entries.iter().filter(|e| keep(e)).cloned());
        }
        entries.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    fn shared_schedule(&self, contract_id: ContractId) -> Result<SharedSchedule> {
        self.schedules
            .get(&contract_id)
            .map(|s| Arc::clone(s.value()))
            .ok_or(RentalError::ContractNotFound { id: contract_id })
    }

    fn schedule_for_entry(&self, entry_id: EntryId) -> Result<(ContractId, SharedSchedule)> {
        let contract_id = self
            .entry_index
            .get(&entry_id)
            .map(|c| *c.value())
            .ok_or(RentalError::EntryNotFound { id: entry_id })?;
        Ok((contract_id, self.shared_schedule(contract_id)?))
    }

    fn emit(&self, events: Vec<Event>) -> Result<()> {
        self.lock_events()?.extend(events);
        Ok(())
    }

    fn lock_events(&self) -> Result<MutexGuard<'_, EventStore>> {
        self.events.lock().map_err(|_| RentalError::poisoned("event store"))
    }

    fn read_registry(&self) -> Result<RwLockReadGuard<'_, Registry>> {
        self.registry.read().map_err(|_| RentalError::poisoned("registry"))
    }

    fn write_registry(&self) -> Result<RwLockWriteGuard<'_, Registry>> {
        self.registry.write().map_err(|_| RentalError::poisoned("registry"))
    }
}

fn lock_schedule(shared: &SharedSchedule) -> Result<MutexGuard<'_, ContractSchedule>> {
    shared.lock().map_err(|_| RentalError::poisoned("contract schedule"))
}
