//! Booking ledger: every booking ever made plus the notification feed they drive.
//!
//! Bookings are never removed; cancelling is a status. Every mutation writes the
//! full booking list (and the feed, when it changed) back to storage.

mod stats;

pub use stats::{CustomerStats, ProfessionalStats};

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::db::{Booking, BookingStatus, Catalog, NewBooking, Notification, NotificationKind};
use crate::error::{Error, Result, ValidationErrorBuilder};
use crate::storage::{self, KeyValueStore, BOOKINGS_KEY, NOTIFICATIONS_KEY};

#[derive(Debug, Default)]
struct LedgerState {
    bookings: Vec<Booking>,
    /// Newest first
    notifications: Vec<Notification>,
}

pub struct BookingLedger {
    state: RwLock<LedgerState>,
    store: Arc<dyn KeyValueStore>,
    catalog: Arc<Catalog>,
    config: LedgerConfig,
}

impl BookingLedger {
    pub fn new(config: LedgerConfig, store: Arc<dyn KeyValueStore>, catalog: Arc<Catalog>) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            store,
            catalog,
            config,
        }
    }

    /// Load persisted bookings and notifications. Corrupt entries are dropped and
    /// the ledger starts empty for that key. Returns the number of bookings loaded.
    pub fn restore(&self) -> usize {
        let bookings: Vec<Booking> =
            storage::load_or_discard(self.store.as_ref(), BOOKINGS_KEY).unwrap_or_default();
        let notifications: Vec<Notification> =
            storage::load_or_discard(self.store.as_ref(), NOTIFICATIONS_KEY).unwrap_or_default();

        let count = bookings.len();
        info!(
            bookings = count,
            notifications = notifications.len(),
            "Ledger restored"
        );
        *self.state.write() = LedgerState {
            bookings,
            notifications,
        };
        count
    }

    pub fn create_booking(&self, request: NewBooking) -> Result<Booking> {
        let mut errors = ValidationErrorBuilder::new();
        errors
            .require("date", &request.date, "Date is required")
            .require("time", &request.time, "Time is required")
            .require(
                "professional_id",
                &request.professional_id,
                "Professional is required",
            );
        errors.finish()?;

        let service = self
            .catalog
            .service(&request.service_id)
            .ok_or_else(|| Error::not_found(format!("Service {} not found", request.service_id)))?;
        let price = self
            .catalog
            .quote(&service.id, &request.professional_id)
            .unwrap_or(service.price);

        let mut state = self.state.write();
        let booking = Booking {
            id: next_booking_id(&state.bookings),
            customer_id: request.customer_id,
            service_id: request.service_id,
            professional_id: request.professional_id,
            date: request.date,
            time: request.time,
            address: request.address,
            notes: request.notes,
            status: BookingStatus::Pending,
            created_at: chrono::Utc::now().to_rfc3339(),
            price,
            rating: None,
            review: None,
        };

        info!(
            booking_id = %booking.id,
            service_id = %booking.service_id,
            professional_id = %booking.professional_id,
            price = booking.price,
            "Booking created"
        );

        state.bookings.push(booking.clone());
        state.notifications.insert(
            0,
            Notification::new(
                NotificationKind::BookingCreated,
                format!(
                    "New booking for {} on {} at {}",
                    service.name, booking.date, booking.time
                ),
            ),
        );
        self.persist(&state, true);
        Ok(booking)
    }

    /// Overwrite a booking's status.
    ///
    /// Any status may replace any other unless `enforce_transitions` is set.
    /// A change to Completed or Cancelled adds a notification; rewriting the
    /// current status changes nothing.
    pub fn update_booking_status(&self, id: &str, status: BookingStatus) -> Result<Booking> {
        let mut state = self.state.write();
        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::not_found(format!("Booking {} not found", id)))?;

        let previous = booking.status;
        if self.config.enforce_transitions && !previous.can_transition_to(status) {
            return Err(Error::conflict(format!(
                "Cannot move booking {} from {} to {}",
                id, previous, status
            )));
        }

        booking.status = status;
        let booking = booking.clone();

        if previous == status {
            debug!(booking_id = %id, status = %status, "Booking status unchanged");
            return Ok(booking);
        }

        info!(booking_id = %id, from = %previous, to = %status, "Booking status changed");
        let notification = match status {
            BookingStatus::Completed => Some(Notification::new(
                NotificationKind::Completed,
                "Service marked as completed",
            )),
            BookingStatus::Cancelled => {
                let service = self
                    .catalog
                    .service(&booking.service_id)
                    .map(|s| s.name.as_str())
                    .unwrap_or("service");
                Some(Notification::new(
                    NotificationKind::Cancelled,
                    format!("Booking for {} on {} was cancelled", service, booking.date),
                ))
            }
            _ => None,
        };

        let notified = notification.is_some();
        if let Some(notification) = notification {
            state.notifications.insert(0, notification);
        }
        self.persist(&state, notified);
        Ok(booking)
    }

    pub fn cancel_booking(&self, id: &str) -> Result<Booking> {
        self.update_booking_status(id, BookingStatus::Cancelled)
    }

    /// Attach a 1 to 5 rating and review. The booking's status is not checked.
    pub fn rate_booking(&self, id: &str, rating: u8, review: &str) -> Result<Booking> {
        if !(1..=5).contains(&rating) {
            return Err(Error::validation_field(
                "rating",
                "Rating must be between 1 and 5",
            ));
        }

        let mut state = self.state.write();
        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::not_found(format!("Booking {} not found", id)))?;

        booking.rating = Some(rating);
        booking.review = (!review.trim().is_empty()).then(|| review.to_string());
        let booking = booking.clone();

        info!(booking_id = %id, rating, "Booking rated");
        self.persist(&state, false);
        Ok(booking)
    }

    pub fn mark_notification_read(&self, id: &str) -> Result<()> {
        let mut state = self.state.write();
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::not_found(format!("Notification {} not found", id)))?;
        notification.read = true;

        if let Err(e) = storage::save(self.store.as_ref(), NOTIFICATIONS_KEY, &state.notifications) {
            warn!(error = %e, "Failed to persist notifications");
        }
        Ok(())
    }

    pub fn booking(&self, id: &str) -> Option<Booking> {
        self.state.read().bookings.iter().find(|b| b.id == id).cloned()
    }

    /// All bookings in creation order
    pub fn bookings(&self) -> Vec<Booking> {
        self.state.read().bookings.clone()
    }

    /// Notification feed, newest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.read().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.state
            .read()
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub fn for_customer(&self, customer_id: &str) -> Vec<Booking> {
        self.filtered(|b| b.customer_id == customer_id)
    }

    pub fn for_professional(&self, professional_id: &str) -> Vec<Booking> {
        self.filtered(|b| b.professional_id == professional_id)
    }

    /// Open bookings for a professional, soonest first. Dates and times are
    /// ISO strings, so they order correctly as text.
    pub fn upcoming_for_professional(&self, professional_id: &str) -> Vec<Booking> {
        let mut upcoming =
            self.filtered(|b| b.professional_id == professional_id && b.status.is_open());
        upcoming.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));
        upcoming
    }

    pub fn professional_stats(&self, professional_id: &str) -> ProfessionalStats {
        let state = self.state.read();
        ProfessionalStats::from_bookings(
            state
                .bookings
                .iter()
                .filter(|b| b.professional_id == professional_id),
        )
    }

    pub fn customer_stats(&self, customer_id: &str) -> CustomerStats {
        let state = self.state.read();
        CustomerStats::from_bookings(
            state
                .bookings
                .iter()
                .filter(|b| b.customer_id == customer_id),
        )
    }

    fn filtered(&self, predicate: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        self.state
            .read()
            .bookings
            .iter()
            .filter(|b| predicate(b))
            .cloned()
            .collect()
    }

    fn persist(&self, state: &LedgerState, notifications: bool) {
        if let Err(e) = storage::save(self.store.as_ref(), BOOKINGS_KEY, &state.bookings) {
            warn!(error = %e, "Failed to persist bookings");
        }
        if notifications {
            if let Err(e) =
                storage::save(self.store.as_ref(), NOTIFICATIONS_KEY, &state.notifications)
            {
                warn!(error = %e, "Failed to persist notifications");
            }
        }
    }
}

/// Millisecond timestamp, bumped past any id already in the ledger
fn next_booking_id(existing: &[Booking]) -> String {
    let mut candidate = chrono::Utc::now().timestamp_millis();
    while existing.iter().any(|b| b.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Fixtures;
    use crate::error::ErrorCode;
    use crate::storage::MemoryStore;

    fn ledger_with(store: Arc<MemoryStore>, config: LedgerConfig) -> BookingLedger {
        let fixtures = Fixtures::embedded().unwrap();
        BookingLedger::new(
            config,
            store,
            Arc::new(Catalog::new(fixtures.services, fixtures.professionals)),
        )
    }

    fn ledger() -> (BookingLedger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ledger_with(store.clone(), LedgerConfig::default()), store)
    }

    fn request(service_id: &str, professional_id: &str, date: &str, time: &str) -> NewBooking {
        NewBooking {
            customer_id: "1".into(),
            service_id: service_id.into(),
            professional_id: professional_id.into(),
            date: date.into(),
            time: time.into(),
            address: "123 Main St".into(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_create_booking_is_pending_with_base_price() {
        let (ledger, _store) = ledger();

        let booking = ledger
            .create_booking(request("1", "1", "2025-01-10", "10:00"))
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.price, 80.0);
        assert!(booking.rating.is_none());

        let notifications = ledger.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::BookingCreated);
        assert_eq!(
            notifications[0].message,
            "New booking for House Cleaning on 2025-01-10 at 10:00"
        );
    }

    #[test]
    fn test_create_booking_uses_custom_price() {
        let (ledger, _store) = ledger();
        let booking = ledger
            .create_booking(request("2", "1", "2025-01-10", "10:00"))
            .unwrap();
        assert_eq!(booking.price, 135.0);
    }

    #[test]
    fn test_newest_notification_first() {
        let (ledger, _store) = ledger();
        ledger
            .create_booking(request("1", "1", "2025-01-10", "10:00"))
            .unwrap();
        ledger
            .create_booking(request("3", "2", "2025-01-11", "09:30"))
            .unwrap();

        let notifications = ledger.notifications();
        assert_eq!(notifications.len(), 2);
        assert!(notifications[0].message.contains("Plumbing Repair"));
    }

    #[test]
    fn test_missing_fields_rejected_before_record() {
        let (ledger, store) = ledger();

        let err = ledger
            .create_booking(request("1", "", "", "10:00"))
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.invalid_fields(), vec!["date", "professional_id"]);
        assert!(ledger.bookings().is_empty());
        assert!(ledger.notifications().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_service_rejected() {
        let (ledger, _store) = ledger();
        let err = ledger
            .create_booking(request("99", "1", "2025-01-10", "10:00"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(ledger.bookings().is_empty());
    }

    #[test]
    fn test_booking_ids_are_unique() {
        let (ledger, _store) = ledger();
        let a = ledger
            .create_booking(request("1", "1", "2025-01-10", "10:00"))
            .unwrap();
        let b = ledger
            .create_booking(request("1", "1", "2025-01-10", "11:00"))
            .unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_cancel_is_idempotent_without_duplicate_notification() {
        let (ledger, _store) = ledger();
        let booking = ledger
            .create_booking(request("1", "1", "2025-01-10", "10:00"))
            .unwrap();

        assert_eq!(
            ledger.cancel_booking(&booking.id).unwrap().status,
            BookingStatus::Cancelled
        );
        assert_eq!(
            ledger.cancel_booking(&booking.id).unwrap().status,
            BookingStatus::Cancelled
        );

        let cancellations = ledger
            .notifications()
            .iter()
            .filter(|n| n.kind == NotificationKind::Cancelled)
            .count();
        assert_eq!(cancellations, 1);
        assert_eq!(ledger.bookings().len(), 1);
    }

    #[test]
    fn test_permissive_status_overwrite() {
        let (ledger, _store) = ledger();
        let booking = ledger
            .create_booking(request("1", "1", "2025-01-10", "10:00"))
            .unwrap();

        ledger
            .update_booking_status(&booking.id, BookingStatus::Completed)
            .unwrap();
        let reopened = ledger
            .update_booking_status(&booking.id, BookingStatus::Pending)
            .unwrap();
        assert_eq!(reopened.status, BookingStatus::Pending);
    }

    #[test]
    fn test_enforced_transitions_reject_illegal_moves() {
        let store = Arc::new(MemoryStore::new());
        let ledger = ledger_with(
            store,
            LedgerConfig {
                enforce_transitions: true,
            },
        );
        let booking = ledger
            .create_booking(request("1", "1", "2025-01-10", "10:00"))
            .unwrap();

        let err = ledger
            .update_booking_status(&booking.id, BookingStatus::Completed)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(
            ledger.booking(&booking.id).unwrap().status,
            BookingStatus::Pending
        );

        ledger
            .update_booking_status(&booking.id, BookingStatus::Confirmed)
            .unwrap();
        ledger
            .update_booking_status(&booking.id, BookingStatus::Completed)
            .unwrap();
        assert!(ledger.cancel_booking(&booking.id).is_err());
    }

    #[test]
    fn test_unknown_booking_is_not_found() {
        let (ledger, _store) = ledger();
        assert_eq!(
            ledger.cancel_booking("nope").unwrap_err().code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            ledger.rate_booking("nope", 4, "").unwrap_err().code(),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn test_completion_updates_earnings_and_rating() {
        let (ledger, _store) = ledger();
        let booking = ledger
            .create_booking(request("2", "1", "2025-01-10", "10:00"))
            .unwrap();
        ledger
            .update_booking_status(&booking.id, BookingStatus::Confirmed)
            .unwrap();

        let before = ledger.professional_stats("1");
        assert_eq!(before.total_earnings, 0.0);

        let completed = ledger
            .update_booking_status(&booking.id, BookingStatus::Completed)
            .unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);
        assert_eq!(ledger.notifications()[0].kind, NotificationKind::Completed);

        let after = ledger.professional_stats("1");
        assert_eq!(after.total_earnings, before.total_earnings + booking.price);
        assert_eq!(after.completed_bookings, 1);
        assert_eq!(after.average_rating, 0.0);

        ledger.rate_booking(&booking.id, 4, "Great job").unwrap();
        assert_eq!(ledger.professional_stats("1").average_rating, 4.0);
    }

    #[test]
    fn test_rating_range_enforced() {
        let (ledger, _store) = ledger();
        let booking = ledger
            .create_booking(request("1", "1", "2025-01-10", "10:00"))
            .unwrap();

        for rating in [0u8, 6] {
            let err = ledger.rate_booking(&booking.id, rating, "").unwrap_err();
            assert_eq!(err.code(), ErrorCode::ValidationError);
        }

        // Status is not checked; a pending booking can be rated
        let rated = ledger.rate_booking(&booking.id, 5, "  ").unwrap();
        assert_eq!(rated.rating, Some(5));
        assert_eq!(rated.review, None);
    }

    #[test]
    fn test_queries_scope_by_party() {
        let (ledger, _store) = ledger();
        ledger
            .create_booking(request("1", "1", "2025-02-01", "10:00"))
            .unwrap();
        ledger
            .create_booking(request("2", "1", "2025-01-15", "14:00"))
            .unwrap();
        let cancelled = ledger
            .create_booking(request("1", "1", "2025-01-01", "08:00"))
            .unwrap();
        ledger.cancel_booking(&cancelled.id).unwrap();
        ledger
            .create_booking(NewBooking {
                customer_id: "2".into(),
                ..request("3", "2", "2025-01-12", "09:00")
            })
            .unwrap();

        assert_eq!(ledger.for_customer("1").len(), 3);
        assert_eq!(ledger.for_customer("2").len(), 1);
        assert_eq!(ledger.for_professional("1").len(), 3);

        let upcoming: Vec<String> = ledger
            .upcoming_for_professional("1")
            .into_iter()
            .map(|b| b.date)
            .collect();
        assert_eq!(upcoming, vec!["2025-01-15", "2025-02-01"]);

        let stats = ledger.customer_stats("1");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.cancelled, 1);
    }

    #[test]
    fn test_mark_notification_read() {
        let (ledger, _store) = ledger();
        ledger
            .create_booking(request("1", "1", "2025-01-10", "10:00"))
            .unwrap();
        assert_eq!(ledger.unread_count(), 1);

        let id = ledger.notifications()[0].id.clone();
        ledger.mark_notification_read(&id).unwrap();
        assert_eq!(ledger.unread_count(), 0);
        assert_eq!(
            ledger.mark_notification_read("missing").unwrap_err().code(),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn test_restore_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let first = ledger_with(store.clone(), LedgerConfig::default());
        let booking = first
            .create_booking(request("1", "1", "2025-01-10", "10:00"))
            .unwrap();
        first.rate_booking(&booking.id, 5, "Spotless").unwrap();

        let second = ledger_with(store, LedgerConfig::default());
        assert_eq!(second.restore(), 1);
        assert_eq!(second.bookings(), first.bookings());
        assert_eq!(second.notifications(), first.notifications());
    }

    #[test]
    fn test_corrupt_storage_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(BOOKINGS_KEY, "{\"not\": \"an array\"}").unwrap();
        store.set(NOTIFICATIONS_KEY, "[{\"id\":").unwrap();

        let ledger = ledger_with(store.clone(), LedgerConfig::default());
        assert_eq!(ledger.restore(), 0);
        assert!(ledger.notifications().is_empty());
        assert!(store.get(BOOKINGS_KEY).unwrap().is_none());
        assert!(store.get(NOTIFICATIONS_KEY).unwrap().is_none());
    }
}
