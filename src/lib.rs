pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod session;
pub mod storage;

use serde::Serialize;
use std::sync::Arc;

use config::Config;
use db::{
    Booking, BookingStatus, Catalog, CustomerRepository, Fixtures, Identity, NewBooking, Role,
    SignupRequest, StoredCustomerRepository,
};
use error::{Error, Result};
use ledger::{BookingLedger, CustomerStats, ProfessionalStats};
use session::SessionManager;
use storage::KeyValueStore;

/// Booking details supplied by the logged-in customer
#[derive(Debug, Clone, Default)]
pub struct BookingForm {
    pub service_id: String,
    pub professional_id: String,
    pub date: String,
    pub time: String,
    pub address: String,
    pub notes: String,
}

/// Platform-wide figures for administrators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminOverview {
    pub total_bookings: usize,
    pub open_bookings: usize,
    pub customers: usize,
    pub professionals: usize,
    pub services: usize,
    /// Sum of prices over completed bookings
    pub revenue: f64,
}

/// Dashboard figures for the current role
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Customer(CustomerStats),
    Professional(ProfessionalStats),
    Admin(AdminOverview),
}

/// The session and booking core wired to one storage profile.
pub struct Marketplace {
    pub config: Config,
    pub catalog: Arc<Catalog>,
    pub customers: Arc<StoredCustomerRepository>,
    pub session: SessionManager,
    pub ledger: BookingLedger,
}

impl Marketplace {
    /// Open the storage profile and fixtures named by `config` and restore state.
    pub fn open(config: Config) -> anyhow::Result<Self> {
        let store = storage::open(&config.storage)?;
        let fixtures = Fixtures::load(&config.fixtures)?;
        Ok(Self::with_store(config, fixtures, store))
    }

    pub fn with_store(config: Config, fixtures: Fixtures, store: Arc<dyn KeyValueStore>) -> Self {
        let catalog = Arc::new(Catalog::new(fixtures.services, fixtures.professionals));
        let customers = Arc::new(StoredCustomerRepository::new(
            fixtures.customers,
            store.clone(),
        ));

        let session = SessionManager::new(
            config.auth.clone(),
            store.clone(),
            customers.clone(),
            catalog.clone(),
            fixtures.admins,
        );
        let ledger = BookingLedger::new(config.ledger.clone(), store, catalog.clone());

        customers.restore();
        session.restore();
        ledger.restore();

        Self {
            config,
            catalog,
            customers,
            session,
            ledger,
        }
    }

    pub async fn login(&self, email: &str, secret: &str, role: Role) -> Result<Identity> {
        self.session.login(email, secret, role).await
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<Identity> {
        self.session.signup(request).await
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    /// Replace the current profile. A professional's changes (services, custom
    /// prices) are mirrored into the catalog so new bookings see them.
    pub fn update_profile(&self, identity: Identity) -> Result<()> {
        self.session.update_profile(identity.clone())?;
        if let Identity::Professional(professional) = identity {
            self.catalog.upsert_professional(professional);
        }
        Ok(())
    }

    /// Book a service as the logged-in customer
    pub fn book(&self, form: BookingForm) -> Result<Booking> {
        let customer = self.session.require_role(&[Role::Customer])?;
        self.ledger.create_booking(NewBooking {
            customer_id: customer.id().to_string(),
            service_id: form.service_id,
            professional_id: form.professional_id,
            date: form.date,
            time: form.time,
            address: form.address,
            notes: form.notes,
        })
    }

    /// Bookings visible to the current identity: a customer's own, a
    /// professional's assigned ones, or everything for an admin.
    pub fn my_bookings(&self) -> Result<Vec<Booking>> {
        let identity = self
            .session
            .require_role(&[Role::Customer, Role::Professional, Role::Admin])?;
        Ok(match &identity {
            Identity::Customer(c) => self.ledger.for_customer(&c.id),
            Identity::Professional(p) => self.ledger.for_professional(&p.id),
            Identity::Admin(_) => self.ledger.bookings(),
        })
    }

    pub fn upcoming(&self) -> Result<Vec<Booking>> {
        let professional = self.session.require_role(&[Role::Professional])?;
        Ok(self.ledger.upcoming_for_professional(professional.id()))
    }

    pub fn dashboard(&self) -> Result<Dashboard> {
        let identity = self
            .session
            .require_role(&[Role::Customer, Role::Professional, Role::Admin])?;
        Ok(match &identity {
            Identity::Customer(c) => Dashboard::Customer(self.ledger.customer_stats(&c.id)),
            Identity::Professional(p) => {
                Dashboard::Professional(self.ledger.professional_stats(&p.id))
            }
            Identity::Admin(_) => Dashboard::Admin(self.admin_overview()),
        })
    }

    /// Move a booking to `status` on behalf of its professional or an admin
    pub fn set_status(&self, booking_id: &str, status: BookingStatus) -> Result<Booking> {
        let identity = self
            .session
            .require_role(&[Role::Professional, Role::Admin])?;
        self.ensure_party(&identity, booking_id)?;
        self.ledger.update_booking_status(booking_id, status)
    }

    /// Cancel a booking the current identity takes part in
    pub fn cancel(&self, booking_id: &str) -> Result<Booking> {
        let identity = self
            .session
            .require_role(&[Role::Customer, Role::Professional, Role::Admin])?;
        self.ensure_party(&identity, booking_id)?;
        self.ledger.cancel_booking(booking_id)
    }

    /// Rate one of the current customer's bookings
    pub fn rate(&self, booking_id: &str, rating: u8, review: &str) -> Result<Booking> {
        let identity = self.session.require_role(&[Role::Customer])?;
        self.ensure_party(&identity, booking_id)?;
        self.ledger.rate_booking(booking_id, rating, review)
    }

    fn ensure_party(&self, identity: &Identity, booking_id: &str) -> Result<()> {
        let booking = self
            .ledger
            .booking(booking_id)
            .ok_or_else(|| Error::not_found(format!("Booking {} not found", booking_id)))?;
        let allowed = match identity {
            Identity::Customer(c) => booking.customer_id == c.id,
            Identity::Professional(p) => booking.professional_id == p.id,
            Identity::Admin(_) => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "Booking {} belongs to another account",
                booking_id
            )))
        }
    }

    fn admin_overview(&self) -> AdminOverview {
        let bookings = self.ledger.bookings();
        AdminOverview {
            total_bookings: bookings.len(),
            open_bookings: bookings.iter().filter(|b| b.status.is_open()).count(),
            customers: self.customers.len(),
            professionals: self.catalog.professionals().len(),
            services: self.catalog.services().len(),
            revenue: bookings
                .iter()
                .filter(|b| b.status == BookingStatus::Completed)
                .map(|b| b.price)
                .sum(),
        }
    }
}
