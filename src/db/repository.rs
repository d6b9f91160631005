//! Customer account repository.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use super::models::Customer;
use crate::error::{Error, Result};
use crate::storage::{self, KeyValueStore, CUSTOMERS_KEY};

/// Storage for customer accounts, seeded from fixtures and grown by signup.
pub trait CustomerRepository: Send + Sync {
    fn find_by_email(&self, email: &str) -> Option<Customer>;

    fn find_by_id(&self, id: &str) -> Option<Customer>;

    /// Id for the next account: one past the current account count, bumped
    /// past any id already taken
    fn next_id(&self) -> String;

    /// Add an account. Fails with `Conflict` when the email or id is taken.
    fn add(&self, customer: Customer) -> Result<Customer>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixture accounts plus signups, with signups saved under [`CUSTOMERS_KEY`]
/// so they outlive the process.
pub struct StoredCustomerRepository {
    customers: RwLock<Vec<Customer>>,
    /// Number of leading entries that came from fixtures
    seeded: usize,
    store: Arc<dyn KeyValueStore>,
}

impl StoredCustomerRepository {
    pub fn new(seed: Vec<Customer>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            seeded: seed.len(),
            customers: RwLock::new(seed),
            store,
        }
    }

    /// Load persisted signups. Entries whose email or id clashes with an
    /// account already present are skipped. Returns the number loaded.
    pub fn restore(&self) -> usize {
        let signups: Vec<Customer> =
            storage::load_or_discard(self.store.as_ref(), CUSTOMERS_KEY).unwrap_or_default();

        let mut customers = self.customers.write();
        let mut loaded = 0;
        for customer in signups {
            if customers
                .iter()
                .any(|c| c.email == customer.email || c.id == customer.id)
            {
                warn!(user_id = %customer.id, "Skipping persisted account that clashes with an existing one");
                continue;
            }
            customers.push(customer);
            loaded += 1;
        }

        info!(customers = loaded, "Restored signed-up accounts");
        loaded
    }

    fn persist(&self, customers: &[Customer]) {
        let signups = &customers[self.seeded.min(customers.len())..];
        if let Err(e) = storage::save(self.store.as_ref(), CUSTOMERS_KEY, signups) {
            warn!(error = %e, "Failed to persist accounts");
        }
    }
}

impl CustomerRepository for StoredCustomerRepository {
    fn find_by_email(&self, email: &str) -> Option<Customer> {
        self.customers
            .read()
            .iter()
            .find(|c| c.email == email)
            .cloned()
    }

    fn find_by_id(&self, id: &str) -> Option<Customer> {
        self.customers.read().iter().find(|c| c.id == id).cloned()
    }

    fn next_id(&self) -> String {
        let mut candidate = self.len() + 1;
        while self.find_by_id(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        candidate.to_string()
    }

    fn add(&self, customer: Customer) -> Result<Customer> {
        let mut customers = self.customers.write();
        if customers.iter().any(|c| c.email == customer.email) {
            return Err(Error::conflict("An account with this email already exists"));
        }
        if customers.iter().any(|c| c.id == customer.id) {
            return Err(Error::conflict("An account with this id already exists"));
        }
        customers.push(customer.clone());
        self.persist(&customers);
        Ok(customer)
    }

    fn len(&self) -> usize {
        self.customers.read().len()
    }
}
