//! Session manager: who is logged in, and how they got there.
//!
//! Credentials are checked against the fixture directories with the demo's
//! shared per-role secrets. This is mock authentication, not a credential
//! store. The resulting identity is persisted under [`SESSION_KEY`] and restored
//! on the next start.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::db::{
    Admin, Catalog, Customer, CustomerRepository, Identity, Role, SignupRequest, DEFAULT_AVATAR,
};
use crate::error::{Error, Result};
use crate::storage::{self, KeyValueStore, SESSION_KEY};

/// Coarse session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    LoggedOut,
    /// A login or signup is in flight
    Pending,
    Authenticated(Role),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    identity: Option<Identity>,
    pending: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(Identity::role)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn status(&self) -> SessionStatus {
        if self.pending {
            return SessionStatus::Pending;
        }
        match &self.identity {
            Some(identity) => SessionStatus::Authenticated(identity.role()),
            None => SessionStatus::LoggedOut,
        }
    }
}

pub struct SessionManager {
    state: RwLock<SessionState>,
    store: Arc<dyn KeyValueStore>,
    customers: Arc<dyn CustomerRepository>,
    catalog: Arc<Catalog>,
    admins: Vec<Admin>,
    config: AuthConfig,
}

impl SessionManager {
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn KeyValueStore>,
        customers: Arc<dyn CustomerRepository>,
        catalog: Arc<Catalog>,
        admins: Vec<Admin>,
    ) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            store,
            customers,
            catalog,
            admins,
            config,
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.read().status()
    }

    pub fn current(&self) -> Option<Identity> {
        self.state.read().identity.clone()
    }

    /// Restore a previously persisted session.
    ///
    /// A blob that does not decode, names an unknown role, or carries an empty
    /// identity is removed and the session stays logged out.
    pub fn restore(&self) -> Option<Role> {
        let identity: Identity = storage::load_or_discard(self.store.as_ref(), SESSION_KEY)?;
        if identity.id().trim().is_empty() {
            warn!("Discarding persisted session with an empty identity");
            self.forget();
            return None;
        }

        let role = identity.role();
        info!(user_id = %identity.id(), role = %role, "Restored session");
        *self.state.write() = SessionState {
            identity: Some(identity),
            pending: false,
        };
        Some(role)
    }

    pub async fn login(&self, email: &str, secret: &str, role: Role) -> Result<Identity> {
        self.begin();
        self.simulate_latency().await;

        match self.authenticate(email, secret, role) {
            Some(identity) => {
                info!(user_id = %identity.id(), role = %role, "Login succeeded");
                self.complete(identity.clone());
                Ok(identity)
            }
            None => {
                warn!(email = %email, role = %role, "Login failed");
                self.fail();
                Err(Error::unauthorized("Invalid email or password"))
            }
        }
    }

    /// Create a customer account and log it in.
    pub async fn signup(&self, request: SignupRequest) -> Result<Identity> {
        self.begin();
        self.simulate_latency().await;

        if self.customers.find_by_email(&request.email).is_some() {
            warn!(email = %request.email, "Signup rejected: email already registered");
            self.fail();
            return Err(Error::conflict("An account with this email already exists"));
        }

        let customer = Customer {
            id: self.customers.next_id(),
            name: request.name,
            email: request.email,
            phone: request.phone,
            address: request.address,
            member_since: chrono::Utc::now().date_naive().to_string(),
            image: DEFAULT_AVATAR.to_string(),
        };

        let customer = match self.customers.add(customer) {
            Ok(customer) => customer,
            Err(e) => {
                self.fail();
                return Err(e);
            }
        };

        info!(user_id = %customer.id, "Signup succeeded");
        let identity = Identity::Customer(customer);
        self.complete(identity.clone());
        Ok(identity)
    }

    /// Replace the current identity's profile. Fields are taken as given.
    pub fn update_profile(&self, identity: Identity) -> Result<()> {
        {
            let mut state = self.state.write();
            let current_role = state
                .role()
                .ok_or_else(|| Error::unauthorized("Not logged in"))?;
            if identity.role() != current_role {
                return Err(Error::forbidden(format!(
                    "Cannot replace a {} profile with a {} profile",
                    current_role,
                    identity.role()
                )));
            }
            state.identity = Some(identity.clone());
        }

        debug!(user_id = %identity.id(), "Profile updated");
        self.persist(&identity);
        Ok(())
    }

    pub fn logout(&self) {
        if let Some(identity) = self.state.read().identity() {
            info!(user_id = %identity.id(), "Logged out");
        }
        *self.state.write() = SessionState::default();
        self.forget();
    }

    /// The current identity, if its role is one of `allowed`
    pub fn require_role(&self, allowed: &[Role]) -> Result<Identity> {
        let identity = self
            .current()
            .ok_or_else(|| Error::unauthorized("Login required"))?;
        if !allowed.contains(&identity.role()) {
            return Err(Error::forbidden(format!(
                "This action is not available to {} accounts",
                identity.role()
            )));
        }
        Ok(identity)
    }

    fn authenticate(&self, email: &str, secret: &str, role: Role) -> Option<Identity> {
        match role {
            Role::Customer => {
                let customer = self.customers.find_by_email(email)?;
                secrets_match(secret, &self.config.customer_secret)
                    .then_some(Identity::Customer(customer))
            }
            Role::Professional => {
                let domain = &self.config.professional_email_domain;
                let mut professional = self
                    .catalog
                    .professionals()
                    .into_iter()
                    .find(|p| p.derived_email(domain) == email)?;
                if !secrets_match(secret, &self.config.professional_secret) {
                    return None;
                }
                professional.email = Some(professional.derived_email(domain));
                Some(Identity::Professional(professional))
            }
            Role::Admin => self
                .admins
                .iter()
                .find(|a| a.email == email && secrets_match(secret, &a.password))
                .cloned()
                .map(Identity::Admin),
        }
    }

    async fn simulate_latency(&self) {
        if self.config.simulated_latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.simulated_latency_ms)).await;
        }
    }

    fn begin(&self) {
        self.state.write().pending = true;
    }

    /// Clear the pending flag; the previous identity, if any, is kept
    fn fail(&self) {
        self.state.write().pending = false;
    }

    fn complete(&self, identity: Identity) {
        self.persist(&identity);
        *self.state.write() = SessionState {
            identity: Some(identity),
            pending: false,
        };
    }

    fn persist(&self, identity: &Identity) {
        if let Err(e) = storage::save(self.store.as_ref(), SESSION_KEY, identity) {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn forget(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            warn!(error = %e, "Failed to remove persisted session");
        }
    }
}

fn secrets_match(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}
