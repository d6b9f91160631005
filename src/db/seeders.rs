//! Seed fixtures for the catalog and account directories.
//!
//! The demo ships with embedded JSON fixtures; a fixture directory with the same
//! four files can replace them at startup.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

use super::models::{Admin, Customer, Professional, Service};
use crate::config::FixturesConfig;

const SERVICES_JSON: &str = include_str!("../../fixtures/services.json");
const PROFESSIONALS_JSON: &str = include_str!("../../fixtures/professionals.json");
const USERS_JSON: &str = include_str!("../../fixtures/users.json");
const ADMINS_JSON: &str = include_str!("../../fixtures/admins.json");

/// Read-only seed data, loaded once at startup
#[derive(Debug, Clone)]
pub struct Fixtures {
    pub services: Vec<Service>,
    pub professionals: Vec<Professional>,
    pub customers: Vec<Customer>,
    pub admins: Vec<Admin>,
}

impl Fixtures {
    /// Fixtures compiled into the binary
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            services: parse("services.json", SERVICES_JSON)?,
            professionals: parse("professionals.json", PROFESSIONALS_JSON)?,
            customers: parse("users.json", USERS_JSON)?,
            admins: parse("admins.json", ADMINS_JSON)?,
        })
    }

    pub fn from_dir(dir: &Path) -> Result<Self> {
        info!("Loading fixtures from {}", dir.display());
        Ok(Self {
            services: read(dir, "services.json")?,
            professionals: read(dir, "professionals.json")?,
            customers: read(dir, "users.json")?,
            admins: read(dir, "admins.json")?,
        })
    }

    pub fn load(config: &FixturesConfig) -> Result<Self> {
        let fixtures = match &config.dir {
            Some(dir) => Self::from_dir(dir)?,
            None => Self::embedded()?,
        };
        info!(
            services = fixtures.services.len(),
            professionals = fixtures.professionals.len(),
            customers = fixtures.customers.len(),
            admins = fixtures.admins.len(),
            "Fixtures loaded"
        );
        Ok(fixtures)
    }
}

fn parse<T: DeserializeOwned>(name: &str, content: &str) -> Result<Vec<T>> {
    serde_json::from_str(content).with_context(|| format!("Failed to parse fixture {}", name))
}

fn read<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    let path = dir.join(name);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;
    parse(name, &content)
}
