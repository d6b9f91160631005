//! Service and professional catalog.

use parking_lot::RwLock;

use super::models::{Professional, Service};

/// Category name that matches every service
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug)]
pub struct Catalog {
    services: Vec<Service>,
    professionals: RwLock<Vec<Professional>>,
}

impl Catalog {
    pub fn new(services: Vec<Service>, professionals: Vec<Professional>) -> Self {
        Self {
            services,
            professionals: RwLock::new(professionals),
        }
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn professionals(&self) -> Vec<Professional> {
        self.professionals.read().clone()
    }

    pub fn professional(&self, id: &str) -> Option<Professional> {
        self.professionals.read().iter().find(|p| p.id == id).cloned()
    }

    /// Distinct categories in catalog order
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for service in &self.services {
            if !categories.contains(&service.category.as_str()) {
                categories.push(&service.category);
            }
        }
        categories
    }

    /// Services whose name or description contains `term` and whose category
    /// matches. An empty term, or a category of `None`/"All", matches everything.
    pub fn search_services(&self, term: &str, category: Option<&str>) -> Vec<&Service> {
        let term = term.trim();
        let category = category.filter(|c| !c.is_empty() && *c != ALL_CATEGORIES);
        self.services
            .iter()
            .filter(|s| term.is_empty() || s.matches_term(term))
            .filter(|s| category.map_or(true, |c| s.category == c))
            .collect()
    }

    pub fn professionals_for_service(&self, service_id: &str) -> Vec<Professional> {
        self.professionals
            .read()
            .iter()
            .filter(|p| p.offers(service_id))
            .cloned()
            .collect()
    }

    /// Price a professional charges for a service: their custom price when set,
    /// otherwise the service base price. `None` when the service is unknown.
    pub fn quote(&self, service_id: &str, professional_id: &str) -> Option<f64> {
        let service = self.service(service_id)?;
        let custom = self
            .professionals
            .read()
            .iter()
            .find(|p| p.id == professional_id)
            .and_then(|p| p.custom_price(service_id));
        Some(custom.unwrap_or(service.price))
    }

    /// Replace a professional's catalog entry, or add it when new
    pub fn upsert_professional(&self, professional: Professional) {
        let mut professionals = self.professionals.write();
        match professionals.iter_mut().find(|p| p.id == professional.id) {
            Some(existing) => *existing = professional,
            None => professionals.push(professional),
        }
    }
}
