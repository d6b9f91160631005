mod catalog;
mod models;
mod repository;
mod seeders;

pub use catalog::{Catalog, ALL_CATEGORIES};
pub use models::*;
pub use repository::{CustomerRepository, StoredCustomerRepository};
pub use seeders::Fixtures;
