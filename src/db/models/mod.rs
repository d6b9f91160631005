//! Domain models split into per-entity modules.

pub mod booking;
pub mod notification;
pub mod service;
pub mod user;

pub use booking::*;
pub use notification::*;
pub use service::*;
pub use user::*;
