//! Account and identity models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Avatar assigned to accounts created through signup
pub const DEFAULT_AVATAR: &str =
    "https://images.pexels.com/photos/220453/pexels-photo-220453.jpeg?auto=compress&cs=tinysrgb&w=150";

/// Account roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "user")]
    Customer,
    Professional,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Professional => write!(f, "professional"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "customer" | "user" => Ok(Self::Customer),
            "professional" | "pro" => Ok(Self::Professional),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub member_since: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Professional {
    pub id: String,
    pub name: String,
    /// Login address; fixtures leave it empty and it is derived from the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub specialty: String,
    #[serde(default)]
    pub service_ids: Vec<String>,
    #[serde(default)]
    pub hourly_rate: f64,
    /// Per-service price overrides keyed by service id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_pricing: BTreeMap<String, f64>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub availability: Vec<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image: String,
}

impl Professional {
    /// Login email derived from the display name: the name is lowercased and its
    /// first space becomes a dot, e.g. "Maria Garcia" -> "maria.garcia@<domain>".
    pub fn derived_email(&self, domain: &str) -> String {
        format!("{}@{}", self.name.to_lowercase().replacen(' ', ".", 1), domain)
    }

    pub fn offers(&self, service_id: &str) -> bool {
        self.service_ids.iter().any(|id| id == service_id)
    }

    pub fn custom_price(&self, service_id: &str) -> Option<f64> {
        self.custom_pricing.get(service_id).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image: String,
}

/// The authenticated principal.
///
/// Serialized adjacently tagged, which is exactly the persisted session layout:
/// `{ "userType": "customer", "user": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "userType", content = "user", rename_all = "lowercase")]
pub enum Identity {
    #[serde(alias = "user")]
    Customer(Customer),
    Professional(Professional),
    Admin(Admin),
}

impl Identity {
    pub fn role(&self) -> Role {
        match self {
            Identity::Customer(_) => Role::Customer,
            Identity::Professional(_) => Role::Professional,
            Identity::Admin(_) => Role::Admin,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Identity::Customer(c) => &c.id,
            Identity::Professional(p) => &p.id,
            Identity::Admin(a) => &a.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Identity::Customer(c) => &c.name,
            Identity::Professional(p) => &p.name,
            Identity::Admin(a) => &a.name,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Identity::Customer(c) => Some(&c.email),
            Identity::Professional(p) => p.email.as_deref(),
            Identity::Admin(a) => Some(&a.email),
        }
    }

    pub fn image(&self) -> &str {
        match self {
            Identity::Customer(c) => &c.image,
            Identity::Professional(p) => &p.image,
            Identity::Admin(a) => &a.image,
        }
    }
}

/// Request to create a customer account
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    /// Accepted for form parity; demo accounts share the customer secret
    pub password: String,
    pub phone: String,
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn professional(name: &str) -> Professional {
        Professional {
            id: "7".into(),
            name: name.into(),
            email: None,
            phone: None,
            specialty: "Cleaning".into(),
            service_ids: vec!["1".into()],
            hourly_rate: 30.0,
            custom_pricing: BTreeMap::new(),
            rating: 4.5,
            review_count: 10,
            experience: String::new(),
            availability: Vec::new(),
            bio: String::new(),
            image: String::new(),
        }
    }

    #[test]
    fn test_derived_email_replaces_first_space_only() {
        assert_eq!(
            professional("Maria Garcia").derived_email("homeservices.com"),
            "maria.garcia@homeservices.com"
        );
        assert_eq!(
            professional("Anna Maria Lopez").derived_email("homeservices.com"),
            "anna.maria lopez@homeservices.com"
        );
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("Professional".parse::<Role>().unwrap(), Role::Professional);
        assert!("guest".parse::<Role>().is_err());
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_identity_layout_is_adjacently_tagged() {
        let identity = Identity::Admin(Admin {
            id: "admin-1".into(),
            name: "Root".into(),
            email: "root@example.com".into(),
            password: "pw".into(),
            image: String::new(),
        });

        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(value["userType"], "admin");
        assert_eq!(value["user"]["email"], "root@example.com");
    }

    #[test]
    fn test_legacy_user_tag_reads_as_customer() {
        let raw = r#"{"userType":"user","user":{"id":"1","name":"John","email":"john@example.com"}}"#;
        let identity: Identity = serde_json::from_str(raw).unwrap();
        assert_eq!(identity.role(), Role::Customer);
        assert_eq!(identity.id(), "1");
        assert_eq!(identity.email(), Some("john@example.com"));
    }

    #[test]
    fn test_unknown_role_tag_is_rejected() {
        let raw = r#"{"userType":"guest","user":{"id":"1","name":"John","email":"j@x.com"}}"#;
        assert!(serde_json::from_str::<Identity>(raw).is_err());
    }
}
