//! Booking models.

use serde::{Deserialize, Serialize};

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Whether the booking still needs work (shown in "upcoming" views)
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::InProgress)
    }

    /// Intended lifecycle. Writing the current status again is always allowed.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            Self::Pending => matches!(next, Self::Confirmed | Self::Cancelled),
            Self::Confirmed => {
                matches!(next, Self::InProgress | Self::Completed | Self::Cancelled)
            }
            Self::InProgress => matches!(next, Self::Completed | Self::Cancelled),
            Self::Completed | Self::Cancelled => false,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "in-progress" | "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown booking status: {}", s)),
        }
    }
}

/// A scheduled engagement between a customer and a professional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    #[serde(rename = "userId", alias = "customerId")]
    pub customer_id: String,
    pub service_id: String,
    pub professional_id: String,
    /// Scheduled day, `YYYY-MM-DD`
    pub date: String,
    /// Scheduled time, `HH:MM`
    pub time: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
    pub status: BookingStatus,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    /// Price captured when the booking was made
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
}

/// Request to create a booking
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBooking {
    pub customer_id: String,
    pub service_id: String,
    pub professional_id: String,
    pub date: String,
    pub time: String,
    pub address: String,
    pub notes: String,
}
