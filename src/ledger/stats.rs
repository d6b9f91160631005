//! Dashboard aggregates over booking lists.

use serde::Serialize;

use crate::db::{Booking, BookingStatus};

/// Figures shown on a professional's dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfessionalStats {
    pub total_bookings: usize,
    pub completed_bookings: usize,
    pub pending_bookings: usize,
    /// Sum of prices over completed bookings
    pub total_earnings: f64,
    /// Mean rating over rated bookings, 0 when nothing is rated
    pub average_rating: f64,
}

impl ProfessionalStats {
    pub fn from_bookings<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        let mut stats = Self::default();
        let mut rating_sum = 0u32;
        let mut rated = 0u32;

        for booking in bookings {
            stats.total_bookings += 1;
            match booking.status {
                BookingStatus::Completed => {
                    stats.completed_bookings += 1;
                    stats.total_earnings += booking.price;
                }
                BookingStatus::Pending => stats.pending_bookings += 1,
                _ => {}
            }
            if let Some(rating) = booking.rating {
                rating_sum += u32::from(rating);
                rated += 1;
            }
        }

        if rated > 0 {
            stats.average_rating = f64::from(rating_sum) / f64::from(rated);
        }
        stats
    }
}

/// Figures shown on a customer's dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub cancelled: usize,
}

impl CustomerStats {
    pub fn from_bookings<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        let mut stats = Self::default();
        for booking in bookings {
            stats.total += 1;
            match booking.status {
                BookingStatus::Completed => stats.completed += 1,
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::Cancelled => stats.cancelled += 1,
                BookingStatus::Confirmed | BookingStatus::InProgress => {}
            }
        }
        stats
    }
}
