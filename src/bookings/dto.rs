use serde::Serialize;
use time::Date;

use super::{
    range::iso_date,
    repo::{Booking, BookingWithGuest},
};
use crate::auth::dto::UserName;

/// What a guest sees of someone else's booking.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestBookingView {
    pub spot_id: i64,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
}

impl From<Booking> for GuestBookingView {
    fn from(b: Booking) -> Self {
        Self {
            spot_id: b.spot_id,
            start_date: b.start_date,
            end_date: b.end_date,
        }
    }
}

/// What the spot owner sees: the whole booking and who made it.
#[derive(Debug, Serialize)]
pub struct OwnerBookingView {
    #[serde(rename = "User")]
    pub user: UserName,
    #[serde(flatten)]
    pub booking: Booking,
}

impl From<BookingWithGuest> for OwnerBookingView {
    fn from(row: BookingWithGuest) -> Self {
        Self {
            user: UserName {
                id: row.booking.user_id,
                first_name: row.first_name,
                last_name: row.last_name,
            },
            booking: row.booking,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BookingView {
    Owner(OwnerBookingView),
    Guest(GuestBookingView),
}

#[derive(Debug, Serialize)]
pub struct BookingList {
    #[serde(rename = "Bookings")]
    pub bookings: Vec<BookingView>,
}
