//! Date-range bookings of spots and the admission rules that keep them from
//! overlapping.

pub mod admission;
pub mod conflict;
pub mod dto;
pub mod handlers;
pub mod ledger;
#[cfg(test)]
pub mod memory;
pub mod range;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::booking_routes()
}
