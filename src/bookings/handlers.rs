use axum::{extract::State, routing::get, Router};
use tracing::instrument;

use super::{
    admission::{admit, BookingRequest},
    dto::{BookingList, BookingView},
    range::RequestedDates,
    repo::{self, Booking},
};
use crate::{
    auth::jwt::AuthUser,
    error::ApiResult,
    extract::{Json, Path},
    spots::handlers::find_spot,
    state::AppState,
};

pub fn booking_routes() -> Router<AppState> {
    Router::new().route(
        "/spots/:spot_id/bookings",
        get(list_bookings).post(create_booking),
    )
}

#[instrument(skip(state, dates))]
pub async fn create_booking(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(spot_id): Path<i64>,
    Json(dates): Json<RequestedDates>,
) -> ApiResult<Json<Booking>> {
    let req = BookingRequest {
        spot_id,
        user_id,
        dates,
    };
    let booking = admit(state.ledger.as_ref(), req).await?;
    Ok(Json(booking))
}

#[instrument(skip(state))]
pub async fn list_bookings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(spot_id): Path<i64>,
) -> ApiResult<Json<BookingList>> {
    let spot = find_spot(&state.db, spot_id).await?;

    let bookings = if spot.owner_id == user_id {
        repo::list_by_spot_with_guests(&state.db, spot_id)
            .await?
            .into_iter()
            .map(|row| BookingView::Owner(row.into()))
            .collect()
    } else {
        repo::list_by_spot(&state.db, spot_id)
            .await?
            .into_iter()
            .map(|b| BookingView::Guest(b.into()))
            .collect()
    };

    Ok(Json(BookingList { bookings }))
}
