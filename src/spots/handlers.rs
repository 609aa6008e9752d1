use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{Deleted, ImageBody, SpotBody, SpotDetails, SpotList, SpotQuery},
    repo::{self, Spot, SpotImage},
    services::{load_summaries, rating_of},
};
use crate::{
    auth::{jwt::AuthUser, repo::User},
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    state::AppState,
};

pub fn spot_routes() -> Router<AppState> {
    Router::new()
        .route("/spots", get(list_spots).post(create_spot))
        .route("/spots/current", get(list_my_spots))
        .route(
            "/spots/:spot_id",
            get(get_spot).put(update_spot).delete(delete_spot),
        )
        .route("/spots/:spot_id/images", post(add_image))
}

pub(crate) async fn find_spot(db: &PgPool, spot_id: i64) -> ApiResult<Spot> {
    repo::get_spot(db, spot_id)
        .await?
        .ok_or_else(ApiError::spot_not_found)
}

/// The spot, if it exists and `user_id` owns it.
pub(crate) async fn find_owned_spot(db: &PgPool, spot_id: i64, user_id: Uuid) -> ApiResult<Spot> {
    let spot = find_spot(db, spot_id).await?;
    if spot.owner_id != user_id {
        warn!(spot_id, %user_id, "caller does not own spot");
        return Err(ApiError::Forbidden("Forbidden"));
    }
    Ok(spot)
}

#[instrument(skip(state))]
pub async fn list_spots(
    State(state): State<AppState>,
    Query(q): Query<SpotQuery>,
) -> ApiResult<Json<SpotList>> {
    let filter = q.validate().map_err(ApiError::validation)?;
    let spots = repo::list_spots(&state.db, &filter).await?;
    let spots = load_summaries(&state.db, spots).await?;
    Ok(Json(SpotList {
        spots,
        page: Some(filter.page),
        size: Some(filter.size),
    }))
}

#[instrument(skip(state))]
pub async fn list_my_spots(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<SpotList>> {
    let spots = repo::list_by_owner(&state.db, user_id).await?;
    let spots = load_summaries(&state.db, spots).await?;
    Ok(Json(SpotList {
        spots,
        page: None,
        size: None,
    }))
}

#[instrument(skip(state))]
pub async fn get_spot(
    State(state): State<AppState>,
    Path(spot_id): Path<i64>,
) -> ApiResult<Json<SpotDetails>> {
    let spot = find_spot(&state.db, spot_id).await?;
    let owner = User::find_by_id(&state.db, spot.owner_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("owner {} of spot {} is missing", spot.owner_id, spot.id))?;
    let stars = repo::stars_for(&state.db, &[spot.id]).await?;
    let images = repo::images_for(&state.db, &[spot.id]).await?;
    let (num_reviews, avg_star_rating) = rating_of(&stars);

    Ok(Json(SpotDetails {
        spot,
        num_reviews,
        avg_star_rating,
        images,
        owner: owner.name(),
    }))
}

#[instrument(skip(state, body))]
pub async fn create_spot(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SpotBody>,
) -> ApiResult<(StatusCode, Json<Spot>)> {
    let input = body.validate().map_err(ApiError::validation)?;
    let spot = repo::insert_spot(&state.db, user_id, &input).await?;
    info!(spot_id = spot.id, %user_id, "spot created");
    Ok((StatusCode::CREATED, Json(spot)))
}

#[instrument(skip(state, body))]
pub async fn update_spot(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(spot_id): Path<i64>,
    Json(body): Json<SpotBody>,
) -> ApiResult<Json<Spot>> {
    find_owned_spot(&state.db, spot_id, user_id).await?;
    let input = body.validate().map_err(ApiError::validation)?;
    let spot = repo::update_spot(&state.db, spot_id, &input).await?;
    info!(spot_id, "spot updated");
    Ok(Json(spot))
}

#[instrument(skip(state))]
pub async fn delete_spot(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(spot_id): Path<i64>,
) -> ApiResult<Json<Deleted>> {
    find_owned_spot(&state.db, spot_id, user_id).await?;
    if !repo::delete_spot(&state.db, spot_id).await? {
        return Err(ApiError::spot_not_found());
    }
    info!(spot_id, "spot deleted");
    Ok(Json(Deleted {
        message: "Successfully deleted",
        status_code: 200,
    }))
}

#[instrument(skip(state, body))]
pub async fn add_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(spot_id): Path<i64>,
    Json(body): Json<ImageBody>,
) -> ApiResult<Json<SpotImage>> {
    let url = body.url.trim();
    if url.is_empty() {
        return Err(ApiError::invalid_field("url", "Image url is required"));
    }
    let spot = find_owned_spot(&state.db, spot_id, user_id).await?;
    let image = repo::insert_image(&state.db, spot.id, url, body.preview).await?;
    info!(spot_id, image_id = image.id, "spot image added");
    Ok(Json(image))
}
