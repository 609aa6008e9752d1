use axum::{extract::State, http::StatusCode, routing::get, Router};
use tracing::{info, instrument, warn};

use super::{
    dto::{assemble, ReviewBody, ReviewList},
    repo::{self, Review},
};
use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, ApiResult, FieldErrors},
    extract::{Json, Path},
    spots::handlers::find_spot,
    state::AppState,
};

pub fn review_routes() -> Router<AppState> {
    Router::new().route(
        "/spots/:spot_id/reviews",
        get(list_reviews).post(create_review),
    )
}

#[instrument(skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(spot_id): Path<i64>,
) -> ApiResult<Json<ReviewList>> {
    find_spot(&state.db, spot_id).await?;
    let rows = repo::list_by_spot(&state.db, spot_id).await?;
    let ids: Vec<i64> = rows.iter().map(|r| r.review.id).collect();
    let images = if ids.is_empty() {
        Vec::new()
    } else {
        repo::images_for(&state.db, &ids).await?
    };
    Ok(Json(ReviewList {
        reviews: assemble(rows, images),
    }))
}

#[instrument(skip(state, body))]
pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(spot_id): Path<i64>,
    Json(body): Json<ReviewBody>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let input = body.validate().map_err(|errors| ApiError::Validation {
        message: "Bad request.".into(),
        errors,
    })?;
    find_spot(&state.db, spot_id).await?;

    let Some(review) =
        repo::insert_review(&state.db, spot_id, user_id, &input.review, input.stars).await?
    else {
        warn!(spot_id, %user_id, "duplicate review");
        return Err(ApiError::Conflict {
            message: "User already has a review for this spot".into(),
            errors: FieldErrors::new(),
        });
    };

    info!(review_id = review.id, spot_id, "review created");
    Ok((StatusCode::CREATED, Json(review)))
}
