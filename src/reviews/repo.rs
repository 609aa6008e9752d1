use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{sqlstate, UNIQUE_VIOLATION};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub user_id: Uuid,
    pub spot_id: i64,
    pub review: String,
    pub stars: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReviewWithAuthor {
    #[sqlx(flatten)]
    pub review: Review,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewImage {
    pub id: i64,
    #[serde(skip)]
    pub review_id: i64,
    pub url: String,
}

const REVIEW_COLUMNS: &str = "id, user_id, spot_id, review, stars, created_at, updated_at";

/// Inserts the review, or returns `None` when the user already reviewed the spot.
pub async fn insert_review(
    db: &PgPool,
    spot_id: i64,
    user_id: Uuid,
    review: &str,
    stars: i32,
) -> anyhow::Result<Option<Review>> {
    let res = sqlx::query_as::<_, Review>(&format!(
        r#"
        INSERT INTO reviews (spot_id, user_id, review, stars)
        VALUES ($1, $2, $3, $4)
        RETURNING {REVIEW_COLUMNS}
        "#
    ))
    .bind(spot_id)
    .bind(user_id)
    .bind(review)
    .bind(stars)
    .fetch_one(db)
    .await;

    match res {
        Ok(row) => Ok(Some(row)),
        Err(e) if sqlstate(&e).as_deref() == Some(UNIQUE_VIOLATION) => Ok(None),
        Err(e) => Err(anyhow::Error::new(e).context("insert review")),
    }
}

pub async fn list_by_spot(db: &PgPool, spot_id: i64) -> anyhow::Result<Vec<ReviewWithAuthor>> {
    let rows = sqlx::query_as::<_, ReviewWithAuthor>(
        r#"
        SELECT r.id, r.user_id, r.spot_id, r.review, r.stars, r.created_at, r.updated_at,
               u.first_name, u.last_name
          FROM reviews r
          JOIN users u ON u.id = r.user_id
         WHERE r.spot_id = $1
         ORDER BY r.created_at DESC
        "#,
    )
    .bind(spot_id)
    .fetch_all(db)
    .await
    .context("list reviews by spot")?;
    Ok(rows)
}

pub async fn images_for(db: &PgPool, review_ids: &[i64]) -> anyhow::Result<Vec<ReviewImage>> {
    let rows = sqlx::query_as::<_, ReviewImage>(
        r#"
        SELECT id, review_id, url
          FROM review_images
         WHERE review_id = ANY($1)
         ORDER BY id ASC
        "#,
    )
    .bind(review_ids)
    .fetch_all(db)
    .await
    .context("load review images")?;
    Ok(rows)
}
