use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{SpotFilter, SpotInput};

/// Spot record in the database.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub id: i64,
    pub owner_id: Uuid,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SpotImage {
    pub id: i64,
    #[serde(skip)]
    pub spot_id: i64,
    pub url: String,
    pub preview: bool,
}

/// One review's stars, enough to compute averages.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct StarRow {
    pub spot_id: i64,
    pub stars: i32,
}

const SPOT_COLUMNS: &str = "id, owner_id, address, city, state, country, lat, lng, name, \
                            description, price, created_at, updated_at";

pub async fn get_spot(db: &PgPool, spot_id: i64) -> anyhow::Result<Option<Spot>> {
    let row = sqlx::query_as::<_, Spot>(&format!("SELECT {SPOT_COLUMNS} FROM spots WHERE id = $1"))
        .bind(spot_id)
        .fetch_optional(db)
        .await
        .context("get spot")?;
    Ok(row)
}

pub async fn list_spots(db: &PgPool, filter: &SpotFilter) -> anyhow::Result<Vec<Spot>> {
    let mut qb = QueryBuilder::new(format!("SELECT {SPOT_COLUMNS} FROM spots WHERE TRUE"));
    if let Some(v) = filter.min_lat {
        qb.push(" AND lat >= ").push_bind(v);
    }
    if let Some(v) = filter.max_lat {
        qb.push(" AND lat <= ").push_bind(v);
    }
    if let Some(v) = filter.min_lng {
        qb.push(" AND lng >= ").push_bind(v);
    }
    if let Some(v) = filter.max_lng {
        qb.push(" AND lng <= ").push_bind(v);
    }
    if let Some(v) = filter.min_price {
        qb.push(" AND price >= ").push_bind(v);
    }
    if let Some(v) = filter.max_price {
        qb.push(" AND price <= ").push_bind(v);
    }
    qb.push(" ORDER BY id ASC LIMIT ")
        .push_bind(filter.size)
        .push(" OFFSET ")
        .push_bind(filter.offset());

    let rows = qb
        .build_query_as::<Spot>()
        .fetch_all(db)
        .await
        .context("list spots")?;
    Ok(rows)
}

pub async fn list_by_owner(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Spot>> {
    let rows = sqlx::query_as::<_, Spot>(&format!(
        "SELECT {SPOT_COLUMNS} FROM spots WHERE owner_id = $1 ORDER BY id ASC"
    ))
    .bind(owner_id)
    .fetch_all(db)
    .await
    .context("list spots by owner")?;
    Ok(rows)
}

/// Stars of every review of the given spots, in one round trip.
pub async fn stars_for(db: &PgPool, spot_ids: &[i64]) -> anyhow::Result<Vec<StarRow>> {
    let rows = sqlx::query_as::<_, StarRow>(
        r#"SELECT spot_id, stars FROM reviews WHERE spot_id = ANY($1)"#,
    )
    .bind(spot_ids)
    .fetch_all(db)
    .await
    .context("load review stars")?;
    Ok(rows)
}

/// Images of the given spots, oldest first.
pub async fn images_for(db: &PgPool, spot_ids: &[i64]) -> anyhow::Result<Vec<SpotImage>> {
    let rows = sqlx::query_as::<_, SpotImage>(
        r#"
        SELECT id, spot_id, url, preview
          FROM spot_images
         WHERE spot_id = ANY($1)
         ORDER BY id ASC
        "#,
    )
    .bind(spot_ids)
    .fetch_all(db)
    .await
    .context("load spot images")?;
    Ok(rows)
}

pub async fn insert_spot(db: &PgPool, owner_id: Uuid, input: &SpotInput) -> anyhow::Result<Spot> {
    let row = sqlx::query_as::<_, Spot>(&format!(
        r#"
        INSERT INTO spots (owner_id, address, city, state, country, lat, lng, name, description, price)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {SPOT_COLUMNS}
        "#
    ))
    .bind(owner_id)
    .bind(&input.address)
    .bind(&input.city)
    .bind(&input.state)
    .bind(&input.country)
    .bind(input.lat)
    .bind(input.lng)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.price)
    .fetch_one(db)
    .await
    .context("insert spot")?;
    Ok(row)
}

pub async fn update_spot(db: &PgPool, spot_id: i64, input: &SpotInput) -> anyhow::Result<Spot> {
    let row = sqlx::query_as::<_, Spot>(&format!(
        r#"
        UPDATE spots
           SET address = $2, city = $3, state = $4, country = $5, lat = $6, lng = $7,
               name = $8, description = $9, price = $10, updated_at = now()
         WHERE id = $1
        RETURNING {SPOT_COLUMNS}
        "#
    ))
    .bind(spot_id)
    .bind(&input.address)
    .bind(&input.city)
    .bind(&input.state)
    .bind(&input.country)
    .bind(input.lat)
    .bind(input.lng)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.price)
    .fetch_one(db)
    .await
    .context("update spot")?;
    Ok(row)
}

pub async fn delete_spot(db: &PgPool, spot_id: i64) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM spots WHERE id = $1")
        .bind(spot_id)
        .execute(db)
        .await
        .context("delete spot")?;
    Ok(res.rows_affected() > 0)
}

pub async fn insert_image(
    db: &PgPool,
    spot_id: i64,
    url: &str,
    preview: bool,
) -> anyhow::Result<SpotImage> {
    let row = sqlx::query_as::<_, SpotImage>(
        r#"
        INSERT INTO spot_images (spot_id, url, preview)
        VALUES ($1, $2, $3)
        RETURNING id, spot_id, url, preview
        "#,
    )
    .bind(spot_id)
    .bind(url)
    .bind(preview)
    .fetch_one(db)
    .await
    .context("insert spot image")?;
    Ok(row)
}
