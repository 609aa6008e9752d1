use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::range::{iso_date, DateRange};

/// Booking record in the database.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub spot_id: i64,
    pub user_id: Uuid,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Booking {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

/// Booking about to be inserted.
#[derive(Debug, Clone, Copy)]
pub struct NewBooking {
    pub spot_id: i64,
    pub user_id: Uuid,
    pub range: DateRange,
}

/// Booking joined with the guest's public name, as shown to the spot owner.
#[derive(Debug, Clone, FromRow)]
pub struct BookingWithGuest {
    #[sqlx(flatten)]
    pub booking: Booking,
    pub first_name: String,
    pub last_name: String,
}

pub async fn list_by_spot(db: &PgPool, spot_id: i64) -> anyhow::Result<Vec<Booking>> {
    let rows = sqlx::query_as::<_, Booking>(
        r#"
        SELECT id, spot_id, user_id, start_date, end_date, created_at, updated_at
          FROM bookings
         WHERE spot_id = $1
         ORDER BY start_date ASC
        "#,
    )
    .bind(spot_id)
    .fetch_all(db)
    .await
    .context("list bookings by spot")?;
    Ok(rows)
}

pub async fn list_by_spot_with_guests(
    db: &PgPool,
    spot_id: i64,
) -> anyhow::Result<Vec<BookingWithGuest>> {
    let rows = sqlx::query_as::<_, BookingWithGuest>(
        r#"
        SELECT b.id, b.spot_id, b.user_id, b.start_date, b.end_date,
               b.created_at, b.updated_at, u.first_name, u.last_name
          FROM bookings b
          JOIN users u ON u.id = b.user_id
         WHERE b.spot_id = $1
         ORDER BY b.start_date ASC
        "#,
    )
    .bind(spot_id)
    .fetch_all(db)
    .await
    .context("list bookings with guests")?;
    Ok(rows)
}
