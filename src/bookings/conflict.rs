use anyhow::Context;
use sqlx::{Executor, Postgres};

use super::{range::DateRange, repo::Booking};

/// Earliest booking of `spot_id` overlapping `range`, read through any executor
/// (pool, connection or open transaction). Read-only.
pub async fn find_conflict<'e, E>(
    executor: E,
    spot_id: i64,
    range: DateRange,
) -> anyhow::Result<Option<Booking>>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query_as::<_, Booking>(
        r#"
        SELECT id, spot_id, user_id, start_date, end_date, created_at, updated_at
          FROM bookings
         WHERE spot_id = $1
           AND start_date <= $3
           AND end_date >= $2
         ORDER BY start_date ASC
         LIMIT 1
        "#,
    )
    .bind(spot_id)
    .bind(range.start)
    .bind(range.end)
    .fetch_optional(executor)
    .await
    .context("find conflicting booking")?;
    Ok(row)
}

/// Same rule as [`find_conflict`] over bookings already in memory.
pub fn first_overlap<'a, I>(bookings: I, spot_id: i64, range: &DateRange) -> Option<&'a Booking>
where
    I: IntoIterator<Item = &'a Booking>,
{
    bookings
        .into_iter()
        .filter(|b| b.spot_id == spot_id && b.range().overlaps(range))
        .min_by_key(|b| b.start_date)
}
