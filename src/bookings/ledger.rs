use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use super::{
    conflict,
    range::DateRange,
    repo::{Booking, NewBooking},
};
use crate::error::{sqlstate, EXCLUSION_VIOLATION};

/// The part of a spot booking admission needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotRef {
    pub id: i64,
    pub owner_id: Uuid,
}

#[derive(Debug, Error)]
pub enum InsertError {
    /// The store refused the row because it overlaps another booking of the spot.
    #[error("booking overlaps an existing booking")]
    Overlap,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Transactional access to bookings.
#[async_trait]
pub trait BookingLedger: Send + Sync {
    async fn begin(&self) -> anyhow::Result<Box<dyn LedgerTx>>;
}

/// One admission's unit of work. Dropping it without `commit` rolls back.
#[async_trait]
pub trait LedgerTx: Send {
    /// Looks the spot up and holds it for the rest of the transaction, so
    /// admissions for the same spot run one after another.
    async fn lock_spot(&mut self, spot_id: i64) -> anyhow::Result<Option<SpotRef>>;

    async fn find_conflict(
        &mut self,
        spot_id: i64,
        range: DateRange,
    ) -> anyhow::Result<Option<Booking>>;

    async fn insert(&mut self, booking: &NewBooking) -> Result<Booking, InsertError>;

    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgLedger {
    db: PgPool,
}

impl PgLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookingLedger for PgLedger {
    async fn begin(&self) -> anyhow::Result<Box<dyn LedgerTx>> {
        let tx = self.db.begin().await.context("begin tx")?;
        Ok(Box::new(PgLedgerTx { tx }))
    }
}

struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_spot(&mut self, spot_id: i64) -> anyhow::Result<Option<SpotRef>> {
        let row = sqlx::query_as::<_, (i64, Uuid)>(
            r#"SELECT id, owner_id FROM spots WHERE id = $1 FOR UPDATE"#,
        )
        .bind(spot_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("lock spot")?;
        Ok(row.map(|(id, owner_id)| SpotRef { id, owner_id }))
    }

    async fn find_conflict(
        &mut self,
        spot_id: i64,
        range: DateRange,
    ) -> anyhow::Result<Option<Booking>> {
        conflict::find_conflict(&mut *self.tx, spot_id, range).await
    }

    async fn insert(&mut self, booking: &NewBooking) -> Result<Booking, InsertError> {
        let res = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (spot_id, user_id, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, spot_id, user_id, start_date, end_date, created_at, updated_at
            "#,
        )
        .bind(booking.spot_id)
        .bind(booking.user_id)
        .bind(booking.range.start)
        .bind(booking.range.end)
        .fetch_one(&mut *self.tx)
        .await;

        match res {
            Ok(row) => Ok(row),
            Err(e) if sqlstate(&e).as_deref() == Some(EXCLUSION_VIOLATION) => {
                Err(InsertError::Overlap)
            }
            Err(e) => Err(InsertError::Other(anyhow::Error::new(e).context("insert booking"))),
        }
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let PgLedgerTx { tx } = *self;
        tx.commit().await.context("commit tx")
    }
}
