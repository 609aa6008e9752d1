//! In-memory [`BookingLedger`] for tests. One transaction at a time holds the
//! whole book, which stands in for the spot row lock.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    conflict::first_overlap,
    ledger::{BookingLedger, InsertError, LedgerTx, SpotRef},
    range::DateRange,
    repo::{Booking, NewBooking},
};

#[derive(Default)]
struct Book {
    spots: HashMap<i64, Uuid>,
    bookings: Vec<Booking>,
    next_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryLedger {
    book: Arc<Mutex<Book>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_spot(&self, spot_id: i64, owner_id: Uuid) {
        self.book.lock().await.spots.insert(spot_id, owner_id);
    }

    pub async fn add_booking(&self, spot_id: i64, user_id: Uuid, range: DateRange) -> Booking {
        let mut book = self.book.lock().await;
        let booking = book.make(&NewBooking { spot_id, user_id, range });
        book.bookings.push(booking.clone());
        booking
    }

    pub async fn bookings(&self, spot_id: i64) -> Vec<Booking> {
        let book = self.book.lock().await;
        book.bookings
            .iter()
            .filter(|b| b.spot_id == spot_id)
            .cloned()
            .collect()
    }
}

impl Book {
    fn make(&mut self, new: &NewBooking) -> Booking {
        self.next_id += 1;
        let now = OffsetDateTime::now_utc();
        Booking {
            id: self.next_id,
            spot_id: new.spot_id,
            user_id: new.user_id,
            start_date: new.range.start,
            end_date: new.range.end,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl BookingLedger for MemoryLedger {
    async fn begin(&self) -> anyhow::Result<Box<dyn LedgerTx>> {
        let guard = self.book.clone().lock_owned().await;
        Ok(Box::new(MemoryTx {
            guard,
            pending: Vec::new(),
        }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Book>,
    pending: Vec<Booking>,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_spot(&mut self, spot_id: i64) -> anyhow::Result<Option<SpotRef>> {
        Ok(self
            .guard
            .spots
            .get(&spot_id)
            .map(|owner_id| SpotRef { id: spot_id, owner_id: *owner_id }))
    }

    async fn find_conflict(
        &mut self,
        spot_id: i64,
        range: DateRange,
    ) -> anyhow::Result<Option<Booking>> {
        let all = self.guard.bookings.iter().chain(self.pending.iter());
        Ok(first_overlap(all, spot_id, &range).cloned())
    }

    async fn insert(&mut self, booking: &NewBooking) -> Result<Booking, InsertError> {
        let all = self.guard.bookings.iter().chain(self.pending.iter());
        if first_overlap(all, booking.spot_id, &booking.range).is_some() {
            return Err(InsertError::Overlap);
        }
        let row = self.guard.make(booking);
        self.pending.push(row.clone());
        Ok(row)
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryTx { mut guard, pending } = *self;
        guard.bookings.extend(pending);
        Ok(())
    }
}
