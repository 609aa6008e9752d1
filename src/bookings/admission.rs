use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    ledger::{BookingLedger, InsertError},
    range::{DateRange, RequestedDates},
    repo::{Booking, NewBooking},
};
use crate::error::{ApiError, FieldErrors};

pub const SPOT_NOT_FOUND: &str = "Spot couldn't be found";
pub const END_BEFORE_START: &str = "endDate cannot be on or before startDate";
pub const ALREADY_BOOKED: &str = "Sorry, this spot is already booked for the specified dates";
pub const START_CONFLICT: &str = "Start date conflicts with an existing booking";
pub const END_CONFLICT: &str = "End date conflicts with an existing booking";

/// A booking request as received from an authenticated user.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub spot_id: i64,
    pub user_id: Uuid,
    pub dates: RequestedDates,
}

/// Which requested boundaries fall on already-booked days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub start: bool,
    pub end: bool,
}

impl Collision {
    pub const BOTH: Collision = Collision { start: true, end: true };

    /// A request that swallows the existing stay whole collides on both ends.
    pub fn between(requested: &DateRange, existing: &DateRange) -> Self {
        let start = existing.contains(requested.start);
        let end = existing.contains(requested.end);
        if start || end {
            Collision { start, end }
        } else {
            Collision::BOTH
        }
    }

    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.start {
            errors.insert("startDate", START_CONFLICT.into());
        }
        if self.end {
            errors.insert("endDate", END_CONFLICT.into());
        }
        errors
    }
}

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Spot couldn't be found")]
    SpotNotFound,
    #[error("Validation error")]
    InvalidDates(FieldErrors),
    #[error("endDate cannot be on or before startDate")]
    InvalidRange,
    #[error("Sorry, this spot is already booked for the specified dates")]
    Conflict(Collision),
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl From<AdmissionError> for ApiError {
    fn from(e: AdmissionError) -> Self {
        match e {
            AdmissionError::SpotNotFound => ApiError::NotFound(SPOT_NOT_FOUND),
            AdmissionError::InvalidDates(errors) => ApiError::validation(errors),
            AdmissionError::InvalidRange => ApiError::invalid_field("endDate", END_BEFORE_START),
            AdmissionError::Conflict(collision) => ApiError::Conflict {
                message: ALREADY_BOOKED.into(),
                errors: collision.field_errors(),
            },
            AdmissionError::Infrastructure(e) => ApiError::Internal(e),
        }
    }
}

/// Admits a booking: spot must exist, dates must parse and be ordered, and no
/// booking of the spot may overlap. All gates and the insert share one ledger transaction.
#[instrument(skip(ledger), fields(spot_id = req.spot_id, user_id = %req.user_id))]
pub async fn admit(ledger: &dyn BookingLedger, req: BookingRequest) -> Result<Booking, AdmissionError> {
    let mut tx = ledger.begin().await?;

    let Some(spot) = tx.lock_spot(req.spot_id).await? else {
        warn!("spot not found");
        return Err(AdmissionError::SpotNotFound);
    };
    debug!(owner_id = %spot.owner_id, "spot {} locked", spot.id);

    let range = req.dates.parse().map_err(|errors| {
        warn!(?errors, "unparseable dates");
        AdmissionError::InvalidDates(errors)
    })?;
    if !range.is_valid_ordering() {
        warn!(start = %range.start, end = %range.end, "invalid date ordering");
        return Err(AdmissionError::InvalidRange);
    }

    if let Some(existing) = tx.find_conflict(req.spot_id, range).await? {
        warn!(existing_id = existing.id, "booking conflict");
        return Err(AdmissionError::Conflict(Collision::between(
            &range,
            &existing.range(),
        )));
    }

    let new = NewBooking {
        spot_id: req.spot_id,
        user_id: req.user_id,
        range,
    };
    let booking = match tx.insert(&new).await {
        Ok(b) => b,
        Err(InsertError::Overlap) => {
            warn!("booking refused by overlap constraint");
            return Err(AdmissionError::Conflict(Collision::BOTH));
        }
        Err(InsertError::Other(e)) => return Err(e.into()),
    };
    tx.commit().await?;

    info!(booking_id = booking.id, "booking admitted");
    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::{
        ledger::{LedgerTx, SpotRef},
        memory::MemoryLedger,
    };
    use async_trait::async_trait;
    use time::{macros::date, Date};

    const SPOT: i64 = 5;

    fn range(start: Date, end: Date) -> DateRange {
        DateRange::new(start, end)
    }

    fn request(spot_id: i64, start: Date, end: Date) -> BookingRequest {
        BookingRequest {
            spot_id,
            user_id: Uuid::new_v4(),
            dates: RequestedDates::from_range(range(start, end)),
        }
    }

    async fn ledger_with_march_booking() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger.add_spot(SPOT, Uuid::new_v4()).await;
        ledger
            .add_booking(SPOT, Uuid::new_v4(), range(date!(2024 - 03 - 01), date!(2024 - 03 - 05)))
            .await;
        ledger
    }

    #[tokio::test]
    async fn shared_boundary_day_is_a_conflict() {
        let ledger = ledger_with_march_booking().await;
        let err = admit(&ledger, request(SPOT, date!(2024 - 03 - 05), date!(2024 - 03 - 08)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::Conflict(Collision { start: true, end: false })
        ));
        assert_eq!(ledger.bookings(SPOT).await.len(), 1);
    }

    #[tokio::test]
    async fn next_day_is_admitted() {
        let ledger = ledger_with_march_booking().await;
        let booking = admit(&ledger, request(SPOT, date!(2024 - 03 - 06), date!(2024 - 03 - 08)))
            .await
            .unwrap();
        assert_eq!(booking.spot_id, SPOT);
        assert_eq!(booking.start_date, date!(2024 - 03 - 06));
        assert_eq!(booking.end_date, date!(2024 - 03 - 08));
        assert_eq!(ledger.bookings(SPOT).await.len(), 2);
    }

    #[tokio::test]
    async fn same_day_range_is_invalid() {
        let ledger = ledger_with_march_booking().await;
        let err = admit(&ledger, request(SPOT, date!(2024 - 03 - 10), date!(2024 - 03 - 10)))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::InvalidRange));
    }

    #[tokio::test]
    async fn invalid_ordering_wins_over_conflict() {
        let ledger = ledger_with_march_booking().await;
        // Overlaps the stored stay, but is reversed.
        let err = admit(&ledger, request(SPOT, date!(2024 - 03 - 04), date!(2024 - 03 - 02)))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::InvalidRange));
    }

    #[tokio::test]
    async fn missing_spot_is_reported_before_dates() {
        let ledger = ledger_with_march_booking().await;
        let err = admit(&ledger, request(9999, date!(2024 - 03 - 06), date!(2024 - 03 - 08)))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::SpotNotFound));

        let err = admit(&ledger, request(9999, date!(2024 - 03 - 10), date!(2024 - 03 - 01)))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::SpotNotFound));
    }

    #[tokio::test]
    async fn unparseable_dates_are_a_validation_error() {
        let ledger = ledger_with_march_booking().await;
        let req = BookingRequest {
            spot_id: SPOT,
            user_id: Uuid::new_v4(),
            dates: serde_json::from_str(r#"{"startDate":"03/06/2024"}"#).unwrap(),
        };
        let err = admit(&ledger, req).await.unwrap_err();
        let AdmissionError::InvalidDates(errors) = err else {
            panic!("expected invalid dates, got {err:?}");
        };
        assert!(errors.contains_key("startDate"));
        assert!(errors.contains_key("endDate"));
    }

    #[tokio::test]
    async fn missing_spot_is_reported_before_unparseable_dates() {
        let ledger = ledger_with_march_booking().await;
        let req = BookingRequest {
            spot_id: 9999,
            user_id: Uuid::new_v4(),
            dates: serde_json::from_str(r#"{"startDate":"2024-03-06"}"#).unwrap(),
        };
        let err = admit(&ledger, req).await.unwrap_err();
        assert!(matches!(err, AdmissionError::SpotNotFound));
    }

    #[tokio::test]
    async fn repeated_failures_keep_their_kind() {
        let ledger = ledger_with_march_booking().await;
        let req = request(SPOT, date!(2024 - 02 - 28), date!(2024 - 03 - 02));
        for _ in 0..3 {
            let err = admit(&ledger, req.clone()).await.unwrap_err();
            assert!(matches!(
                err,
                AdmissionError::Conflict(Collision { start: false, end: true })
            ));
        }
    }

    #[tokio::test]
    async fn enclosing_request_collides_on_both_ends() {
        let ledger = ledger_with_march_booking().await;
        let err = admit(&ledger, request(SPOT, date!(2024 - 02 - 20), date!(2024 - 03 - 20)))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::Conflict(Collision::BOTH)));
    }

    #[tokio::test]
    async fn concurrent_identical_requests_admit_exactly_one() {
        let ledger = MemoryLedger::new();
        ledger.add_spot(SPOT, Uuid::new_v4()).await;
        let a = request(SPOT, date!(2024 - 05 - 01), date!(2024 - 05 - 04));
        let b = request(SPOT, date!(2024 - 05 - 01), date!(2024 - 05 - 04));

        let (ra, rb) = tokio::join!(admit(&ledger, a), admit(&ledger, b));
        let admitted = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        let conflicts = [&ra, &rb]
            .iter()
            .filter(|r| matches!(r, Err(AdmissionError::Conflict(_))))
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(ledger.bookings(SPOT).await.len(), 1);
    }

    #[tokio::test]
    async fn admitted_bookings_never_overlap() {
        let ledger = MemoryLedger::new();
        ledger.add_spot(SPOT, Uuid::new_v4()).await;
        let base = date!(2024 - 06 - 01);
        for offset in 0..20i64 {
            let start = base + time::Duration::days(offset);
            let end = start + time::Duration::days(1 + offset % 3);
            let _ = admit(&ledger, request(SPOT, start, end)).await;
        }
        let stored = ledger.bookings(SPOT).await;
        assert!(stored.len() > 1);
        for (i, a) in stored.iter().enumerate() {
            for b in &stored[i + 1..] {
                assert!(!a.range().overlaps(&b.range()), "{a:?} overlaps {b:?}");
            }
        }
    }

    /// Ledger whose pre-check sees nothing but whose store refuses the row,
    /// as when another writer commits between check and insert.
    struct RacingLedger;
    struct RacingTx;

    #[async_trait]
    impl BookingLedger for RacingLedger {
        async fn begin(&self) -> anyhow::Result<Box<dyn LedgerTx>> {
            Ok(Box::new(RacingTx))
        }
    }

    #[async_trait]
    impl LedgerTx for RacingTx {
        async fn lock_spot(&mut self, spot_id: i64) -> anyhow::Result<Option<SpotRef>> {
            Ok(Some(SpotRef { id: spot_id, owner_id: Uuid::nil() }))
        }
        async fn find_conflict(&mut self, _: i64, _: DateRange) -> anyhow::Result<Option<Booking>> {
            Ok(None)
        }
        async fn insert(&mut self, _: &NewBooking) -> Result<Booking, InsertError> {
            Err(InsertError::Overlap)
        }
        async fn commit(self: Box<Self>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn insert_time_overlap_is_a_conflict() {
        let err = admit(&RacingLedger, request(SPOT, date!(2024 - 03 - 06), date!(2024 - 03 - 08)))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::Conflict(Collision::BOTH)));
        assert!(matches!(ApiError::from(err), ApiError::Conflict { .. }));
    }

    #[test]
    fn collision_field_errors_use_request_field_names() {
        let errors = Collision { start: true, end: false }.field_errors();
        assert_eq!(errors.get("startDate").map(String::as_str), Some(START_CONFLICT));
        assert!(errors.get("endDate").is_none());
        assert_eq!(Collision::BOTH.field_errors().len(), 2);
    }
}
