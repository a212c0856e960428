use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::bookings::{Booking, NewBooking};
use crate::web::PgPool;
use crate::webhook_dispatcher::BookingStore;

#[derive(Clone)]
pub struct BookingsRepository {
    pool: PgPool,
}

impl BookingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a booking derived from a BOOKING_CREATED delivery.
    ///
    /// The unique index on `uid` is the duplicate-delivery guard: a redelivered
    /// event hits the conflict, inserts nothing, and the record stored by the
    /// first delivery is returned instead.
    pub async fn create(&self, new_booking: NewBooking) -> Result<Booking> {
        use crate::schema::bookings::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let inserted: Option<Booking> = diesel::insert_into(dsl::bookings)
                .values(&new_booking)
                .on_conflict(dsl::uid)
                .do_nothing()
                .get_result(&mut conn)
                .optional()?;

            let booking = match inserted {
                Some(booking) => booking,
                None => dsl::bookings
                    .filter(dsl::uid.eq(&new_booking.uid))
                    .first::<Booking>(&mut conn)?,
            };

            Ok::<Booking, anyhow::Error>(booking)
        })
        .await??;

        Ok(result)
    }

    /// Get a booking by ID
    pub async fn get_by_id(&self, booking_id: Uuid) -> Result<Option<Booking>> {
        use crate::schema::bookings::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let booking: Option<Booking> = dsl::bookings
                .filter(dsl::id.eq(booking_id))
                .first::<Booking>(&mut conn)
                .optional()?;

            Ok::<Option<Booking>, anyhow::Error>(booking)
        })
        .await??;

        Ok(result)
    }

    /// Get the most recently created bookings
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Booking>> {
        use crate::schema::bookings::dsl;

        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let bookings: Vec<Booking> = dsl::bookings
                .order_by(dsl::created_at.desc())
                .limit(limit)
                .load::<Booking>(&mut conn)?;

            Ok::<Vec<Booking>, anyhow::Error>(bookings)
        })
        .await??;

        Ok(result)
    }
}

#[async_trait]
impl BookingStore for BookingsRepository {
    async fn create_booking(&self, new_booking: NewBooking) -> Result<Booking> {
        self.create(new_booking).await
    }
}
