use chrono::{DateTime, Utc};
use serde_json::Value;
use slotbook_domain::{Booking, Guest, ID};
use sqlx::{FromRow, PgPool, types::Uuid};
use tracing::{error, instrument};

use super::{BookingWriteError, IBookingRepo};

const HOST_SLOT_INDEX: &str = "bookings__host_slot";
const IDEMPOTENCY_KEY_INDEX: &str = "bookings__idempotency_key";

#[derive(Debug)]
pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps unique violations of the slot and idempotency indexes to their
/// typed rejections; everything else stays opaque.
fn map_write_error(e: sqlx::Error) -> BookingWriteError {
    if let sqlx::Error::Database(db) = &e {
        match db.constraint() {
            Some(HOST_SLOT_INDEX) => return BookingWriteError::SlotTaken,
            Some(IDEMPOTENCY_KEY_INDEX) => return BookingWriteError::DuplicateIdempotencyKey,
            _ => {}
        }
    }
    BookingWriteError::Other(e.into())
}

#[derive(Debug, FromRow)]
struct BookingRaw {
    booking_uid: Uuid,
    uid: String,
    host_uid: Uuid,
    event_type_uid: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    guest_name: String,
    guest_email: String,
    guest_phone: Option<String>,
    guest_company: Option<String>,
    guest_notes: Option<String>,
    guest_timezone: String,
    status: String,
    idempotency_key: Option<String>,
    custom_responses: Value,
    external_event_ref: Option<String>,
    external_event_created: bool,
    meeting_url: Option<String>,
    rescheduled_from_uid: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl TryFrom<BookingRaw> for Booking {
    type Error = anyhow::Error;

    fn try_from(b: BookingRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: b.booking_uid.into(),
            uid: b.uid,
            host_id: b.host_uid.into(),
            event_type_id: b.event_type_uid.into(),
            start_time: b.start_time,
            end_time: b.end_time,
            guest: Guest {
                name: b.guest_name,
                email: b.guest_email,
                phone: b.guest_phone,
                company: b.guest_company,
                notes: b.guest_notes,
            },
            guest_timezone: b
                .guest_timezone
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid timezone stored for booking"))?,
            status: b.status.try_into()?,
            idempotency_key: b.idempotency_key,
            custom_responses: b.custom_responses,
            external_event_ref: b.external_event_ref,
            external_event_created: b.external_event_created,
            meeting_url: b.meeting_url,
            rescheduled_from_uid: b.rescheduled_from_uid,
            cancelled_at: b.cancelled_at,
            created: b.created,
            updated: b.updated,
        })
    }
}

#[async_trait::async_trait]
impl IBookingRepo for PostgresBookingRepo {
    #[instrument(skip(self, booking))]
    async fn insert(&self, booking: &Booking) -> Result<(), BookingWriteError> {
        let status: String = booking.status.clone().into();
        sqlx::query(
            r#"
            INSERT INTO bookings(
                booking_uid,
                uid,
                host_uid,
                event_type_uid,
                start_time,
                end_time,
                guest_name,
                guest_email,
                guest_phone,
                guest_company,
                guest_notes,
                guest_timezone,
                status,
                idempotency_key,
                custom_responses,
                external_event_ref,
                external_event_created,
                meeting_url,
                rescheduled_from_uid,
                cancelled_at,
                created,
                updated
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(*booking.id.as_ref())
        .bind(&booking.uid)
        .bind(*booking.host_id.as_ref())
        .bind(*booking.event_type_id.as_ref())
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(&booking.guest.name)
        .bind(&booking.guest.email)
        .bind(&booking.guest.phone)
        .bind(&booking.guest.company)
        .bind(&booking.guest.notes)
        .bind(booking.guest_timezone.to_string())
        .bind(status)
        .bind(&booking.idempotency_key)
        .bind(&booking.custom_responses)
        .bind(&booking.external_event_ref)
        .bind(booking.external_event_created)
        .bind(&booking.meeting_url)
        .bind(&booking.rescheduled_from_uid)
        .bind(booking.cancelled_at)
        .bind(booking.created)
        .bind(booking.updated)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to insert booking {}. DB returned error: {:?}",
                booking.uid, err
            );
        })
        .map_err(map_write_error)?;

        Ok(())
    }

    #[instrument(skip(self, booking))]
    async fn save(&self, booking: &Booking) -> Result<(), BookingWriteError> {
        let status: String = booking.status.clone().into();
        sqlx::query(
            r#"
            UPDATE bookings
            SET uid = $2,
                start_time = $3,
                end_time = $4,
                status = $5,
                external_event_ref = $6,
                external_event_created = $7,
                meeting_url = $8,
                rescheduled_from_uid = $9,
                cancelled_at = $10,
                updated = $11
            WHERE booking_uid = $1
            "#,
        )
        .bind(*booking.id.as_ref())
        .bind(&booking.uid)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(status)
        .bind(&booking.external_event_ref)
        .bind(booking.external_event_created)
        .bind(&booking.meeting_url)
        .bind(&booking.rescheduled_from_uid)
        .bind(booking.cancelled_at)
        .bind(booking.updated)
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to save booking {}. DB returned error: {:?}",
                booking.uid, err
            );
        })
        .map_err(map_write_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, booking_id: &ID) -> anyhow::Result<Option<Booking>> {
        let res: Option<BookingRaw> = sqlx::query_as(
            r#"
            SELECT * FROM bookings
            WHERE booking_uid = $1
            "#,
        )
        .bind(*booking_id.as_ref())
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find booking {}. DB returned error: {:?}",
                booking_id, err
            );
        })?;

        res.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_uid(&self, uid: &str) -> anyhow::Result<Option<Booking>> {
        let res: Option<BookingRaw> = sqlx::query_as(
            r#"
            SELECT * FROM bookings
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find booking with uid {}. DB returned error: {:?}",
                uid, err
            );
        })?;

        res.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_idempotency_key(&self, key: &str) -> anyhow::Result<Option<Booking>> {
        let res: Option<BookingRaw> = sqlx::query_as(
            r#"
            SELECT * FROM bookings
            WHERE idempotency_key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| {
            error!("Unable to find booking by idempotency key. DB returned error: {:?}", err);
        })?;

        res.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn find_blocking_in_timespan(
        &self,
        host_id: &ID,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Booking>> {
        let res: Vec<BookingRaw> = sqlx::query_as(
            r#"
            SELECT * FROM bookings
            WHERE host_uid = $1
              AND status IN ('pending', 'confirmed')
              AND start_time < $3
              AND end_time > $2
            ORDER BY start_time ASC
            "#,
        )
        .bind(*host_id.as_ref())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|err| {
            error!(
                "Unable to find blocking bookings for host {}. DB returned error: {:?}",
                host_id, err
            );
        })?;

        res.into_iter().map(TryInto::try_into).collect()
    }
}
