use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use super::clock::Clock;
use super::repo::{
    AppointmentRecord, AppointmentRepository, AppointmentUpdate, NewAppointment, RepoError,
};
use super::slot;
use super::status::{AppointmentStatus, Origin};

/// Outcomes a caller must be able to tell apart: bad input, occupied slot,
/// missing id, and storage failure. Reported synchronously, no retry, no
/// partial application.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("{0}")]
    Validation(String),
    #[error("an appointment already occupies this slot")]
    Conflict,
    #[error("appointment not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Persistence(sqlx::Error),
}

impl From<RepoError> for ScheduleError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::SlotTaken => ScheduleError::Conflict,
            RepoError::Database(e) => ScheduleError::Persistence(e),
        }
    }
}

/// Booking payload as submitted. Presence of required fields is checked here,
/// not at the deserialization layer, so a missing field surfaces as a
/// validation error rather than a malformed-body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub service_id: Option<Uuid>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub notes: Option<String>,
}

/// Full-field edit payload. Same required fields as a booking; a `None`
/// status keeps the stored one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRequest {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub service_id: Option<Uuid>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ScheduleError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ScheduleError::Validation(format!("{field} is required"))),
    }
}

fn normalized_slot(date_raw: &str, time_raw: &str) -> Result<(NaiveDate, String), ScheduleError> {
    let date = slot::normalize_date(date_raw)
        .map_err(|e| ScheduleError::Validation(e.to_string()))?;
    let time = slot::normalize_time(time_raw)
        .map_err(|e| ScheduleError::Validation(e.to_string()))?;
    Ok((date, time))
}

/// Orchestrates booking validation, the conflict check and persistence.
/// Stateless between calls; all shared state lives in the repository.
#[derive(Clone)]
pub struct SchedulingService<R, C> {
    repo: R,
    clock: C,
}

impl<R, C> SchedulingService<R, C>
where
    R: AppointmentRepository,
    C: Clock,
{
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Book a slot. The application-level conflict check runs first for a
    /// friendly error; the unique constraint in the store closes the
    /// check-then-insert race between concurrent bookings.
    pub async fn create(
        &self,
        req: BookingRequest,
        origin: Origin,
    ) -> Result<Uuid, ScheduleError> {
        let client_name = required_text(req.client_name, "client_name")?;
        let client_email = required_text(req.client_email, "client_email")?;
        let service_id = req
            .service_id
            .ok_or_else(|| ScheduleError::Validation("service_id is required".into()))?;
        let date_raw = required_text(req.date, "date")?;
        let time_raw = required_text(req.time, "time")?;

        let (date, time) = normalized_slot(&date_raw, &time_raw)?;

        let (today, now) = self.clock.now();
        if date < today {
            return Err(ScheduleError::Validation(
                "date must not be in the past".into(),
            ));
        }
        if date == today && time < slot::canonical_minute(now) {
            return Err(ScheduleError::Validation(
                "time must not be in the past".into(),
            ));
        }

        // Any existing appointment blocks the slot, cancelled ones included.
        if !self.repo.find_by_exact_slot(date, &time).await?.is_empty() {
            return Err(ScheduleError::Conflict);
        }

        let id = self
            .repo
            .insert(NewAppointment {
                client_name,
                client_email,
                client_phone: req.client_phone.unwrap_or_default(),
                service_id,
                appointment_date: date,
                appointment_time: time,
                status: AppointmentStatus::initial_for(origin),
                notes: req.notes,
                created_by: origin,
            })
            .await?;

        Ok(id)
    }

    /// Full-field edit. Re-applies the required-field validation but does
    /// not re-run the conflict pre-check; the storage constraint still
    /// rejects a move onto an occupied slot.
    pub async fn update(&self, id: Uuid, req: UpdateRequest) -> Result<(), ScheduleError> {
        let client_name = required_text(req.client_name, "client_name")?;
        let client_email = required_text(req.client_email, "client_email")?;
        let service_id = req
            .service_id
            .ok_or_else(|| ScheduleError::Validation("service_id is required".into()))?;
        let date_raw = required_text(req.date, "date")?;
        let time_raw = required_text(req.time, "time")?;

        let (date, time) = normalized_slot(&date_raw, &time_raw)?;

        let affected = self
            .repo
            .update_fields(
                id,
                AppointmentUpdate {
                    client_name,
                    client_email,
                    client_phone: req.client_phone.unwrap_or_default(),
                    service_id,
                    appointment_date: date,
                    appointment_time: time,
                    status: req.status,
                    notes: req.notes,
                },
            )
            .await?;

        if affected == 0 {
            return Err(ScheduleError::NotFound);
        }
        Ok(())
    }

    /// Status-only change. Any status may be forced onto any appointment;
    /// off-path moves are logged, never rejected, and no temporal
    /// re-validation happens here — past-dated appointments still complete.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<(), ScheduleError> {
        let Some(current) = self.repo.find_by_id(id).await? else {
            return Err(ScheduleError::NotFound);
        };

        if !AppointmentStatus::is_standard_transition(current.status, status) {
            tracing::warn!(
                appointment_id = %id,
                from = %current.status,
                to = %status,
                "non-standard status transition"
            );
        }

        let affected = self.repo.update_status(id, status).await?;
        if affected == 0 {
            return Err(ScheduleError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ScheduleError> {
        let affected = self.repo.delete(id).await?;
        if affected == 0 {
            return Err(ScheduleError::NotFound);
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<AppointmentRecord, ScheduleError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(ScheduleError::NotFound)
    }

    pub async fn list_all(&self) -> Result<Vec<AppointmentRecord>, ScheduleError> {
        Ok(self.repo.list_all().await?)
    }

    pub async fn list_by_day(
        &self,
        date_raw: &str,
    ) -> Result<Vec<AppointmentRecord>, ScheduleError> {
        let date = slot::normalize_date(date_raw)
            .map_err(|e| ScheduleError::Validation(e.to_string()))?;
        Ok(self.repo.list_by_day(date).await?)
    }

    /// Exact-match lookup; no case normalization beyond what callers apply.
    pub async fn list_by_client_email(
        &self,
        email: &str,
    ) -> Result<Vec<AppointmentRecord>, ScheduleError> {
        Ok(self.repo.find_by_email(email).await?)
    }

    /// Backing query for the conflict check, also exposed for "is this slot
    /// taken" lookups from the calendar UI.
    pub async fn list_by_slot(
        &self,
        date_raw: &str,
        time_raw: &str,
    ) -> Result<Vec<AppointmentRecord>, ScheduleError> {
        let (date, time) = normalized_slot(date_raw, time_raw)?;
        Ok(self.repo.find_by_exact_slot(date, &time).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::clock::FixedClock;
    use async_trait::async_trait;
    use chrono::{NaiveTime, Utc};
    use std::sync::Mutex;

    /// Mirrors the Postgres table, including the unique (date, time)
    /// constraint, so the service sees the same write outcomes as in
    /// production.
    struct InMemoryRepository {
        rows: Mutex<Vec<AppointmentRecord>>,
    }

    impl InMemoryRepository {
        fn new() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
            }
        }

        fn snapshot(&self, id: Uuid) -> Option<AppointmentRecord> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.appointment_id == id)
                .cloned()
        }
    }

    #[async_trait]
    impl AppointmentRepository for InMemoryRepository {
        async fn insert(&self, rec: NewAppointment) -> Result<Uuid, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|r| {
                r.appointment_date == rec.appointment_date
                    && r.appointment_time == rec.appointment_time
            }) {
                return Err(RepoError::SlotTaken);
            }
            let id = Uuid::new_v4();
            rows.push(AppointmentRecord {
                appointment_id: id,
                client_name: rec.client_name,
                client_email: rec.client_email,
                client_phone: rec.client_phone,
                service_id: rec.service_id,
                appointment_date: rec.appointment_date,
                appointment_time: rec.appointment_time,
                status: rec.status,
                notes: rec.notes,
                created_by: rec.created_by,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                service_name: "Test Service".into(),
                price_cents: 5000,
                duration_min: 30,
            });
            Ok(id)
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<AppointmentRecord>, RepoError> {
            Ok(self.snapshot(id))
        }

        async fn find_by_email(&self, email: &str) -> Result<Vec<AppointmentRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.client_email == email)
                .cloned()
                .collect())
        }

        async fn find_by_exact_slot(
            &self,
            date: NaiveDate,
            time: &str,
        ) -> Result<Vec<AppointmentRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.appointment_date == date && r.appointment_time == time)
                .cloned()
                .collect())
        }

        async fn list_all(&self) -> Result<Vec<AppointmentRecord>, RepoError> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn list_by_day(&self, date: NaiveDate) -> Result<Vec<AppointmentRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.appointment_date == date)
                .cloned()
                .collect())
        }

        async fn update_fields(
            &self,
            id: Uuid,
            fields: AppointmentUpdate,
        ) -> Result<u64, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|r| {
                r.appointment_id != id
                    && r.appointment_date == fields.appointment_date
                    && r.appointment_time == fields.appointment_time
            }) {
                return Err(RepoError::SlotTaken);
            }
            match rows.iter_mut().find(|r| r.appointment_id == id) {
                Some(row) => {
                    row.client_name = fields.client_name;
                    row.client_email = fields.client_email;
                    row.client_phone = fields.client_phone;
                    row.service_id = fields.service_id;
                    row.appointment_date = fields.appointment_date;
                    row.appointment_time = fields.appointment_time;
                    if let Some(status) = fields.status {
                        row.status = status;
                    }
                    row.notes = fields.notes;
                    row.updated_at = Utc::now();
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        async fn update_status(
            &self,
            id: Uuid,
            status: AppointmentStatus,
        ) -> Result<u64, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            match rows.iter_mut().find(|r| r.appointment_id == id) {
                Some(row) => {
                    row.status = status;
                    row.updated_at = Utc::now();
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        async fn delete(&self, id: Uuid) -> Result<u64, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| r.appointment_id != id);
            Ok((before - rows.len()) as u64)
        }
    }

    fn service_at(
        date: &str,
        time: &str,
    ) -> SchedulingService<InMemoryRepository, FixedClock> {
        let clock = FixedClock {
            date: date.parse().unwrap(),
            time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
        };
        SchedulingService::new(InMemoryRepository::new(), clock)
    }

    fn booking(date: &str, time: &str) -> BookingRequest {
        BookingRequest {
            client_name: Some("Dana Petrov".into()),
            client_email: Some("dana@example.com".into()),
            client_phone: Some("555-0101".into()),
            service_id: Some(Uuid::new_v4()),
            date: Some(date.into()),
            time: Some(time.into()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn rejects_past_date() {
        let svc = service_at("2025-06-10", "10:00");
        let err = svc
            .create(booking("2025-06-09", "23:59"), Origin::Client)
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
    }

    #[tokio::test]
    async fn same_day_past_time_boundary_is_minute_precise() {
        let svc = service_at("2025-06-10", "10:00");

        let err = svc
            .create(booking("2025-06-10", "09:59"), Origin::Client)
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));

        // The current minute itself is still bookable.
        svc.create(booking("2025-06-10", "10:00"), Origin::Client)
            .await
            .unwrap();
        svc.create(booking("2025-06-10", "10:01"), Origin::Client)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_required_fields_are_validation_errors() {
        let svc = service_at("2025-06-01", "08:00");

        let mut req = booking("2025-06-10", "14:00");
        req.client_email = Some("   ".into());
        let err = svc.create(req, Origin::Client).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));

        let mut req = booking("2025-06-10", "14:00");
        req.service_id = None;
        let err = svc.create(req, Origin::Client).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
    }

    #[tokio::test]
    async fn identical_slot_conflicts_adjacent_minute_does_not() {
        let svc = service_at("2025-06-01", "08:00");

        svc.create(booking("2025-06-10", "14:00"), Origin::Client)
            .await
            .unwrap();

        let err = svc
            .create(booking("2025-06-10", "14:00"), Origin::Client)
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict));

        svc.create(booking("2025-06-10", "14:01"), Origin::Client)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_appointment_still_blocks_its_slot() {
        let svc = service_at("2025-06-01", "08:00");

        let id = svc
            .create(booking("2025-06-10", "14:00"), Origin::Client)
            .await
            .unwrap();
        svc.update_status(id, AppointmentStatus::Cancelled)
            .await
            .unwrap();

        let err = svc
            .create(booking("2025-06-10", "14:00"), Origin::Client)
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict));
    }

    #[tokio::test]
    async fn submitted_timestamp_and_plain_date_name_the_same_slot() {
        let svc = service_at("2025-06-01", "08:00");

        svc.create(booking("2025-06-10T00:00:00.000Z", "14:00"), Origin::Client)
            .await
            .unwrap();

        let err = svc
            .create(booking("2025-06-10", "14:00"), Origin::Client)
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict));
    }

    #[tokio::test]
    async fn unpadded_time_normalizes_to_the_padded_slot() {
        let svc = service_at("2025-06-01", "08:00");

        svc.create(booking("2025-06-10", "9:5"), Origin::Client)
            .await
            .unwrap();

        let err = svc
            .create(booking("2025-06-10", "09:05"), Origin::Client)
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Conflict));
    }

    #[tokio::test]
    async fn origin_sets_the_initial_status() {
        let svc = service_at("2025-06-01", "08:00");

        let client_id = svc
            .create(booking("2025-06-10", "14:00"), Origin::Client)
            .await
            .unwrap();
        let admin_id = svc
            .create(booking("2025-06-10", "15:00"), Origin::Admin)
            .await
            .unwrap();

        let client_booked = svc.get(client_id).await.unwrap();
        let admin_booked = svc.get(admin_id).await.unwrap();
        assert_eq!(client_booked.status, AppointmentStatus::Pending);
        assert_eq!(client_booked.created_by, Origin::Client);
        assert_eq!(admin_booked.status, AppointmentStatus::Confirmed);
        assert_eq!(admin_booked.created_by, Origin::Admin);
    }

    #[tokio::test]
    async fn status_update_touches_nothing_else_and_skips_temporal_checks() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert(NewAppointment {
                client_name: "Dana Petrov".into(),
                client_email: "dana@example.com".into(),
                client_phone: "555-0101".into(),
                service_id: Uuid::new_v4(),
                appointment_date: "2025-06-10".parse().unwrap(),
                appointment_time: "14:00".into(),
                status: AppointmentStatus::Confirmed,
                notes: Some("bring paperwork".into()),
                created_by: Origin::Client,
            })
            .await
            .unwrap();

        // Clock pinned weeks after the appointment day: completing a
        // past-dated appointment must not trip any retroactive validation.
        let svc = SchedulingService::new(
            repo,
            FixedClock {
                date: "2025-07-01".parse().unwrap(),
                time: NaiveTime::parse_from_str("08:00", "%H:%M").unwrap(),
            },
        );
        let before = svc.get(id).await.unwrap();

        svc.update_status(id, AppointmentStatus::Completed)
            .await
            .unwrap();

        let after = svc.get(id).await.unwrap();
        assert_eq!(after.status, AppointmentStatus::Completed);
        assert_eq!(after.appointment_date, before.appointment_date);
        assert_eq!(after.appointment_time, before.appointment_time);
        assert_eq!(after.client_email, before.client_email);
        assert_eq!(after.client_name, before.client_name);
        assert_eq!(after.notes, before.notes);
    }

    #[tokio::test]
    async fn missing_ids_report_not_found_not_validation() {
        let svc = service_at("2025-06-01", "08:00");
        let ghost = Uuid::new_v4();

        let err = svc
            .update_status(ghost, AppointmentStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound));

        let req = UpdateRequest {
            client_name: Some("Dana Petrov".into()),
            client_email: Some("dana@example.com".into()),
            service_id: Some(Uuid::new_v4()),
            date: Some("2025-06-10".into()),
            time: Some("14:00".into()),
            ..Default::default()
        };
        let err = svc.update(ghost, req).await.unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound));

        let err = svc.delete(ghost).await.unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound));

        let err = svc.get(ghost).await.unwrap_err();
        assert!(matches!(err, ScheduleError::NotFound));
    }

    #[tokio::test]
    async fn update_keeps_status_when_not_supplied() {
        let svc = service_at("2025-06-01", "08:00");
        let id = svc
            .create(booking("2025-06-10", "14:00"), Origin::Admin)
            .await
            .unwrap();

        let req = UpdateRequest {
            client_name: Some("Dana P.".into()),
            client_email: Some("dana@example.com".into()),
            client_phone: Some("555-0102".into()),
            service_id: Some(Uuid::new_v4()),
            date: Some("2025-06-11".into()),
            time: Some("15:30".into()),
            status: None,
            notes: Some("rescheduled by phone".into()),
        };
        svc.update(id, req).await.unwrap();

        let after = svc.get(id).await.unwrap();
        assert_eq!(after.status, AppointmentStatus::Confirmed);
        assert_eq!(after.client_name, "Dana P.");
        assert_eq!(after.appointment_time, "15:30");
        assert_eq!(after.notes.as_deref(), Some("rescheduled by phone"));
    }

    #[tokio::test]
    async fn email_listing_is_exact_match_and_idempotent() {
        let svc = service_at("2025-06-01", "08:00");
        svc.create(booking("2025-06-10", "14:00"), Origin::Client)
            .await
            .unwrap();

        let mut other = booking("2025-06-10", "15:00");
        other.client_email = Some("Dana@Example.com".into());
        svc.create(other, Origin::Client).await.unwrap();

        let first = svc.list_by_client_email("dana@example.com").await.unwrap();
        let second = svc.list_by_client_email("dana@example.com").await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(
            first
                .iter()
                .map(|r| r.appointment_id)
                .collect::<Vec<_>>(),
            second
                .iter()
                .map(|r| r.appointment_id)
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn slot_listing_normalizes_its_arguments() {
        let svc = service_at("2025-06-01", "08:00");
        svc.create(booking("2025-06-10", "14:00"), Origin::Client)
            .await
            .unwrap();

        let hits = svc
            .list_by_slot("2025-06-10T00:00:00.000Z", "14:0")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = svc.list_by_slot("2025-06-10", "14:01").await.unwrap();
        assert!(misses.is_empty());
    }
}
