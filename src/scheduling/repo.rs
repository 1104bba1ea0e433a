use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use super::status::{AppointmentStatus, Origin};

#[derive(Debug, Error)]
pub enum RepoError {
    /// The storage-level unique constraint on (date, time) fired.
    #[error("slot already taken")]
    SlotTaken,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One appointment row, with the read-only fields joined in from the
/// service catalog.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AppointmentRecord {
    pub appointment_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub service_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_by: Origin,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub service_name: String,
    pub price_cents: i32,
    pub duration_min: i32,
}

/// Insert payload. `appointment_time` is the canonical "HH:MM" slot string.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub service_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_by: Origin,
}

/// Full-field update payload. `status = None` keeps the stored status.
#[derive(Debug, Clone)]
pub struct AppointmentUpdate {
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub service_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

/// Persistence seam for appointments. Each call is individually atomic; no
/// transaction spans two calls, so the unique slot constraint in the store is
/// the authoritative double-booking guard.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(&self, rec: NewAppointment) -> Result<Uuid, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AppointmentRecord>, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Vec<AppointmentRecord>, RepoError>;
    async fn find_by_exact_slot(
        &self,
        date: NaiveDate,
        time: &str,
    ) -> Result<Vec<AppointmentRecord>, RepoError>;
    async fn list_all(&self) -> Result<Vec<AppointmentRecord>, RepoError>;
    async fn list_by_day(&self, date: NaiveDate) -> Result<Vec<AppointmentRecord>, RepoError>;
    async fn update_fields(&self, id: Uuid, fields: AppointmentUpdate) -> Result<u64, RepoError>;
    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<u64, RepoError>;
    async fn delete(&self, id: Uuid) -> Result<u64, RepoError>;
}

const SELECT_APPOINTMENT: &str = r#"
    SELECT
      a.appointment_id,
      a.client_name,
      a.client_email,
      a.client_phone,
      a.service_id,
      a.appointment_date,
      a.appointment_time,
      a.status,
      a.notes,
      a.created_by,
      a.created_at,
      a.updated_at,
      s.name AS service_name,
      s.price_cents,
      s.duration_min
    FROM appointment a
    JOIN service s ON s.service_id = a.service_id
"#;

#[derive(Clone)]
pub struct PgRepository {
    pool: sqlx::PgPool,
}

impl PgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

fn map_write_err(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return RepoError::SlotTaken;
        }
    }
    RepoError::Database(e)
}

#[async_trait]
impl AppointmentRepository for PgRepository {
    async fn insert(&self, rec: NewAppointment) -> Result<Uuid, RepoError> {
        let appointment_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO appointment (
              client_name,
              client_email,
              client_phone,
              service_id,
              appointment_date,
              appointment_time,
              status,
              notes,
              created_by
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            RETURNING appointment_id
            "#,
        )
        .bind(&rec.client_name)
        .bind(&rec.client_email)
        .bind(&rec.client_phone)
        .bind(rec.service_id)
        .bind(rec.appointment_date)
        .bind(&rec.appointment_time)
        .bind(rec.status)
        .bind(&rec.notes)
        .bind(rec.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(appointment_id)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AppointmentRecord>, RepoError> {
        let sql = format!("{SELECT_APPOINTMENT} WHERE a.appointment_id = $1");
        let row = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<AppointmentRecord>, RepoError> {
        let sql = format!(
            "{SELECT_APPOINTMENT} WHERE a.client_email = $1 ORDER BY a.appointment_date ASC, a.appointment_time ASC"
        );
        let rows = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_by_exact_slot(
        &self,
        date: NaiveDate,
        time: &str,
    ) -> Result<Vec<AppointmentRecord>, RepoError> {
        let sql = format!(
            "{SELECT_APPOINTMENT} WHERE a.appointment_date = $1 AND a.appointment_time = $2"
        );
        let rows = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(date)
            .bind(time)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_all(&self) -> Result<Vec<AppointmentRecord>, RepoError> {
        let sql = format!(
            "{SELECT_APPOINTMENT} ORDER BY a.appointment_date ASC, a.appointment_time ASC"
        );
        let rows = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_by_day(&self, date: NaiveDate) -> Result<Vec<AppointmentRecord>, RepoError> {
        let sql = format!(
            "{SELECT_APPOINTMENT} WHERE a.appointment_date = $1 ORDER BY a.appointment_time ASC"
        );
        let rows = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_fields(&self, id: Uuid, fields: AppointmentUpdate) -> Result<u64, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE appointment
            SET
              client_name      = $2,
              client_email     = $3,
              client_phone     = $4,
              service_id       = $5,
              appointment_date = $6,
              appointment_time = $7,
              status           = COALESCE($8, status),
              notes            = $9,
              updated_at       = now()
            WHERE appointment_id = $1
            "#,
        )
        .bind(id)
        .bind(&fields.client_name)
        .bind(&fields.client_email)
        .bind(&fields.client_phone)
        .bind(fields.service_id)
        .bind(fields.appointment_date)
        .bind(&fields.appointment_time)
        .bind(fields.status)
        .bind(&fields.notes)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(result.rows_affected())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<u64, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE appointment
            SET status = $2, updated_at = now()
            WHERE appointment_id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<u64, RepoError> {
        let result = sqlx::query(r#"DELETE FROM appointment WHERE appointment_id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
