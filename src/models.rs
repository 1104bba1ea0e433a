use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::scheduling::clock::SystemClock;
use crate::scheduling::repo::PgRepository;
use crate::scheduling::service::SchedulingService;

/// The scheduling core as wired in production: Postgres-backed repository,
/// system wall clock.
pub type Scheduler = SchedulingService<PgRepository, SystemClock>;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_hours: i64,
    pub scheduler: Scheduler,
}

/* -------------------------
   Roles
--------------------------*/

pub const ROLE_CLIENT: i16 = 0;
pub const ROLE_ADMIN: i16 = 1;

pub fn role_to_string(role: i16) -> String {
    match role {
        ROLE_CLIENT => "client",
        ROLE_ADMIN => "admin",
        _ => "unknown",
    }
    .to_string()
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub data: LoginResponseData,
}

#[derive(Debug, Serialize)]
pub struct LoginResponseData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub data: MeResponseData,
}

#[derive(Debug, Serialize)]
pub struct MeResponseData {
    pub user: UserProfile,
    pub session: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

impl OkResponse {
    pub fn yes() -> Self {
        OkResponse {
            data: OkData { ok: true },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: i16,
    pub is_active: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryRow {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ServiceRow {
    pub service_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub price_cents: i32,
    pub duration_min: i32,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "smallint")]
#[repr(i16)]
pub enum MessageDirection {
    Inbound = 0,  // client -> admin
    Outbound = 1, // admin -> client
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MessageRow {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub direction: MessageDirection,
    pub subject: Option<String>,
    pub body: String,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
}

/// A user's view of one broadcast notification (link row joined to the
/// event row).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserNotificationRow {
    pub user_notification_id: Uuid,
    pub notification_id: Uuid,
    pub event: i16,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
