// src/routes/appointment_routes.rs

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, OkResponse, ROLE_ADMIN},
    scheduling::repo::AppointmentRecord,
    scheduling::service::{BookingRequest, UpdateRequest},
    scheduling::status::{AppointmentStatus, Origin},
};

fn is_admin(auth: &AuthContext) -> bool {
    auth.role == ROLE_ADMIN
}

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if is_admin(auth) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admins can manage appointments".into(),
        ))
    }
}

fn booking_origin(auth: &AuthContext) -> Origin {
    if is_admin(auth) { Origin::Admin } else { Origin::Client }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route("/my", get(list_my_appointments))
        .route("/slot", get(check_slot))
        .route(
            "/{appointment_id}",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route("/{appointment_id}/status", patch(patch_status))
}

/* ============================================================
   Query params / DTOs
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// YYYY-MM-DD; when present the listing is the admin's day calendar.
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct SlotCheck {
    pub taken: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointments: Option<Vec<AppointmentRecord>>,
}

#[derive(Debug, Serialize)]
pub struct CreatedAppointment {
    pub appointment_id: Uuid,
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
pub struct PatchStatusRequest {
    pub status: AppointmentStatus,
}

/* ============================================================
   GET /  (admin calendar; full list or one day)
   ============================================================ */

pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiOk<Vec<AppointmentRecord>>>, ApiError> {
    ensure_admin(&auth)?;

    let rows = match q.date.as_deref() {
        Some(date) => state.scheduler.list_by_day(date).await?,
        None => state.scheduler.list_all().await?,
    };

    Ok(Json(ApiOk { data: rows }))
}

/* ============================================================
   GET /my  (appointments booked under the caller's email)
   ============================================================ */

pub async fn list_my_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<AppointmentRecord>>>, ApiError> {
    let rows = state.scheduler.list_by_client_email(&auth.email).await?;
    Ok(Json(ApiOk { data: rows }))
}

/* ============================================================
   GET /slot?date=..&time=..  ("is this slot taken")
   ============================================================ */

pub async fn check_slot(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<SlotQuery>,
) -> Result<Json<ApiOk<SlotCheck>>, ApiError> {
    let rows = state.scheduler.list_by_slot(&q.date, &q.time).await?;

    // Clients only learn whether the slot is free; the occupying records
    // (contact details included) are admin-only.
    let check = SlotCheck {
        taken: !rows.is_empty(),
        appointments: is_admin(&auth).then_some(rows),
    };
    Ok(Json(ApiOk { data: check }))
}

/* ============================================================
   GET /{id}
   ============================================================ */

pub async fn get_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<AppointmentRecord>>, ApiError> {
    let record = state.scheduler.get(appointment_id).await?;

    if !is_admin(&auth) && record.client_email != auth.email {
        return Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Clients can only view their own appointments".into(),
        ));
    }

    Ok(Json(ApiOk { data: record }))
}

/* ============================================================
   POST /  (create; origin decides the initial status)
   ============================================================ */

pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<BookingRequest>,
) -> Result<Json<ApiOk<CreatedAppointment>>, ApiError> {
    let origin = booking_origin(&auth);
    let appointment_id = state.scheduler.create(req, origin).await?;

    Ok(Json(ApiOk {
        data: CreatedAppointment {
            appointment_id,
            status: AppointmentStatus::initial_for(origin),
        },
    }))
}

/* ============================================================
   PUT /{id}  (admin full-field edit, drag-reschedule included)
   ============================================================ */

pub async fn update_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<ApiOk<AppointmentRecord>>, ApiError> {
    ensure_admin(&auth)?;

    state.scheduler.update(appointment_id, req).await?;
    let record = state.scheduler.get(appointment_id).await?;
    Ok(Json(ApiOk { data: record }))
}

/* ============================================================
   PATCH /{id}/status  (status-only; no temporal re-validation)
   ============================================================ */

pub async fn patch_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<PatchStatusRequest>,
) -> Result<Json<ApiOk<AppointmentRecord>>, ApiError> {
    ensure_admin(&auth)?;

    state.scheduler.update_status(appointment_id, req.status).await?;
    let record = state.scheduler.get(appointment_id).await?;
    Ok(Json(ApiOk { data: record }))
}

/* ============================================================
   DELETE /{id}  (hard delete)
   ============================================================ */

pub async fn delete_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;

    state.scheduler.delete(appointment_id).await?;
    Ok(Json(OkResponse::yes()))
}
