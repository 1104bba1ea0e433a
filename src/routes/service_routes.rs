// src/routes/service_routes.rs

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, OkResponse, ROLE_ADMIN, ServiceRow},
    notify::{self, ServiceEvent},
};

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admins can manage the service catalog".into(),
        ))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route(
            "/{service_id}",
            get(get_service).patch(patch_service).delete(delete_service),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListServicesQuery {
    pub category_id: Option<Uuid>,
}

/* ============================================================
   GET /  (active services, optionally one category)
   ============================================================ */

pub async fn list_services(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(q): Query<ListServicesQuery>,
) -> Result<Json<Vec<ServiceRow>>, ApiError> {
    let rows: Vec<ServiceRow> = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT
          service_id,
          category_id,
          name,
          price_cents,
          duration_min,
          image_url,
          is_active,
          created_at,
          updated_at
        FROM service
        WHERE is_active = true
          AND ($1::uuid IS NULL OR category_id = $1)
        ORDER BY name ASC
        "#,
    )
    .bind(q.category_id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(rows))
}

/* ============================================================
   GET /{id}
   ============================================================ */

pub async fn get_service(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(service_id): Path<Uuid>,
) -> Result<Json<ApiOk<ServiceRow>>, ApiError> {
    let row: ServiceRow = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT
          service_id, category_id, name, price_cents, duration_min,
          image_url, is_active, created_at, updated_at
        FROM service
        WHERE service_id = $1
        "#,
    )
    .bind(service_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "service not found".into()))?;

    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   POST /  (admin; fans out a "created" notification)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub category_id: Uuid,
    pub name: String,
    pub price_cents: i32,
    pub duration_min: i32,
    pub image_url: Option<String>,
}

pub async fn create_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateServiceRequest>,
) -> Result<Json<ApiOk<ServiceRow>>, ApiError> {
    ensure_admin(&auth)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("VALIDATION_ERROR", "name is required".into()));
    }
    if req.price_cents < 0 {
        return Err(ApiError::BadRequest("VALIDATION_ERROR", "price_cents must be >= 0".into()));
    }
    if req.duration_min <= 0 {
        return Err(ApiError::BadRequest("VALIDATION_ERROR", "duration_min must be > 0".into()));
    }

    let row: ServiceRow = sqlx::query_as::<_, ServiceRow>(
        r#"
        INSERT INTO service (category_id, name, price_cents, duration_min, image_url)
        VALUES ($1,$2,$3,$4,$5)
        RETURNING
          service_id, category_id, name, price_cents, duration_min,
          image_url, is_active, created_at, updated_at
        "#,
    )
    .bind(req.category_id)
    .bind(name)
    .bind(req.price_cents)
    .bind(req.duration_min)
    .bind(req.image_url.as_deref())
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::BadRequest("SERVICE_CREATE_FAILED", format!("{e}")))?;

    // Broadcast after commit; delivery failures never undo the insert.
    notify::spawn_fan_out(state.db.clone(), ServiceEvent::Created, row.name.clone());

    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   PATCH /{id}  (admin; fans out an "updated" notification)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct PatchServiceRequest {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub price_cents: Option<i32>,
    pub duration_min: Option<i32>,
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
}

pub async fn patch_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(service_id): Path<Uuid>,
    Json(req): Json<PatchServiceRequest>,
) -> Result<Json<ApiOk<ServiceRow>>, ApiError> {
    ensure_admin(&auth)?;

    if let Some(p) = req.price_cents {
        if p < 0 {
            return Err(ApiError::BadRequest("VALIDATION_ERROR", "price_cents must be >= 0".into()));
        }
    }
    if let Some(d) = req.duration_min {
        if d <= 0 {
            return Err(ApiError::BadRequest("VALIDATION_ERROR", "duration_min must be > 0".into()));
        }
    }

    let row: Option<ServiceRow> = sqlx::query_as::<_, ServiceRow>(
        r#"
        UPDATE service
        SET
          category_id  = COALESCE($2, category_id),
          name         = COALESCE($3, name),
          price_cents  = COALESCE($4, price_cents),
          duration_min = COALESCE($5, duration_min),
          image_url    = COALESCE($6, image_url),
          is_active    = COALESCE($7, is_active),
          updated_at   = now()
        WHERE service_id = $1
        RETURNING
          service_id, category_id, name, price_cents, duration_min,
          image_url, is_active, created_at, updated_at
        "#,
    )
    .bind(service_id)
    .bind(req.category_id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.price_cents)
    .bind(req.duration_min)
    .bind(req.image_url.unwrap_or(None))
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::BadRequest("SERVICE_UPDATE_FAILED", format!("{e}")))?;

    let Some(row) = row else {
        return Err(ApiError::NotFound("NOT_FOUND", "service not found".into()));
    };

    notify::spawn_fan_out(state.db.clone(), ServiceEvent::Updated, row.name.clone());

    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   DELETE /{id}  (admin; fans out a "deleted" notification)
   ============================================================ */

pub async fn delete_service(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(service_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;

    let name: Option<String> = sqlx::query_scalar(
        r#"
        DELETE FROM service
        WHERE service_id = $1
        RETURNING name
        "#,
    )
    .bind(service_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db) = e {
            if db.is_foreign_key_violation() {
                return ApiError::Conflict(
                    "SERVICE_IN_USE",
                    "Service has appointments booked against it".into(),
                );
            }
        }
        ApiError::Internal(format!("db error: {e}"))
    })?;

    let Some(name) = name else {
        return Err(ApiError::NotFound("NOT_FOUND", "service not found".into()));
    };

    notify::spawn_fan_out(state.db.clone(), ServiceEvent::Deleted, name);

    Ok(Json(OkResponse::yes()))
}
