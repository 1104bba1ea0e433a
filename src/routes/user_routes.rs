// src/routes/user_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::hash_password,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, OkResponse, ROLE_ADMIN, ROLE_CLIENT},
};

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admins can manage users".into(),
        ))
    }
}

fn is_known_role(role: i16) -> bool {
    matches!(role, ROLE_CLIENT | ROLE_ADMIN)
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserPublicRow {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: i16,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub role: i16,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub role: Option<i16>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{user_id}", get(get_user).patch(update_user).delete(delete_user))
        .route("/{user_id}/reset_password", post(reset_password))
}

pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<UserPublicRow>>>, ApiError> {
    ensure_admin(&auth)?;

    let users: Vec<UserPublicRow> = sqlx::query_as::<_, UserPublicRow>(
        r#"
        SELECT user_id, email, display_name, role, is_active, created_at
        FROM app_user
        ORDER BY created_at DESC
        LIMIT 200
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk { data: users }))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiOk<UserPublicRow>>, ApiError> {
    ensure_admin(&auth)?;

    let user: UserPublicRow = sqlx::query_as::<_, UserPublicRow>(
        r#"
        SELECT user_id, email, display_name, role, is_active, created_at
        FROM app_user
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "user not found".into()))?;

    Ok(Json(ApiOk { data: user }))
}

pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<ApiOk<UserPublicRow>>, ApiError> {
    ensure_admin(&auth)?;

    let email = req.email.trim().to_lowercase();
    let display_name = req.display_name.trim();
    if email.is_empty() || display_name.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "email, display_name and password are required".into(),
        ));
    }
    if !is_known_role(req.role) {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            format!("unknown role: {}", req.role),
        ));
    }

    let password_hash = hash_password(&req.password).map_err(ApiError::Internal)?;

    let user: UserPublicRow = sqlx::query_as::<_, UserPublicRow>(
        r#"
        INSERT INTO app_user (email, display_name, password_hash, role, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING user_id, email, display_name, role, is_active, created_at
        "#,
    )
    .bind(&email)
    .bind(display_name)
    .bind(&password_hash)
    .bind(req.role)
    .bind(req.is_active.unwrap_or(true))
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db) = e {
            if db.is_unique_violation() {
                return ApiError::Conflict(
                    "EMAIL_TAKEN",
                    "An account with this email already exists".into(),
                );
            }
        }
        ApiError::Internal(format!("db error: {e}"))
    })?;

    Ok(Json(ApiOk { data: user }))
}

pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<ApiOk<UserPublicRow>>, ApiError> {
    ensure_admin(&auth)?;

    if let Some(role) = req.role {
        if !is_known_role(role) {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                format!("unknown role: {role}"),
            ));
        }
    }

    let user: Option<UserPublicRow> = sqlx::query_as::<_, UserPublicRow>(
        r#"
        UPDATE app_user
        SET
          display_name = COALESCE($2, display_name),
          role         = COALESCE($3, role),
          is_active    = COALESCE($4, is_active),
          updated_at   = now()
        WHERE user_id = $1
        RETURNING user_id, email, display_name, role, is_active, created_at
        "#,
    )
    .bind(user_id)
    .bind(req.display_name.as_deref().map(str::trim))
    .bind(req.role)
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let Some(user) = user else {
        return Err(ApiError::NotFound("NOT_FOUND", "user not found".into()));
    };

    // Deactivation takes effect immediately.
    if !user.is_active {
        let _ = sqlx::query(
            r#"
            UPDATE session_token
            SET revoked_at = now()
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&state.db)
        .await;
    }

    Ok(Json(ApiOk { data: user }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;

    if req.new_password.len() < 8 {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "new password must be at least 8 characters".into(),
        ));
    }

    let password_hash = hash_password(&req.new_password).map_err(ApiError::Internal)?;

    let result = sqlx::query(
        r#"
        UPDATE app_user
        SET password_hash = $2, updated_at = now()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(&password_hash)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("NOT_FOUND", "user not found".into()));
    }

    // Force a fresh login everywhere after an admin reset.
    let _ = sqlx::query(
        r#"
        UPDATE session_token
        SET revoked_at = now()
        WHERE user_id = $1 AND revoked_at IS NULL
        "#,
    )
    .bind(user_id)
    .execute(&state.db)
    .await;

    Ok(Json(OkResponse::yes()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;

    if user_id == auth.user_id {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "You cannot delete your own account".into(),
        ));
    }

    let result = sqlx::query(r#"DELETE FROM app_user WHERE user_id = $1"#)
        .bind(user_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("NOT_FOUND", "user not found".into()));
    }

    Ok(Json(OkResponse::yes()))
}
