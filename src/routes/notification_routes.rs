// src/routes/notification_routes.rs
//
// Read side of the service-event fan-out: each user sees their own link
// rows joined to the broadcast they point at.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, OkResponse, UserNotificationRow},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my", get(list_my_notifications))
        .route("/{user_notification_id}/read", post(mark_read))
        .route("/read_all", post(mark_all_read))
}

pub async fn list_my_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<UserNotificationRow>>>, ApiError> {
    let rows: Vec<UserNotificationRow> = sqlx::query_as::<_, UserNotificationRow>(
        r#"
        SELECT
          un.user_notification_id,
          n.notification_id,
          n.event,
          n.title,
          n.body,
          un.is_read,
          n.created_at
        FROM user_notification un
        JOIN notification n ON n.notification_id = un.notification_id
        WHERE un.user_id = $1
        ORDER BY n.created_at DESC
        LIMIT 100
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk { data: rows }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_notification_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let result = sqlx::query(
        r#"
        UPDATE user_notification
        SET is_read = true
        WHERE user_notification_id = $1
          AND user_id = $2
        "#,
    )
    .bind(user_notification_id)
    .bind(auth.user_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("NOT_FOUND", "notification not found".into()));
    }

    Ok(Json(OkResponse::yes()))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OkResponse>, ApiError> {
    sqlx::query(
        r#"
        UPDATE user_notification
        SET is_read = true
        WHERE user_id = $1
          AND is_read = false
        "#,
    )
    .bind(auth.user_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(OkResponse::yes()))
}
