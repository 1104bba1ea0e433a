// src/routes/message_routes.rs
//
// Lightweight client <-> admin messaging. Every message hangs off the client
// account it concerns; direction records who wrote it.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, MessageDirection, MessageRow, OkResponse, ROLE_ADMIN},
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
            "Only admins can access other clients' messages".into(),
        ))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_messages).post(send_message))
        .route("/my", get(list_my_messages))
        .route("/{message_id}/read", post(mark_read))
        .route("/{message_id}", delete(delete_message))
}

/* ============================================================
   POST /  (client writes to the desk; admin replies to a client)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Admin replies name the client account; clients may omit it.
    pub user_id: Option<Uuid>,
    pub subject: Option<String>,
    pub body: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiOk<MessageRow>>, ApiError> {
    if req.body.trim().is_empty() {
        return Err(ApiError::BadRequest("VALIDATION_ERROR", "body is required".into()));
    }

    let (user_id, direction) = if is_admin(&auth) {
        let Some(target) = req.user_id else {
            return Err(ApiError::BadRequest(
                "VALIDATION_ERROR",
                "user_id is required for admin replies".into(),
            ));
        };
        (target, MessageDirection::Outbound)
    } else {
        (auth.user_id, MessageDirection::Inbound)
    };

    let row: MessageRow = sqlx::query_as::<_, MessageRow>(
        r#"
        INSERT INTO message (user_id, direction, subject, body)
        VALUES ($1, $2, $3, $4)
        RETURNING message_id, user_id, direction, subject, body, is_read, sent_at
        "#,
    )
    .bind(user_id)
    .bind(direction)
    .bind(req.subject.as_deref().map(str::trim))
    .bind(req.body.trim())
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db) = e {
            if db.is_foreign_key_violation() {
                return ApiError::NotFound("NOT_FOUND", "recipient not found".into());
            }
        }
        ApiError::Internal(format!("db error: {e}"))
    })?;

    Ok(Json(ApiOk { data: row }))
}

/* ============================================================
   GET /  (admin inbox; ?unread=true narrows it)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    pub unread: Option<bool>,
}

pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(q): Query<InboxQuery>,
) -> Result<Json<ApiOk<Vec<MessageRow>>>, ApiError> {
    ensure_admin(&auth)?;

    let rows: Vec<MessageRow> = sqlx::query_as::<_, MessageRow>(
        r#"
        SELECT message_id, user_id, direction, subject, body, is_read, sent_at
        FROM message
        WHERE ($1::boolean IS NULL OR is_read <> $1)
        ORDER BY sent_at DESC
        LIMIT 500
        "#,
    )
    .bind(q.unread)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk { data: rows }))
}

/* ============================================================
   GET /my  (the caller's own thread, both directions)
   ============================================================ */

pub async fn list_my_messages(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<MessageRow>>>, ApiError> {
    let rows: Vec<MessageRow> = sqlx::query_as::<_, MessageRow>(
        r#"
        SELECT message_id, user_id, direction, subject, body, is_read, sent_at
        FROM message
        WHERE user_id = $1
        ORDER BY sent_at ASC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(ApiOk { data: rows }))
}

/* ============================================================
   POST /{id}/read
   ============================================================ */

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(message_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    // Admins can mark anything; clients only their own thread.
    let result = if is_admin(&auth) {
        sqlx::query(r#"UPDATE message SET is_read = true WHERE message_id = $1"#)
            .bind(message_id)
            .execute(&state.db)
            .await
    } else {
        sqlx::query(
            r#"UPDATE message SET is_read = true WHERE message_id = $1 AND user_id = $2"#,
        )
        .bind(message_id)
        .bind(auth.user_id)
        .execute(&state.db)
        .await
    }
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("NOT_FOUND", "message not found".into()));
    }

    Ok(Json(OkResponse::yes()))
}

/* ============================================================
   DELETE /{id}  (admin)
   ============================================================ */

pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(message_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;

    let result = sqlx::query(r#"DELETE FROM message WHERE message_id = $1"#)
        .bind(message_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("NOT_FOUND", "message not found".into()));
    }

    Ok(Json(OkResponse::yes()))
}
