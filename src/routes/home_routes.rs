use axum::{Json, Router, extract::State, routing::get};

use crate::error::ApiError;
use crate::middleware::auth_context::AuthContext;
use crate::models::{AppState, role_to_string};

#[derive(serde::Serialize)]
pub struct HomeResponse {
    pub data: HomeData,
}

#[derive(serde::Serialize)]
pub struct HomeData {
    pub view: String,
    pub unread_notifications: i64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/home", get(home))
}

/// Landing payload for the SPA: which shell to render (admin calendar vs
/// client booking view) and the notification badge count.
pub async fn home(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<HomeResponse>, ApiError> {
    let view = role_to_string(auth.role);

    let unread_notifications: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM user_notification
        WHERE user_id = $1
          AND is_read = false
        "#,
    )
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(HomeResponse {
        data: HomeData {
            view,
            unread_notifications,
        },
    }))
}
