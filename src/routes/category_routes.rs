// src/routes/category_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, CategoryRow, OkResponse, ROLE_ADMIN},
};

fn ensure_admin(auth: &AuthContext) -> Result<(), ApiError> {
    if auth.role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "FORBIDDEN",
            "Only admins can manage categories".into(),
        ))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/{category_id}", patch(patch_category).delete(delete_category))
}

pub async fn list_categories(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<Vec<CategoryRow>>, ApiError> {
    let rows: Vec<CategoryRow> = sqlx::query_as::<_, CategoryRow>(
        r#"
        SELECT category_id, name, description, created_at, updated_at
        FROM category
        ORDER BY name ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<ApiOk<CategoryRow>>, ApiError> {
    ensure_admin(&auth)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("VALIDATION_ERROR", "name is required".into()));
    }

    let row: CategoryRow = sqlx::query_as::<_, CategoryRow>(
        r#"
        INSERT INTO category (name, description)
        VALUES ($1, $2)
        RETURNING category_id, name, description, created_at, updated_at
        "#,
    )
    .bind(name)
    .bind(req.description.as_deref())
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::BadRequest("CATEGORY_CREATE_FAILED", format!("{e}")))?;

    Ok(Json(ApiOk { data: row }))
}

#[derive(Debug, Deserialize)]
pub struct PatchCategoryRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

pub async fn patch_category(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(category_id): Path<Uuid>,
    Json(req): Json<PatchCategoryRequest>,
) -> Result<Json<ApiOk<CategoryRow>>, ApiError> {
    ensure_admin(&auth)?;

    let row: Option<CategoryRow> = sqlx::query_as::<_, CategoryRow>(
        r#"
        UPDATE category
        SET
          name        = COALESCE($2, name),
          description = COALESCE($3, description),
          updated_at  = now()
        WHERE category_id = $1
        RETURNING category_id, name, description, created_at, updated_at
        "#,
    )
    .bind(category_id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.description.unwrap_or(None))
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::BadRequest("CATEGORY_UPDATE_FAILED", format!("{e}")))?;

    let Some(row) = row else {
        return Err(ApiError::NotFound("NOT_FOUND", "category not found".into()));
    };

    Ok(Json(ApiOk { data: row }))
}

pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(category_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    ensure_admin(&auth)?;

    let result = sqlx::query(r#"DELETE FROM category WHERE category_id = $1"#)
        .bind(category_id)
        .execute(&state.db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db) = e {
                if db.is_foreign_key_violation() {
                    return ApiError::Conflict(
                        "CATEGORY_IN_USE",
                        "Category still has services in it".into(),
                    );
                }
            }
            ApiError::Internal(format!("db error: {e}"))
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("NOT_FOUND", "category not found".into()));
    }

    Ok(Json(OkResponse::yes()))
}
