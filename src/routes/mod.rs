use crate::models::AppState;
use axum::Router;

pub mod appointment_routes;
pub mod auth_routes;
pub mod category_routes;
pub mod home_routes;
pub mod message_routes;
pub mod notification_routes;
pub mod service_routes;
pub mod user_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/auth", auth_routes::router())
        .nest("/api/v1/users", user_routes::router())
        .nest("/api/v1/categories", category_routes::router())
        .nest("/api/v1/services", service_routes::router())
        .nest("/api/v1/appointments", appointment_routes::router())
        .nest("/api/v1/messages", message_routes::router())
        .nest("/api/v1/notifications", notification_routes::router())
        .merge(home_routes::router())
        .with_state(state)
}
