use sqlx::PgPool;
use uuid::Uuid;

/// Service-catalog lifecycle events are the only thing that fans out to
/// users. Appointment and status mutations intentionally stay silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEvent {
    Created,
    Updated,
    Deleted,
}

impl ServiceEvent {
    fn code(self) -> i16 {
        match self {
            ServiceEvent::Created => 0,
            ServiceEvent::Updated => 1,
            ServiceEvent::Deleted => 2,
        }
    }

    fn title(self, service_name: &str) -> String {
        match self {
            ServiceEvent::Created => format!("New service: {service_name}"),
            ServiceEvent::Updated => format!("Service updated: {service_name}"),
            ServiceEvent::Deleted => format!("Service removed: {service_name}"),
        }
    }

    fn body(self, service_name: &str) -> String {
        match self {
            ServiceEvent::Created => {
                format!("{service_name} is now available for booking.")
            }
            ServiceEvent::Updated => {
                format!("Details for {service_name} have changed. Check your upcoming appointments.")
            }
            ServiceEvent::Deleted => {
                format!("{service_name} is no longer offered.")
            }
        }
    }
}

/// Fire-and-forget broadcast. Runs detached from the request that triggered
/// it: the catalog mutation has already committed and is never rolled back,
/// whatever happens here. At-most-once delivery.
pub fn spawn_fan_out(pool: PgPool, event: ServiceEvent, service_name: String) {
    tokio::spawn(async move {
        if let Err(e) = fan_out(&pool, event, &service_name).await {
            tracing::warn!(%service_name, "notification fan-out failed: {e}");
        }
    });
}

async fn fan_out(pool: &PgPool, event: ServiceEvent, service_name: &str) -> Result<(), sqlx::Error> {
    let notification_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO notification (event, title, body)
        VALUES ($1, $2, $3)
        RETURNING notification_id
        "#,
    )
    .bind(event.code())
    .bind(event.title(service_name))
    .bind(event.body(service_name))
    .fetch_one(pool)
    .await?;

    let user_ids: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT user_id
        FROM app_user
        WHERE is_active = true
        "#,
    )
    .fetch_all(pool)
    .await?;

    // One link row per recipient. A failed insert skips that recipient only.
    let total = user_ids.len();
    let mut delivered = 0usize;
    for user_id in user_ids {
        let res = sqlx::query(
            r#"
            INSERT INTO user_notification (user_id, notification_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, notification_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(notification_id)
        .execute(pool)
        .await;

        match res {
            Ok(_) => delivered += 1,
            Err(e) => {
                tracing::warn!(%user_id, %notification_id, "notification link insert failed: {e}");
            }
        }
    }

    tracing::info!(%notification_id, delivered, total, "notification fan-out done");
    Ok(())
}
