use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Connect the Postgres pool and bring the schema up to date. The pool is
/// the only long-lived handle; everything else borrows it through AppState.
pub async fn connect_pg(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
