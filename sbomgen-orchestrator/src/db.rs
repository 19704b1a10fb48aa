use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create generation_requests table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS generation_requests (
            id UUID PRIMARY KEY,
            identifier VARCHAR(255) NOT NULL,
            request_type VARCHAR(50) NOT NULL,
            config JSONB NOT NULL,
            status VARCHAR(50) NOT NULL,
            result VARCHAR(50),
            reason TEXT,
            creation_time TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create work_objects table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS work_objects (
            id UUID PRIMARY KEY,
            request_type VARCHAR(50) NOT NULL,
            config JSONB NOT NULL,
            status VARCHAR(50) NOT NULL,
            result VARCHAR(50),
            reason TEXT,
            resolved JSONB,
            trace_id VARCHAR(64) NOT NULL,
            version BIGINT NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create leader_leases table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leader_leases (
            lock_key VARCHAR(255) PRIMARY KEY,
            holder VARCHAR(255) NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create manifests table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manifests (
            id UUID PRIMARY KEY,
            request_id UUID NOT NULL,
            product_index INTEGER NOT NULL,
            bom JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            UNIQUE (request_id, product_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for the admission scheduler's FIFO claim and the
    // controller's active-set queries
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_generation_requests_status_creation
         ON generation_requests(status, creation_time)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_work_objects_status ON work_objects(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_manifests_request_id ON manifests(request_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
