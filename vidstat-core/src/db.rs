use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Tables the analytics pipeline is allowed to read.
pub const ANALYTICS_TABLES: &[&str] = &["videos", "video_snapshots"];

pub const CREATE_VIDEOS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS videos (
        id UUID PRIMARY KEY,
        creator_id TEXT NOT NULL,
        video_created_at TIMESTAMPTZ,
        views_count BIGINT NOT NULL DEFAULT 0,
        likes_count BIGINT NOT NULL DEFAULT 0,
        comments_count BIGINT NOT NULL DEFAULT 0,
        reports_count BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ,
        updated_at TIMESTAMPTZ
    )
";

pub const CREATE_VIDEO_SNAPSHOTS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS video_snapshots (
        id UUID PRIMARY KEY,
        video_id UUID NOT NULL REFERENCES videos(id),
        views_count BIGINT NOT NULL DEFAULT 0,
        likes_count BIGINT NOT NULL DEFAULT 0,
        comments_count BIGINT NOT NULL DEFAULT 0,
        reports_count BIGINT NOT NULL DEFAULT 0,
        delta_views_count BIGINT NOT NULL DEFAULT 0,
        delta_likes_count BIGINT NOT NULL DEFAULT 0,
        delta_comments_count BIGINT NOT NULL DEFAULT 0,
        delta_reports_count BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ,
        updated_at TIMESTAMPTZ
    )
";

pub const CREATE_SNAPSHOT_INDEXES_SQL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_video_snapshots_video_id ON video_snapshots(video_id)",
    "CREATE INDEX IF NOT EXISTS idx_video_snapshots_created_at ON video_snapshots(created_at)",
];

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .connect(&config.connection_url())
        .await
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

/// Returns the analytics tables that are missing from the current schema.
pub async fn missing_tables(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    let present: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name::text FROM information_schema.tables
         WHERE table_schema = current_schema() AND table_name = ANY($1)",
    )
    .bind(ANALYTICS_TABLES)
    .fetch_all(pool)
    .await?;

    Ok(ANALYTICS_TABLES
        .iter()
        .filter(|t| !present.iter().any(|(p,)| p == *t))
        .map(|t| t.to_string())
        .collect())
}

/// Creates both analytics tables when absent. Bootstrap only: existing
/// tables are never altered.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_VIDEOS_TABLE_SQL).execute(pool).await?;
    sqlx::query(CREATE_VIDEO_SNAPSHOTS_TABLE_SQL)
        .execute(pool)
        .await?;
    for sql in CREATE_SNAPSHOT_INDEXES_SQL {
        sqlx::query(sql).execute(pool).await?;
    }
    Ok(())
}
