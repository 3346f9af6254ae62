use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::path::Path;
use vidstat_core::db;
use vidstat_core::models::{Video, VideoSnapshot};

use crate::error::IngestError;
use crate::records::Dataset;

/// PostgreSQL accepts at most 65535 bind parameters per statement; snapshots
/// bind 12 per row.
const MAX_BATCH_SIZE: usize = 5000;

/// Outcome of one loader run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Row count found in `videos` when the run was skipped.
    pub skipped_existing: Option<i64>,
    pub videos_in_file: usize,
    pub snapshots_in_file: usize,
    pub videos_inserted: u64,
    pub snapshots_inserted: u64,
    pub negative_deltas: usize,
}

impl LoadReport {
    pub fn skipped(existing: i64) -> Self {
        Self {
            skipped_existing: Some(existing),
            ..Self::default()
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.skipped_existing.is_some()
    }
}

/// Seed the analytics tables from `path` unless `videos` already has rows.
pub async fn load_file(
    pool: &PgPool,
    path: &Path,
    batch_size: usize,
) -> Result<LoadReport, IngestError> {
    db::ensure_schema(pool).await?;

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM videos")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        tracing::info!(existing = existing, "Videos already loaded, skipping import");
        return Ok(LoadReport::skipped(existing));
    }

    tracing::info!(path = %path.display(), "Database is empty, starting import");

    if !path.exists() {
        tracing::error!(path = %path.display(), "Data file not found");
        return Err(IngestError::MissingFile(path.to_path_buf()));
    }

    let json = tokio::fs::read_to_string(path).await?;
    let dataset = Dataset::parse(&json)?;

    load_dataset(pool, dataset, batch_size).await
}

/// Insert every record of `dataset` in one transaction. Identities already
/// present are left untouched.
pub async fn load_dataset(
    pool: &PgPool,
    dataset: Dataset,
    batch_size: usize,
) -> Result<LoadReport, IngestError> {
    let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
    let (videos, snapshots) = dataset.into_models();

    let negative_deltas = snapshots.iter().filter(|s| s.has_negative_delta()).count();
    if negative_deltas > 0 {
        tracing::warn!(
            count = negative_deltas,
            "Snapshots with negative delta counters, stored unchanged"
        );
    }

    tracing::info!(
        videos = videos.len(),
        snapshots = snapshots.len(),
        "Inserting records"
    );

    let mut tx = pool.begin().await?;
    let videos_inserted = insert_videos(&mut tx, &videos, batch_size).await?;
    let snapshots_inserted = insert_snapshots(&mut tx, &snapshots, batch_size).await?;
    tx.commit().await?;

    let report = LoadReport {
        skipped_existing: None,
        videos_in_file: videos.len(),
        snapshots_in_file: snapshots.len(),
        videos_inserted,
        snapshots_inserted,
        negative_deltas,
    };

    tracing::info!(
        videos_inserted = report.videos_inserted,
        snapshots_inserted = report.snapshots_inserted,
        "Import finished"
    );

    Ok(report)
}

async fn insert_videos(
    conn: &mut PgConnection,
    videos: &[Video],
    batch_size: usize,
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;

    for chunk in videos.chunks(batch_size) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO videos (id, creator_id, video_created_at, views_count, likes_count, \
             comments_count, reports_count, created_at, updated_at) ",
        );
        qb.push_values(chunk, |mut row, v| {
            row.push_bind(v.id)
                .push_bind(&v.creator_id)
                .push_bind(v.video_created_at)
                .push_bind(v.views_count)
                .push_bind(v.likes_count)
                .push_bind(v.comments_count)
                .push_bind(v.reports_count)
                .push_bind(v.created_at)
                .push_bind(v.updated_at);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");

        inserted += qb.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}

async fn insert_snapshots(
    conn: &mut PgConnection,
    snapshots: &[VideoSnapshot],
    batch_size: usize,
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;

    for chunk in snapshots.chunks(batch_size) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO video_snapshots (id, video_id, views_count, likes_count, comments_count, \
             reports_count, delta_views_count, delta_likes_count, delta_comments_count, \
             delta_reports_count, created_at, updated_at) ",
        );
        qb.push_values(chunk, |mut row, s| {
            row.push_bind(s.id)
                .push_bind(s.video_id)
                .push_bind(s.views_count)
                .push_bind(s.likes_count)
                .push_bind(s.comments_count)
                .push_bind(s.reports_count)
                .push_bind(s.delta_views_count)
                .push_bind(s.delta_likes_count)
                .push_bind(s.delta_comments_count)
                .push_bind(s.delta_reports_count)
                .push_bind(s.created_at)
                .push_bind(s.updated_at);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");

        inserted += qb.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_report() {
        let report = LoadReport::skipped(12);
        assert!(report.was_skipped());
        assert_eq!(report.videos_inserted, 0);
        assert_eq!(report.snapshots_inserted, 0);
        assert!(!LoadReport::default().was_skipped());
    }
}
