use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An hourly measurement of a video's counters. The `delta_*` fields hold the
/// increase since the previous snapshot of the same video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoSnapshot {
    pub id: Uuid,
    pub video_id: Uuid,
    pub views_count: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reports_count: i64,
    pub delta_views_count: i64,
    pub delta_likes_count: i64,
    pub delta_comments_count: i64,
    pub delta_reports_count: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl VideoSnapshot {
    /// True when any delta counter went down, which the source data does not
    /// rule out.
    pub fn has_negative_delta(&self) -> bool {
        self.delta_views_count < 0
            || self.delta_likes_count < 0
            || self.delta_comments_count < 0
            || self.delta_reports_count < 0
    }
}
