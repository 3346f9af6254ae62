use serde::Deserialize;
use uuid::Uuid;
use vidstat_core::models::{Video, VideoSnapshot};

use crate::dates::parse_date;
use crate::error::IngestError;

/// Top-level shape of the export file.
#[derive(Debug, Deserialize)]
pub struct Dataset {
    pub videos: Vec<VideoRecord>,
}

#[derive(Debug, Deserialize)]
pub struct VideoRecord {
    pub id: Uuid,
    pub creator_id: String,
    #[serde(default)]
    pub video_created_at: Option<String>,
    pub views_count: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub reports_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub snapshots: Vec<SnapshotRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotRecord {
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
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Dataset {
    pub fn parse(json: &str) -> Result<Self, IngestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn snapshot_count(&self) -> usize {
        self.videos.iter().map(|v| v.snapshots.len()).sum()
    }

    /// Convert every record into row models, coercing date fields.
    pub fn into_models(self) -> (Vec<Video>, Vec<VideoSnapshot>) {
        let mut videos = Vec::with_capacity(self.videos.len());
        let mut snapshots = Vec::with_capacity(self.snapshot_count());

        for record in self.videos {
            snapshots.extend(record.snapshots.iter().map(SnapshotRecord::to_model));
            videos.push(record.to_model());
        }

        (videos, snapshots)
    }
}

impl VideoRecord {
    pub fn to_model(&self) -> Video {
        Video {
            id: self.id,
            creator_id: self.creator_id.clone(),
            video_created_at: parse_date(self.video_created_at.as_deref(), "video_created_at"),
            views_count: self.views_count,
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            reports_count: self.reports_count,
            created_at: parse_date(self.created_at.as_deref(), "created_at"),
            updated_at: parse_date(self.updated_at.as_deref(), "updated_at"),
        }
    }
}

impl SnapshotRecord {
    pub fn to_model(&self) -> VideoSnapshot {
        VideoSnapshot {
            id: self.id,
            video_id: self.video_id,
            views_count: self.views_count,
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            reports_count: self.reports_count,
            delta_views_count: self.delta_views_count,
            delta_likes_count: self.delta_likes_count,
            delta_comments_count: self.delta_comments_count,
            delta_reports_count: self.delta_reports_count,
            created_at: parse_date(self.created_at.as_deref(), "snapshot.created_at"),
            updated_at: parse_date(self.updated_at.as_deref(), "snapshot.updated_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "videos": [
            {
                "id": "ecd8a4e4-1f24-4b97-a944-35d17078ce7c",
                "creator_id": "aca1061a9d324ecf8c3fa2bb32d7be63",
                "video_created_at": "2025-08-19T08:54:35+00:00",
                "views_count": 1500,
                "likes_count": 40,
                "comments_count": 3,
                "reports_count": 0,
                "created_at": "2025-11-26T11:00:08.983295+00:00",
                "updated_at": "not a date",
                "snapshots": [
                    {
                        "id": "b1f3b4c2-8f41-4f53-9c35-0d5d1a7c2e10",
                        "video_id": "ecd8a4e4-1f24-4b97-a944-35d17078ce7c",
                        "views_count": 1400,
                        "likes_count": 38,
                        "comments_count": 3,
                        "reports_count": 0,
                        "delta_views_count": 100,
                        "delta_likes_count": -2,
                        "delta_comments_count": 0,
                        "delta_reports_count": 0,
                        "created_at": "2025-11-26T11:00:09.053Z",
                        "updated_at": null
                    }
                ]
            },
            {
                "id": "0c6f8f8e-3c56-4f8e-9f0a-2b1e7f4f7a11",
                "creator_id": "other",
                "views_count": 0,
                "likes_count": 0,
                "comments_count": 0,
                "reports_count": 0
            }
        ]
    }"#;

    #[test]
    fn test_parse_sample_and_coerce_dates() {
        let dataset = Dataset::parse(SAMPLE).unwrap();
        assert_eq!(dataset.videos.len(), 2);
        assert_eq!(dataset.snapshot_count(), 1);

        let (videos, snapshots) = dataset.into_models();
        assert!(videos[0].video_created_at.is_some());
        assert!(videos[0].created_at.is_some());
        assert!(videos[0].updated_at.is_none(), "malformed date becomes NULL");
        assert!(videos[1].video_created_at.is_none());
        assert!(videos[1].created_at.is_none());

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].video_id, videos[0].id);
        assert!(snapshots[0].has_negative_delta());
        assert!(snapshots[0].updated_at.is_none());
    }

    #[test]
    fn test_missing_required_field_is_an_error() {
        let json = r#"{"videos": [{"id": "ecd8a4e4-1f24-4b97-a944-35d17078ce7c", "creator_id": "x"}]}"#;
        assert!(matches!(Dataset::parse(json), Err(IngestError::Json(_))));
    }

    #[test]
    fn test_invalid_identity_is_an_error() {
        let json = r#"{"videos": [{"id": "not-a-uuid", "creator_id": "x",
            "views_count": 0, "likes_count": 0, "comments_count": 0, "reports_count": 0}]}"#;
        assert!(matches!(Dataset::parse(json), Err(IngestError::Json(_))));
    }
}
