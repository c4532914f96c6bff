//! Per-chunk processing result

use crate::outcome::FileOutcome;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Result row status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Completed,
    Failed,
}

impl From<String> for ResultStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "completed" => ResultStatus::Completed,
            _ => ResultStatus::Failed,
        }
    }
}

impl From<ResultStatus> for String {
    fn from(status: ResultStatus) -> Self {
        match status {
            ResultStatus::Completed => "completed".to_string(),
            ResultStatus::Failed => "failed".to_string(),
        }
    }
}

/// One row per (job, file, chunk). `(job_id, file_id, chunk_index)` is unique.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dispatch_intermediate_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub job_id: Uuid,

    pub user_id: Uuid,

    pub file_id: Uuid,

    pub chunk_index: i32,

    /// `<filetype>_chunk_<index>`
    #[sea_orm(column_type = "Text")]
    pub result_type: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub zone_code: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// Tagged `FileOutcome`; `null` for failed rows
    #[sea_orm(column_type = "JsonBinary")]
    pub data: serde_json::Value,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub processing_time_ms: i64,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn result_status(&self) -> ResultStatus {
        ResultStatus::from(self.status.clone())
    }

    /// Decoded payload, `None` for failed rows or foreign shapes
    pub fn outcome(&self) -> Option<FileOutcome> {
        serde_json::from_value(self.data.clone()).ok()
    }

    /// Completed and not cut short by the deadline
    pub fn is_clean_completion(&self) -> bool {
        self.result_status() == ResultStatus::Completed
            && self.outcome().map(|o| !o.is_partial()).unwrap_or(false)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::dispatch_file::Entity",
        from = "Column::FileId",
        to = "super::dispatch_file::Column::Id"
    )]
    DispatchFile,
}

impl Related<super::dispatch_file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DispatchFile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Values for a new or replacement chunk row
#[derive(Debug, Clone)]
pub struct NewChunkResult {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub file_id: Uuid,
    pub chunk_index: u32,
    pub result_type: String,
    pub zone_code: Option<String>,
    pub status: ResultStatus,
    pub outcome: Option<FileOutcome>,
    pub error_message: Option<String>,
    pub processing_time_ms: i64,
}

impl NewChunkResult {
    /// JSON stored in the `data` column
    pub fn data(&self) -> serde_json::Value {
        self.outcome
            .as_ref()
            .and_then(|o| serde_json::to_value(o).ok())
            .unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::PodBatch;

    fn row(status: &str, outcome: Option<FileOutcome>) -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            file_id: Uuid::new_v4(),
            chunk_index: 0,
            result_type: "letture_chunk_0".into(),
            zone_code: None,
            status: status.into(),
            data: outcome
                .map(|o| serde_json::to_value(o).unwrap())
                .unwrap_or(serde_json::Value::Null),
            error_message: None,
            processing_time_ms: 10,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(ResultStatus::from("completed".to_string()), ResultStatus::Completed);
        assert_eq!(ResultStatus::from("anything".to_string()), ResultStatus::Failed);
        assert_eq!(String::from(ResultStatus::Failed), "failed");
    }

    #[test]
    fn test_clean_completion() {
        let done = FileOutcome::Letture(PodBatch { success: true, ..Default::default() });
        let partial = FileOutcome::Letture(PodBatch {
            success: true,
            timed_out: true,
            ..Default::default()
        });

        assert!(row("completed", Some(done.clone())).is_clean_completion());
        assert!(!row("completed", Some(partial)).is_clean_completion());
        assert!(!row("failed", Some(done)).is_clean_completion());
        assert!(!row("completed", None).is_clean_completion());
    }
}
