//! Uploaded dispatch source file

use crate::outcome::FileType;
use chrono::{Datelike, NaiveDate};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dispatch_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub file_name: String,

    /// Public object storage URL
    #[sea_orm(column_type = "Text")]
    pub file_url: String,

    /// Declared size in bytes
    pub file_size: i64,

    /// LETTURE | ANAGRAFICA | AGGR_IP | IP_DETAIL
    #[sea_orm(column_type = "Text")]
    pub file_type: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub zone_code: Option<String>,

    /// Target month, `YYYY-MM` or `YYYY-MM-DD`
    #[sea_orm(column_type = "Text", nullable)]
    pub month_reference: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Parsed file type
    pub fn kind(&self) -> Result<FileType, String> {
        self.file_type.parse()
    }

    /// Declared size in megabytes
    pub fn size_mb(&self) -> f64 {
        self.file_size.max(0) as f64 / (1024.0 * 1024.0)
    }

    /// Month number (1-12) of the month reference, if it parses
    pub fn month_number(&self) -> Option<u32> {
        let raw = self.month_reference.as_deref()?.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"))
            .ok()
            .map(|d| d.month())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::intermediate_result::Entity")]
    IntermediateResults,
}

impl Related<super::intermediate_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IntermediateResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(month: Option<&str>, size: i64) -> Model {
        Model {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            file_name: "letture.zip".into(),
            file_url: "https://example.test/storage/v1/object/public/b/letture.zip".into(),
            file_size: size,
            file_type: "LETTURE".into(),
            zone_code: Some("NORD".into()),
            month_reference: month.map(str::to_string),
            created_at: chrono::Utc::now().into(),
        }
    }

    #[test]
    fn test_month_number() {
        assert_eq!(file(Some("2024-11"), 0).month_number(), Some(11));
        assert_eq!(file(Some("2024-03-01"), 0).month_number(), Some(3));
        assert_eq!(file(Some("novembre"), 0).month_number(), None);
        assert_eq!(file(None, 0).month_number(), None);
    }

    #[test]
    fn test_size_mb() {
        assert_eq!(file(None, 60 * 1024 * 1024).size_mb(), 60.0);
        assert_eq!(file(None, -1).size_mb(), 0.0);
    }

    #[test]
    fn test_kind() {
        assert_eq!(file(None, 0).kind(), Ok(FileType::Letture));
    }
}
