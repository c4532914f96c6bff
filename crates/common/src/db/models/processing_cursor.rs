//! Explicit continuation cursor, one row per (job, file)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dispatch_cursors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub job_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub file_id: Uuid,

    /// Lowest chunk index without a clean completed row
    pub next_chunk_index: i32,

    pub total_chunks: i32,

    pub completed: bool,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
