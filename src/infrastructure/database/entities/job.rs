//! `Job` — one cache-warm request (`spec.md` §3).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Immutable snapshot of the file selection at creation time.
    pub file_paths: JsonValue,
    /// Directory paths supplied at creation, kept for reporting only.
    pub directory_paths: JsonValue,

    pub profile_id: Uuid,

    pub total_files: i64,
    pub completed_files: i64,
    pub failed_files: i64,
    pub completed_size_bytes: i64,

    pub status: String,
    pub worker_id: Option<String>,

    pub created_at: DateTimeUtc,
    pub started_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::job_item::Entity")]
    JobItem,
}

impl Related<super::job_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
