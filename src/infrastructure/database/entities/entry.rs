//! `Entry` — one row per filesystem path ever observed (`spec.md` §3).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub path: String,
    pub parent_path: Option<String>,
    pub name: String,
    pub is_directory: bool,
    pub size: i64,
    pub modified_at: DateTimeUtc,
    pub permissions: Option<i32>,

    pub cached: bool,
    pub cached_at: Option<DateTimeUtc>,
    pub cache_job_id: Option<Uuid>,

    pub last_seen_session_id: Uuid,

    /// See `domain::metadata::EntryMetadata`.
    pub metadata: JsonValue,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
