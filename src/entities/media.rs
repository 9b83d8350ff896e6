use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One stored attachment. Rows are written only after the object upload
/// succeeded and are never updated in place.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub entry_id: String,
    /// Denormalized owner; older deployments lack this column
    pub user_id: String,
    pub file_name: String,
    pub original_name: String,
    pub file_type: String, // "image" | "video" | "audio" | "other"
    pub mime_type: String,
    pub file_size: i64,
    pub file_path: String,
    #[sea_orm(column_type = "Text")]
    pub public_url: String,
    pub metadata: Json,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::entries::Entity",
        from = "Column::EntryId",
        to = "super::entries::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Entries,
}

impl Related<super::entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
