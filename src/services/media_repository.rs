use crate::entities::{entries, media};
use crate::infrastructure::database::MediaSchema;
use async_trait::async_trait;
use sea_orm::sea_query::Alias;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use std::sync::Arc;

/// Media persistence, abstracted over the two `media` table layouts.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    fn schema(&self) -> MediaSchema;

    async fn insert(&self, row: media::Model) -> Result<media::Model, DbErr>;

    /// Media of one entry, oldest first
    async fn find_for_entry(&self, entry: &entries::Model) -> Result<Vec<media::Model>, DbErr>;

    async fn delete_for_entry(&self, entry_id: &str) -> Result<u64, DbErr>;

    /// Sum of `file_size` over every media row the user owns
    async fn total_bytes_for_user(&self, user_id: &str) -> Result<i64, DbErr>;
}

pub fn for_schema(db: DatabaseConnection, schema: MediaSchema) -> Arc<dyn MediaRepository> {
    match schema {
        MediaSchema::Denormalized => Arc::new(DenormalizedMediaRepository::new(db)),
        MediaSchema::Legacy => Arc::new(LegacyMediaRepository::new(db)),
    }
}

#[derive(Debug, FromQueryResult)]
struct UsageTotal {
    total: Option<i64>,
}

fn into_active(row: &media::Model, with_user: bool) -> media::ActiveModel {
    use sea_orm::ActiveValue::{NotSet, Set};

    media::ActiveModel {
        id: Set(row.id.clone()),
        entry_id: Set(row.entry_id.clone()),
        user_id: if with_user {
            Set(row.user_id.clone())
        } else {
            NotSet
        },
        file_name: Set(row.file_name.clone()),
        original_name: Set(row.original_name.clone()),
        file_type: Set(row.file_type.clone()),
        mime_type: Set(row.mime_type.clone()),
        file_size: Set(row.file_size),
        file_path: Set(row.file_path.clone()),
        public_url: Set(row.public_url.clone()),
        metadata: Set(row.metadata.clone()),
        created_at: Set(row.created_at),
    }
}

pub struct DenormalizedMediaRepository {
    db: DatabaseConnection,
}

impl DenormalizedMediaRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MediaRepository for DenormalizedMediaRepository {
    fn schema(&self) -> MediaSchema {
        MediaSchema::Denormalized
    }

    async fn insert(&self, row: media::Model) -> Result<media::Model, DbErr> {
        media::Entity::insert(into_active(&row, true))
            .exec_without_returning(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_for_entry(&self, entry: &entries::Model) -> Result<Vec<media::Model>, DbErr> {
        media::Entity::find()
            .filter(media::Column::UserId.eq(&entry.user_id))
            .filter(media::Column::EntryId.eq(&entry.id))
            .order_by_asc(media::Column::CreatedAt)
            .order_by_asc(media::Column::Id)
            .all(&self.db)
            .await
    }

    async fn delete_for_entry(&self, entry_id: &str) -> Result<u64, DbErr> {
        let res = media::Entity::delete_many()
            .filter(media::Column::EntryId.eq(entry_id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    async fn total_bytes_for_user(&self, user_id: &str) -> Result<i64, DbErr> {
        let row = media::Entity::find()
            .select_only()
            .column_as(
                media::Column::FileSize.sum().cast_as(Alias::new("BIGINT")),
                "total",
            )
            .filter(media::Column::UserId.eq(user_id))
            .into_model::<UsageTotal>()
            .one(&self.db)
            .await?;

        Ok(row.and_then(|r| r.total).unwrap_or(0))
    }
}

/// Media row as stored before `user_id` was denormalized onto it
#[derive(Debug, FromQueryResult)]
struct LegacyMediaRow {
    id: String,
    entry_id: String,
    file_name: String,
    original_name: String,
    file_type: String,
    mime_type: String,
    file_size: i64,
    file_path: String,
    public_url: String,
    metadata: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl LegacyMediaRow {
    fn with_owner(self, user_id: &str) -> media::Model {
        media::Model {
            id: self.id,
            entry_id: self.entry_id,
            user_id: user_id.to_string(),
            file_name: self.file_name,
            original_name: self.original_name,
            file_type: self.file_type,
            mime_type: self.mime_type,
            file_size: self.file_size,
            file_path: self.file_path,
            public_url: self.public_url,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}

pub struct LegacyMediaRepository {
    db: DatabaseConnection,
}

impl LegacyMediaRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MediaRepository for LegacyMediaRepository {
    fn schema(&self) -> MediaSchema {
        MediaSchema::Legacy
    }

    async fn insert(&self, row: media::Model) -> Result<media::Model, DbErr> {
        media::Entity::insert(into_active(&row, false))
            .exec_without_returning(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_for_entry(&self, entry: &entries::Model) -> Result<Vec<media::Model>, DbErr> {
        let rows = media::Entity::find()
            .select_only()
            .columns([
                media::Column::Id,
                media::Column::EntryId,
                media::Column::FileName,
                media::Column::OriginalName,
                media::Column::FileType,
                media::Column::MimeType,
                media::Column::FileSize,
                media::Column::FilePath,
                media::Column::PublicUrl,
                media::Column::Metadata,
                media::Column::CreatedAt,
            ])
            .filter(media::Column::EntryId.eq(&entry.id))
            .order_by_asc(media::Column::CreatedAt)
            .order_by_asc(media::Column::Id)
            .into_model::<LegacyMediaRow>()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.with_owner(&entry.user_id))
            .collect())
    }

    async fn delete_for_entry(&self, entry_id: &str) -> Result<u64, DbErr> {
        let res = media::Entity::delete_many()
            .filter(media::Column::EntryId.eq(entry_id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    async fn total_bytes_for_user(&self, user_id: &str) -> Result<i64, DbErr> {
        let row = media::Entity::find()
            .select_only()
            .column_as(
                media::Column::FileSize.sum().cast_as(Alias::new("BIGINT")),
                "total",
            )
            .join(JoinType::InnerJoin, media::Relation::Entries.def())
            .filter(entries::Column::UserId.eq(user_id))
            .into_model::<UsageTotal>()
            .one(&self.db)
            .await?;

        Ok(row.and_then(|r| r.total).unwrap_or(0))
    }
}
