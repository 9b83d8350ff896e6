use crate::api::error::AppError;
use crate::entities::{entries, prelude::*};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use super::EntryService;
use super::types::EntryWithMedia;

impl EntryService {
    /// Every entry of `user_id`, newest first, each with its media.
    pub async fn list_entries(&self, user_id: &str) -> Result<Vec<EntryWithMedia>, AppError> {
        let rows = Entries::find()
            .filter(entries::Column::UserId.eq(user_id))
            .order_by_desc(entries::Column::CreatedAt)
            .order_by_desc(entries::Column::Id)
            .all(&self.db)
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for entry in rows {
            let media = match self.media.find_for_entry(&entry).await {
                Ok(media) => media,
                Err(e) => {
                    tracing::warn!(
                        "⚠️  Failed to load media for entry {}, returning it without media: {}",
                        entry.id,
                        e
                    );
                    Vec::new()
                }
            };
            result.push(EntryWithMedia { entry, media });
        }

        tracing::debug!("Listed {} entries for user {}", result.len(), user_id);
        Ok(result)
    }
}
