use crate::api::error::AppError;
use crate::entities::{entries, prelude::*};
use crate::services::saga::delete_entry_rows;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use super::EntryService;

impl EntryService {
    /// Deletes an entry the user owns. Rows go first; stored objects are
    /// removed best-effort afterwards.
    pub async fn delete_entry(&self, user_id: &str, entry_id: &str) -> Result<(), AppError> {
        let entry = Entries::find_by_id(entry_id.to_string())
            .filter(entries::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry not found".to_string()))?;

        let media = self.media.find_for_entry(&entry).await?;

        delete_entry_rows(&self.db, self.media.as_ref(), &entry.id).await?;
        tracing::info!(
            "🗑️  Entry {} deleted with {} media rows",
            entry.id,
            media.len()
        );

        for item in &media {
            if let Err(e) = self.storage.delete_file(&item.file_path).await {
                tracing::warn!("Failed to delete object {}: {}", item.file_path, e);
            }
        }

        self.quota.spawn_recompute(user_id);
        Ok(())
    }
}
