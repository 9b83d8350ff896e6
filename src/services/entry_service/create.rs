use crate::api::error::AppError;
use crate::entities::{entries, media, prelude::*};
use crate::services::saga::{Compensation, CompensationLog};
use crate::services::storage::StorageError;
use crate::utils::validation::{normalize_content_type, sanitize_filename, storage_extension};
use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::json;
use uuid::Uuid;

use super::EntryService;
use super::types::{CreatedEntry, IncomingFile, MediaKind, NewEntry};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Why a single file did not become a media row
#[derive(Debug)]
enum FileFailure {
    /// Logged and skipped; the rest of the batch continues
    Skipped(String),
    /// The whole entry is invalid and must be unwound
    Fatal(String),
}

fn is_connection_error(err: &DbErr) -> bool {
    matches!(err, DbErr::ConnectionAcquire(_) | DbErr::Conn(_))
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// `{entry_id}/{epoch_millis}-{suffix}.{ext}`
pub fn storage_key(entry_id: &str, original_name: &str) -> String {
    format!(
        "{}/{}-{}.{}",
        entry_id,
        Utc::now().timestamp_millis(),
        random_suffix(),
        storage_extension(original_name)
    )
}

/// Client content type when usable, otherwise sniffed from the bytes.
/// Returns the MIME type and where it came from.
fn resolve_content_type(file: &IncomingFile) -> (String, &'static str) {
    if let Some(ct) = file.content_type.as_deref().and_then(normalize_content_type)
        && ct != DEFAULT_CONTENT_TYPE
    {
        return (ct, "client");
    }

    match infer::get(&file.data) {
        Some(kind) => (kind.mime_type().to_string(), "sniffed"),
        None => (DEFAULT_CONTENT_TYPE.to_string(), "default"),
    }
}

impl EntryService {
    pub async fn create_entry(
        &self,
        user_id: &str,
        new_entry: NewEntry,
    ) -> Result<CreatedEntry, AppError> {
        new_entry.check()?;

        if let Some(token) = new_entry.submission_id.as_deref() {
            let fresh = self
                .dedup
                .check_and_record(token, user_id, Utc::now(), self.config.submission_window())
                .await;
            if !fresh {
                tracing::warn!(
                    "🔁 Duplicate submission token {} from user {}",
                    token,
                    user_id
                );
                return Err(AppError::DuplicateSubmission(
                    "This entry has already been submitted".to_string(),
                ));
            }
        }

        self.reject_near_duplicate(user_id, &new_entry).await?;

        if let Err(e) = self.quota.ensure_usage_record(user_id).await {
            tracing::warn!("⚠️  Could not initialise usage record for {}: {}", user_id, e);
        }
        self.quota
            .ensure_capacity(user_id, new_entry.total_bytes())
            .await?;

        let now = Utc::now();
        let entry = entries::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            title: Set(new_entry.title.clone()),
            description: Set(new_entry.description.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        tracing::info!("📝 Entry {} created for user {}", entry.id, user_id);

        let mut saga = CompensationLog::new();
        saga.record(Compensation::DeleteEntry {
            entry_id: entry.id.clone(),
        });

        let media = match self.store_files(&entry, new_entry.files, &mut saga).await {
            Ok(media) => media,
            Err(reason) => {
                let report = saga
                    .unwind(&self.db, self.media.as_ref(), self.storage.as_ref())
                    .await;
                tracing::error!(
                    "❌ Entry {} rolled back ({} compensations applied, {} failed): {}",
                    entry.id,
                    report.succeeded,
                    report.failed,
                    reason
                );
                return Err(AppError::Internal(reason));
            }
        };

        self.quota.spawn_recompute(user_id);

        Ok(CreatedEntry { entry, media })
    }

    async fn reject_near_duplicate(
        &self,
        user_id: &str,
        new_entry: &NewEntry,
    ) -> Result<(), AppError> {
        let recent = Entries::find()
            .filter(entries::Column::UserId.eq(user_id))
            .order_by_desc(entries::Column::CreatedAt)
            .limit(self.config.near_duplicate_lookback)
            .all(&self.db)
            .await?;

        let cutoff = Utc::now() - self.config.near_duplicate_window();
        let duplicate = recent.iter().find(|e| {
            e.title == new_entry.title
                && e.description == new_entry.description
                && e.created_at >= cutoff
        });

        if let Some(existing) = duplicate {
            tracing::warn!(
                "🔁 Near-duplicate of entry {} rejected for user {}",
                existing.id,
                user_id
            );
            return Err(AppError::DuplicateSubmission(
                "An identical entry was just created. Please wait before submitting again."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Uploads files in submission order. Only a fatal failure ends the loop.
    async fn store_files(
        &self,
        entry: &entries::Model,
        files: Vec<IncomingFile>,
        saga: &mut CompensationLog,
    ) -> Result<Vec<media::Model>, String> {
        let total = files.len();
        let mut stored = Vec::with_capacity(total);

        for (index, file) in files.into_iter().enumerate() {
            if file.data.is_empty() {
                tracing::debug!("Skipping empty file part {} for entry {}", index, entry.id);
                continue;
            }

            match self.store_file(entry, file, saga).await {
                Ok(row) => stored.push(row),
                Err(FileFailure::Skipped(reason)) => {
                    tracing::warn!(
                        "⚠️  File {}/{} of entry {} skipped: {}",
                        index + 1,
                        total,
                        entry.id,
                        reason
                    );
                }
                Err(FileFailure::Fatal(reason)) => return Err(reason),
            }
        }

        tracing::info!(
            "📎 Entry {}: {} of {} files stored",
            entry.id,
            stored.len(),
            total
        );
        Ok(stored)
    }

    async fn store_file(
        &self,
        entry: &entries::Model,
        file: IncomingFile,
        saga: &mut CompensationLog,
    ) -> Result<media::Model, FileFailure> {
        let original_name = sanitize_filename(&file.original_name);
        let key = storage_key(&entry.id, &original_name);
        let (mime_type, mime_source) = resolve_content_type(&file);
        let size = file.size();

        let public_url = match self
            .storage
            .put_object(&key, file.data, &mime_type)
            .await
        {
            Ok(url) => url,
            Err(e) if StorageError::is_unavailable(&e) => {
                return Err(FileFailure::Fatal(format!("upload of {} failed: {}", key, e)));
            }
            Err(e) => {
                return Err(FileFailure::Skipped(format!("upload of {} failed: {}", key, e)));
            }
        };

        let file_name = key.rsplit('/').next().unwrap_or(&key).to_string();
        let row = media::Model {
            id: Uuid::new_v4().to_string(),
            entry_id: entry.id.clone(),
            user_id: entry.user_id.clone(),
            file_name,
            original_name,
            file_type: MediaKind::from_mime(&mime_type).as_str().to_string(),
            mime_type,
            file_size: size,
            file_path: key.clone(),
            public_url,
            metadata: json!({
                "extension": storage_extension(&key),
                "mimeSource": mime_source,
            }),
            created_at: Utc::now(),
        };

        match self.media.insert(row).await {
            Ok(row) => {
                saga.record(Compensation::DeleteObject { key });
                Ok(row)
            }
            Err(e) => {
                // The object has no row pointing at it; drop it now
                if let Err(cleanup) = self.storage.delete_file(&key).await {
                    tracing::warn!("Failed to delete orphaned object {}: {}", key, cleanup);
                }
                if is_connection_error(&e) {
                    Err(FileFailure::Fatal(format!("media row for {} failed: {}", key, e)))
                } else {
                    Err(FileFailure::Skipped(format!("media row for {} failed: {}", key, e)))
                }
            }
        }
    }
}
