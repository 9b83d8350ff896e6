use crate::api::error::AppError;
use crate::entities::storage_usage;
use crate::services::media_repository::MediaRepository;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub bytes_used: i64,
    pub quota_bytes: i64,
    pub available: i64,
    pub plan: String,
}

/// Per-user storage accounting. Usage is always the live sum of media bytes;
/// the `storage_usage` row is a recomputed snapshot, never a running counter.
#[derive(Clone)]
pub struct QuotaService {
    db: DatabaseConnection,
    media: Arc<dyn MediaRepository>,
    quota_bytes: i64,
    plan: String,
}

impl QuotaService {
    pub fn new(
        db: DatabaseConnection,
        media: Arc<dyn MediaRepository>,
        quota_bytes: i64,
        plan: String,
    ) -> Self {
        Self {
            db,
            media,
            quota_bytes,
            plan,
        }
    }

    pub fn quota_bytes(&self) -> i64 {
        self.quota_bytes
    }

    /// Live usage; a failing aggregate counts as zero so accounting trouble
    /// never blocks entry creation.
    pub async fn current_usage(&self, user_id: &str) -> i64 {
        match self.media.total_bytes_for_user(user_id).await {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(
                    "⚠️  Usage aggregate failed for user {}, treating usage as 0: {}",
                    user_id,
                    e
                );
                0
            }
        }
    }

    /// Rejects a batch of `requested` bytes that would not fit in the quota.
    pub async fn ensure_capacity(&self, user_id: &str, requested: i64) -> Result<(), AppError> {
        if requested <= 0 {
            return Ok(());
        }

        let used = self.current_usage(user_id).await;
        let available = (self.quota_bytes - used).max(0);

        if requested > available {
            tracing::info!(
                "🚫 Quota exceeded for user {}: requested={} available={} used={}",
                user_id,
                requested,
                available,
                used
            );
            return Err(AppError::QuotaExceeded {
                requested,
                available,
                limit: self.quota_bytes,
            });
        }

        Ok(())
    }

    /// Creates the usage row for `user_id` if it does not exist yet.
    pub async fn ensure_usage_record(&self, user_id: &str) -> Result<(), DbErr> {
        let row = storage_usage::ActiveModel {
            user_id: Set(user_id.to_string()),
            bytes_used: Set(0),
            plan: Set(self.plan.clone()),
            quota_bytes: Set(self.quota_bytes),
            updated_at: Set(Utc::now()),
        };

        storage_usage::Entity::insert(row)
            .on_conflict(
                OnConflict::column(storage_usage::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Writes the live aggregate into the user's usage row.
    pub async fn recompute_usage(&self, user_id: &str) -> Result<i64, DbErr> {
        let total = self.media.total_bytes_for_user(user_id).await?;

        match storage_usage::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?
        {
            Some(existing) => {
                let mut active: storage_usage::ActiveModel = existing.into();
                active.bytes_used = Set(total);
                active.updated_at = Set(Utc::now());
                active.update(&self.db).await?;
            }
            None => {
                storage_usage::ActiveModel {
                    user_id: Set(user_id.to_string()),
                    bytes_used: Set(total),
                    plan: Set(self.plan.clone()),
                    quota_bytes: Set(self.quota_bytes),
                    updated_at: Set(Utc::now()),
                }
                .insert(&self.db)
                .await?;
            }
        }

        tracing::debug!("📊 Storage usage for {} recomputed: {} bytes", user_id, total);
        Ok(total)
    }

    /// Recomputes in the background; failures are logged only.
    pub fn spawn_recompute(&self, user_id: &str) {
        let quota = self.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = quota.recompute_usage(&user_id).await {
                tracing::warn!("⚠️  Failed to recompute storage usage for {}: {}", user_id, e);
            }
        });
    }

    pub async fn usage_summary(&self, user_id: &str) -> UsageSummary {
        let used = self.current_usage(user_id).await;
        let plan = match storage_usage::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await
        {
            Ok(Some(row)) => row.plan,
            _ => self.plan.clone(),
        };

        UsageSummary {
            bytes_used: used,
            quota_bytes: self.quota_bytes,
            available: (self.quota_bytes - used).max(0),
            plan,
        }
    }
}
