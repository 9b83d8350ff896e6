use crate::config::AppConfig;
use crate::infrastructure::database::MediaSchema;
use crate::services::dedup::DedupStore;
use crate::services::media_repository::MediaRepository;
use crate::services::quota::QuotaService;
use crate::services::storage::StorageService;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod create;
pub mod delete;
pub mod list;
pub mod types;

pub use types::*;

/// Entry creation, listing and deletion for authenticated users.
pub struct EntryService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
    media: Arc<dyn MediaRepository>,
    dedup: Arc<dyn DedupStore>,
    quota: QuotaService,
    config: AppConfig,
}

impl EntryService {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        media: Arc<dyn MediaRepository>,
        dedup: Arc<dyn DedupStore>,
        config: AppConfig,
    ) -> Self {
        let quota = QuotaService::new(
            db.clone(),
            media.clone(),
            config.storage_quota_bytes,
            config.storage_plan.clone(),
        );

        Self {
            db,
            storage,
            media,
            dedup,
            quota,
            config,
        }
    }

    pub fn quota(&self) -> &QuotaService {
        &self.quota
    }

    pub fn media_schema(&self) -> MediaSchema {
        self.media.schema()
    }
}
