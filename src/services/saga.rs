use crate::entities::entries;
use crate::services::media_repository::MediaRepository;
use crate::services::storage::StorageService;
use sea_orm::{DatabaseConnection, EntityTrait};

/// Undo action for a side effect that already happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Remove the entry row and its media rows
    DeleteEntry { entry_id: String },
    /// Remove an object uploaded during this request
    DeleteObject { key: String },
}

/// Ordered record of compensations for one entry creation. Unwinding runs
/// them newest first; each failure is logged and the unwind continues.
#[derive(Debug, Default)]
pub struct CompensationLog {
    steps: Vec<Compensation>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UnwindReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Compensation] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn unwind(
        self,
        db: &DatabaseConnection,
        media: &dyn MediaRepository,
        storage: &dyn StorageService,
    ) -> UnwindReport {
        let mut report = UnwindReport::default();

        for step in self.steps.into_iter().rev() {
            let outcome = match &step {
                Compensation::DeleteObject { key } => storage.delete_file(key).await,
                Compensation::DeleteEntry { entry_id } => delete_entry_rows(db, media, entry_id)
                    .await
                    .map_err(anyhow::Error::from),
            };

            match outcome {
                Ok(()) => {
                    tracing::info!("↩️  Compensation applied: {:?}", step);
                    report.succeeded += 1;
                }
                Err(e) => {
                    tracing::error!("❌ Compensation failed: {:?}: {}", step, e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

/// Media rows go first so the entry delete does not rely on FK cascade support.
pub async fn delete_entry_rows(
    db: &DatabaseConnection,
    media: &dyn MediaRepository,
    entry_id: &str,
) -> Result<(), sea_orm::DbErr> {
    media.delete_for_entry(entry_id).await?;
    entries::Entity::delete_by_id(entry_id.to_string())
        .exec(db)
        .await?;
    Ok(())
}
