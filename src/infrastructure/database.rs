use crate::entities::{entries, media, storage_usage};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema, Statement};
use std::env;
use std::time::Duration;
use tracing::info;

/// Shape of the `media` table found in the connected database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSchema {
    /// `media.user_id` is present
    Denormalized,
    /// Pre-migration table without `media.user_id`
    Legacy,
}

impl MediaSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSchema::Denormalized => "denormalized",
            MediaSchema::Legacy => "legacy",
        }
    }
}

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(50)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    // Order matters for foreign keys: Entries -> Media
    let stmts = vec![
        (
            "entries",
            schema
                .create_table_from_entity(entries::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "media",
            schema
                .create_table_from_entity(media::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "storage_usage",
            schema
                .create_table_from_entity(storage_usage::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        let stmt = builder.build(&stmt);
        match db.execute(stmt).await {
            Ok(_) => info!("   - Table '{}' checked/created", name),
            Err(e) => tracing::warn!("   - Failed to create table '{}': {}", name, e),
        }
    }

    info!("🔄 Checking for schema updates...");

    let schema_updates = [
        "CREATE INDEX IF NOT EXISTS idx_entries_user_created ON entries(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_media_entry_id ON media(entry_id)",
        "CREATE INDEX IF NOT EXISTS idx_media_user_id ON media(user_id)",
    ];

    for query in schema_updates {
        match db
            .execute(Statement::from_string(builder, query.to_owned()))
            .await
        {
            Ok(_) => info!("   - Executed schema update: {}", query),
            Err(e) => {
                let err_msg = e.to_string().to_lowercase();
                if err_msg.contains("already exists")
                    || err_msg.contains("no such column")
                    || err_msg.contains("does not exist")
                {
                    info!("   - Index already present or column missing (skipped): {}", query);
                } else {
                    tracing::warn!("   - Schema update warning: {} -> {}", query, e);
                }
            }
        }
    }

    Ok(())
}

/// Checks whether `media.user_id` exists. Run once at startup; the answer
/// selects the media repository for the lifetime of the process.
pub async fn detect_media_schema(db: &impl ConnectionTrait) -> MediaSchema {
    let builder = db.get_database_backend();
    let query = Statement::from_string(builder, "SELECT user_id FROM media LIMIT 1".to_owned());

    match db.query_all(query).await {
        Ok(_) => MediaSchema::Denormalized,
        Err(e) => {
            tracing::warn!(
                "⚠️  media.user_id unavailable, falling back to entry-scoped media queries: {}",
                e
            );
            MediaSchema::Legacy
        }
    }
}
