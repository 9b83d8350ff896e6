pub use super::entries::Entity as Entries;
pub use super::media::Entity as Media;
pub use super::storage_usage::Entity as StorageUsage;
