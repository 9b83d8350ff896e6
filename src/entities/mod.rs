pub mod prelude;

pub mod entries;
pub mod media;
pub mod storage_usage;
