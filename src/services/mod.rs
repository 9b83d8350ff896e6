pub mod dedup;
pub mod entry_service;
pub mod media_repository;
pub mod quota;
pub mod saga;
pub mod storage;
pub mod worker;
