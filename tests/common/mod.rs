#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use memoir_backend::config::AppConfig;
use memoir_backend::entities::{entries, media};
use memoir_backend::infrastructure::database::{self, MediaSchema};
use memoir_backend::services::dedup::{DedupStore, InMemoryDedupStore};
use memoir_backend::services::entry_service::EntryService;
use memoir_backend::services::media_repository::{self, MediaRepository};
use memoir_backend::services::storage::{StorageError, StorageService};
use memoir_backend::utils::auth::create_jwt;
use memoir_backend::{AppState, create_app};
use sea_orm::{Database, DatabaseConnection, DbErr, RuntimeErr};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("memoir_backend=debug")
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    Rejected,
    Unavailable,
}

/// Object store kept in memory, with per-put fault injection
#[derive(Default)]
pub struct MockStorageService {
    objects: Mutex<HashMap<String, Bytes>>,
    puts: AtomicUsize,
    faults: Mutex<HashMap<usize, Fault>>,
    deleted: Mutex<Vec<String>>,
    unreachable: AtomicBool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `nth` put (1-based, counted across the store's lifetime) fail
    pub fn fail_put(&self, nth: usize, fault: Fault) {
        self.faults.lock().unwrap().insert(nth, fault);
    }

    /// Makes lookups fail as if the store could not be reached
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn put_object(&self, key: &str, data: Bytes, _content_type: &str) -> anyhow::Result<String> {
        let nth = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        let fault = self.faults.lock().unwrap().get(&nth).copied();
        match fault {
            Some(Fault::Rejected) => {
                return Err(StorageError::Rejected(format!("injected rejection of {}", key)).into());
            }
            Some(Fault::Unavailable) => {
                return Err(StorageError::Unavailable("injected outage".to_string()).into());
            }
            None => {}
        }

        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(self.public_url(key))
    }

    async fn delete_file(&self, key: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> anyhow::Result<bool> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected outage".to_string()).into());
        }
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("http://storage.test/memoir/{}", key)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum InsertFault {
    /// Statement rejected by the database, e.g. a constraint violation
    Rejected,
    /// Connection to the database lost
    ConnectionLost,
}

/// Wraps the real repository and fails selected calls
pub struct FaultyMediaRepository {
    inner: Arc<dyn MediaRepository>,
    inserts: AtomicUsize,
    insert_faults: Mutex<HashMap<usize, InsertFault>>,
    broken_entries: Mutex<HashSet<String>>,
}

impl FaultyMediaRepository {
    pub fn new(inner: Arc<dyn MediaRepository>) -> Self {
        Self {
            inner,
            inserts: AtomicUsize::new(0),
            insert_faults: Mutex::new(HashMap::new()),
            broken_entries: Mutex::new(HashSet::new()),
        }
    }

    /// Makes the `nth` insert (1-based) fail
    pub fn fail_insert(&self, nth: usize, fault: InsertFault) {
        self.insert_faults.lock().unwrap().insert(nth, fault);
    }

    /// Makes media lookups for `entry_id` fail
    pub fn fail_find_for(&self, entry_id: &str) {
        self.broken_entries
            .lock()
            .unwrap()
            .insert(entry_id.to_string());
    }
}

#[async_trait]
impl MediaRepository for FaultyMediaRepository {
    fn schema(&self) -> MediaSchema {
        self.inner.schema()
    }

    async fn insert(&self, row: media::Model) -> Result<media::Model, DbErr> {
        let nth = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        let fault = self.insert_faults.lock().unwrap().get(&nth).copied();
        match fault {
            Some(InsertFault::Rejected) => Err(DbErr::Custom(
                "injected constraint violation".to_string(),
            )),
            Some(InsertFault::ConnectionLost) => Err(DbErr::Conn(RuntimeErr::Internal(
                "injected connection loss".to_string(),
            ))),
            None => self.inner.insert(row).await,
        }
    }

    async fn find_for_entry(&self, entry: &entries::Model) -> Result<Vec<media::Model>, DbErr> {
        if self.broken_entries.lock().unwrap().contains(&entry.id) {
            return Err(DbErr::Custom("injected lookup failure".to_string()));
        }
        self.inner.find_for_entry(entry).await
    }

    async fn delete_for_entry(&self, entry_id: &str) -> Result<u64, DbErr> {
        self.inner.delete_for_entry(entry_id).await
    }

    async fn total_bytes_for_user(&self, user_id: &str) -> Result<i64, DbErr> {
        self.inner.total_bytes_for_user(user_id).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub storage: Arc<MockStorageService>,
    pub media: Arc<FaultyMediaRepository>,
    pub entries: Arc<EntryService>,
    pub config: AppConfig,
}

pub async fn connect_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    db
}

pub async fn setup() -> TestApp {
    setup_with(AppConfig::development()).await
}

pub async fn setup_with(config: AppConfig) -> TestApp {
    let db = connect_db().await;
    build(db, config).await
}

/// Wires the app around an already prepared database
pub async fn build(db: DatabaseConnection, config: AppConfig) -> TestApp {
    init_tracing();

    let storage = Arc::new(MockStorageService::new());
    let schema = database::detect_media_schema(&db).await;
    let media = Arc::new(FaultyMediaRepository::new(media_repository::for_schema(
        db.clone(),
        schema,
    )));
    let dedup: Arc<dyn DedupStore> = Arc::new(InMemoryDedupStore::new());

    let entries = Arc::new(EntryService::new(
        db.clone(),
        storage.clone(),
        media.clone(),
        dedup,
        config.clone(),
    ));

    let state = AppState {
        db: db.clone(),
        storage: storage.clone(),
        entry_service: entries.clone(),
        config: config.clone(),
    };

    TestApp {
        router: create_app(state),
        db,
        storage,
        media,
        entries,
        config,
    }
}

impl TestApp {
    pub fn token(&self, user_id: &str) -> String {
        create_jwt(user_id, &self.config.jwt_secret).unwrap()
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn post_entry(&self, user_id: &str, form: MultipartForm) -> (StatusCode, Value) {
        let token = self.token(user_id);
        self.send(form.into_request("/entries", Some(&token))).await
    }

    pub async fn list_entries(&self, user_id: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .uri("/entries")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user_id)))
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    pub async fn delete_entry(&self, user_id: &str, entry_id: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/entries/{}", entry_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user_id)))
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    pub async fn storage_usage(&self, user_id: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .uri("/storage/usage")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user_id)))
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }
}

const BOUNDARY: &str = "memoir-test-boundary";

/// Hand-built `multipart/form-data` body
#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str, token: Option<&str>) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_LENGTH, self.body.len())
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(self.body)).unwrap()
    }
}

pub fn titled(title: &str) -> MultipartForm {
    MultipartForm::new().text("title", title)
}
