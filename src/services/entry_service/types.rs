use crate::api::error::AppError;
use crate::entities::{entries, media};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

/// Coarse media classification derived from the MIME type prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Other,
}

impl MediaKind {
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type.split('/').next().map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("image") => MediaKind::Image,
            Some(t) if t.eq_ignore_ascii_case("video") => MediaKind::Video,
            Some(t) if t.eq_ignore_ascii_case("audio") => MediaKind::Audio,
            _ => MediaKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Other => "other",
        }
    }
}

/// One file part of an entry submission, fully buffered
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl IncomingFile {
    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }
}

/// A parsed entry submission
#[derive(Debug, Clone, Validate)]
pub struct NewEntry {
    #[validate(length(max = 255, message = "Title must be 255 characters or fewer"))]
    pub title: String,
    pub description: Option<String>,
    pub submission_id: Option<String>,
    pub files: Vec<IncomingFile>,
}

impl NewEntry {
    /// Trims text fields; blank description and token become `None`.
    pub fn new(
        title: Option<String>,
        description: Option<String>,
        submission_id: Option<String>,
        files: Vec<IncomingFile>,
    ) -> Self {
        let blank_to_none = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            title: title.map(|t| t.trim().to_string()).unwrap_or_default(),
            description: blank_to_none(description),
            submission_id: blank_to_none(submission_id),
            files,
        }
    }

    pub fn check(&self) -> Result<(), AppError> {
        if self.title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }

        self.validate().map_err(|errors| {
            let message = errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "Invalid entry".to_string());
            AppError::Validation(message)
        })
    }

    /// Bytes across every file part, empty ones included
    pub fn total_bytes(&self) -> i64 {
        self.files.iter().map(IncomingFile::size).sum()
    }
}

#[derive(Debug, Clone)]
pub struct CreatedEntry {
    pub entry: entries::Model,
    pub media: Vec<media::Model>,
}

#[derive(Debug, Clone)]
pub struct EntryWithMedia {
    pub entry: entries::Model,
    pub media: Vec<media::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entries::Model> for EntryResponse {
    fn from(m: entries::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            title: m.title,
            description: m.description,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub id: String,
    pub entry_id: String,
    pub user_id: String,
    pub file_name: String,
    pub original_name: String,
    pub file_type: String,
    pub mime_type: String,
    pub file_size: i64,
    pub file_path: String,
    pub public_url: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<media::Model> for MediaResponse {
    fn from(m: media::Model) -> Self {
        Self {
            id: m.id,
            entry_id: m.entry_id,
            user_id: m.user_id,
            file_name: m.file_name,
            original_name: m.original_name,
            file_type: m.file_type,
            mime_type: m.mime_type,
            file_size: m.file_size,
            file_path: m.file_path,
            public_url: m.public_url,
            metadata: m.metadata,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateEntryResponse {
    pub entry: EntryResponse,
    pub media: Vec<MediaResponse>,
}

impl From<CreatedEntry> for CreateEntryResponse {
    fn from(created: CreatedEntry) -> Self {
        Self {
            entry: created.entry.into(),
            media: created.media.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct EntryWithMediaResponse {
    #[serde(flatten)]
    pub entry: EntryResponse,
    pub media: Vec<MediaResponse>,
}

impl From<EntryWithMedia> for EntryWithMediaResponse {
    fn from(e: EntryWithMedia) -> Self {
        Self {
            entry: e.entry.into(),
            media: e.media.into_iter().map(Into::into).collect(),
        }
    }
}
