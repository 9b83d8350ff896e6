use crate::AppState;
use crate::api::error::AppError;
use crate::services::entry_service::{
    CreateEntryResponse, EntryWithMediaResponse, IncomingFile, NewEntry,
};
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode, header},
};

/// Maps multipart failures; body-limit hits report the configured limit
/// and the declared request size.
fn multipart_error(limit: usize, received: Option<u64>) -> impl Fn(MultipartError) -> AppError {
    move |e| {
        let err_msg = e.to_string();
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE
            || err_msg.contains("length limit exceeded")
        {
            tracing::warn!(
                "🚫 Request body over limit: limit={} declared={:?}",
                limit,
                received
            );
            AppError::PayloadTooLarge { limit, received }
        } else {
            AppError::Validation(format!("Malformed multipart body: {}", err_msg))
        }
    }
}

#[utoipa::path(
    post,
    path = "/entries",
    request_body(content = String, content_type = "multipart/form-data", description = "Fields: title (required), description, submissionId, files (repeatable)"),
    responses(
        (status = 200, description = "Entry created", body = CreateEntryResponse),
        (status = 400, description = "Missing title"),
        (status = 401, description = "Unauthenticated"),
        (status = 409, description = "Duplicate submission"),
        (status = 413, description = "Storage quota or request size limit exceeded"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "entries"
)]
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<CreateEntryResponse>, AppError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let to_app_error = multipart_error(state.config.max_request_size, declared);

    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut submission_id: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(&to_app_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "title" => title = Some(field.text().await.map_err(&to_app_error)?),
            "description" => description = Some(field.text().await.map_err(&to_app_error)?),
            "submissionId" => submission_id = Some(field.text().await.map_err(&to_app_error)?),
            "files" | "files[]" | "file" => {
                let original_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(&to_app_error)?;
                files.push(IncomingFile {
                    original_name,
                    content_type,
                    data,
                });
            }
            other => tracing::debug!("Ignoring unknown multipart field '{}'", other),
        }
    }

    tracing::info!(
        "📥 Entry submission from {} with {} file part(s)",
        claims.sub,
        files.len()
    );

    let new_entry = NewEntry::new(title, description, submission_id, files);
    let created = state
        .entry_service
        .create_entry(&claims.sub, new_entry)
        .await?;

    Ok(Json(created.into()))
}

#[utoipa::path(
    get,
    path = "/entries",
    responses(
        (status = 200, description = "Entries of the caller, newest first", body = [EntryWithMediaResponse]),
        (status = 401, description = "Unauthenticated")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "entries"
)]
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<EntryWithMediaResponse>>, AppError> {
    let entries = state.entry_service.list_entries(&claims.sub).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/entries/{id}",
    params(
        ("id" = String, Path, description = "Entry ID")
    ),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "Entry not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "entries"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(entry_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .entry_service
        .delete_entry(&claims.sub, &entry_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
