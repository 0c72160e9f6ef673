//! Attachment upload and removal.
//!
//! Upload flow: check ownership, store the bytes as
//! `uploads/attachments/<noteId>-<millis><ext>`, extract text once, append
//! the record. Extraction never fails the upload; a file it cannot read is
//! saved with no `extractedText`.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use notesage_core::config::MAX_ATTACHMENT_BYTES;
use notesage_ingest::StoredFile;
use notesage_store::{NewAttachment, Note};

use super::notes::note_not_found;
use super::users::multipart_error;
use super::{dotted_extension, now_millis, remove_stored_file};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/notes/{id}/attachments",
            post(upload_attachment).layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES + 64 * 1024)),
        )
        .route(
            "/notes/{id}/attachments/{attachment_id}",
            delete(remove_attachment),
        )
}

/// MIME type for an upload: what the client declared, else a guess from the extension.
fn mime_type(declared: Option<&str>, filename: &str) -> String {
    if let Some(mime) = declared.filter(|m| !m.is_empty()) {
        return mime.to_string();
    }
    let guess = match dotted_extension(filename).to_lowercase().as_str() {
        ".pdf" => "application/pdf",
        ".doc" => "application/msword",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".ppt" => "application/vnd.ms-powerpoint",
        ".pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".xls" => "application/vnd.ms-excel",
        ".xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".txt" => "text/plain",
        ".md" => "text/markdown",
        ".json" => "application/json",
        ".js" => "text/javascript",
        ".html" => "text/html",
        ".css" => "text/css",
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    };
    guess.to_string()
}

/// Write `bytes` under a fresh `<noteId>-<millis><ext>` name in `dir` and
/// return the name. A name already taken gets a `-<n>` suffix before the extension.
async fn store_upload(
    dir: &std::path::Path,
    note_id: &str,
    ext: &str,
    bytes: &[u8],
) -> std::io::Result<String> {
    let millis = now_millis();
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => format!("{}-{}{}", note_id, millis, ext),
            n => format!("{}-{}-{}{}", note_id, millis, n, ext),
        };
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&name))
            .await
        {
            Ok(file) => {
                fill_or_remove(&dir.join(&name), file, bytes).await?;
                return Ok(name);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Write `bytes` through `writer`; on failure the partial file at `path` is removed.
async fn fill_or_remove<W>(path: &std::path::Path, mut writer: W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written: std::io::Result<()> = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    }
    .await;
    if let Err(e) = written {
        drop(writer);
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            warn!("Could not remove partial upload {}: {}", path.display(), remove_err);
        }
        return Err(e);
    }
    Ok(())
}

/// POST /api/notes/:id/attachments: multipart field `file`, at most 20 MiB.
async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(note_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Note>, ApiError> {
    if !state.store.note_exists(&auth.user_id, &note_id)? {
        return Err(note_not_found());
    }

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("file").to_string();
        let declared = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((name, declared, bytes));
        break;
    }
    let (name, declared, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))?;

    if bytes.len() > MAX_ATTACHMENT_BYTES {
        return Err(ApiError::PayloadTooLarge("File too large".into()));
    }

    let paths = &state.config.data_paths;
    let file_name =
        store_upload(&paths.attachments, &note_id, &dotted_extension(&name), &bytes).await?;
    let relative = paths.attachment_relative(&file_name);

    let extraction = state
        .extractor
        .extract(&StoredFile::new(name.clone(), relative.clone()))
        .await;
    info!(
        "Stored attachment {} for note {} ({} bytes, extraction {})",
        name,
        note_id,
        bytes.len(),
        extraction.outcome()
    );

    let attachment = NewAttachment {
        mime_type: mime_type(declared.as_deref(), &name),
        url: format!("/{}", relative),
        path: relative.clone(),
        size: bytes.len() as i64,
        extracted_text: extraction.into_text(),
        name,
    };

    match state.store.add_attachment(&auth.user_id, &note_id, attachment)? {
        Some(note) => Ok(Json(note)),
        None => {
            // note deleted while we were extracting
            remove_stored_file(&state, &relative).await;
            Err(note_not_found())
        }
    }
}

/// DELETE /api/notes/:id/attachments/:attachmentId: drops the record and its file.
async fn remove_attachment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((note_id, attachment_id)): Path<(String, String)>,
) -> Result<Json<Note>, ApiError> {
    if !state.store.note_exists(&auth.user_id, &note_id)? {
        return Err(note_not_found());
    }
    let (note, removed) = state
        .store
        .remove_attachment(&auth.user_id, &note_id, &attachment_id)?
        .ok_or_else(|| ApiError::NotFound("Attachment not found".into()))?;

    remove_stored_file(&state, &removed.path).await;
    debug!("Removed attachment {} from note {}", removed.id, note_id);
    Ok(Json(note))
}
