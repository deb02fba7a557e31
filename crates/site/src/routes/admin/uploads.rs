//! Image upload endpoints used by the admin forms.
//!
//! Uploads go to object storage with the admin's own access token, so the
//! storage policies see the same user the database does.

use axum::{
    Form, Json,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::services::auth::{AUTH_COOKIE, SessionRead, cookie::read_cookie};
use crate::services::storage::{StorageError, Upload};
use crate::state::AppState;

/// Folders an upload may land in; anything else goes to `uploads`.
const FOLDERS: &[&str] = &["projects", "services", "blog", "testimonials", "settings"];

const DEFAULT_FOLDER: &str = "uploads";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteImageForm {
    pub url: String,
}

/// The signed-in admin's access token, read from the (possibly refreshed) cookie.
fn access_token(state: &AppState, headers: &HeaderMap) -> Result<String, AppError> {
    let cookie = read_cookie(headers, AUTH_COOKIE)
        .ok_or_else(|| AppError::Unauthorized("no session".to_string()))?;
    match state.sessions().read_session(&cookie) {
        SessionRead::Valid(session) => Ok(session.access_token),
        SessionRead::Expired { .. } | SessionRead::Absent => {
            Err(AppError::Unauthorized("session expired".to_string()))
        }
    }
}

fn folder_or_default(folder: &str) -> &str {
    let folder = folder.trim();
    FOLDERS
        .iter()
        .copied()
        .find(|candidate| *candidate == folder)
        .unwrap_or(DEFAULT_FOLDER)
}

/// `POST /admin/uploads` (multipart: `file`, optional `folder`)
///
/// # Errors
///
/// Returns 400 for a missing or non-image file, 413 over 5 MB, and 502 if
/// the storage service rejects the upload.
#[instrument(skip(admin, state, headers, multipart), fields(user_id = %admin.user_id))]
pub async fn upload(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let token = access_token(&state, &headers)?;

    let mut folder = DEFAULT_FOLDER.to_string();
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        match field.name() {
            Some("folder") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                folder = folder_or_default(&value).to_string();
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        AppError::Storage(StorageError::TooLarge)
                    } else {
                        AppError::BadRequest(e.body_text())
                    }
                })?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest("missing file".to_string()))?;

    let url = state
        .storage()
        .upload(
            &state.config().storage_bucket,
            Upload {
                folder: &folder,
                filename: &filename,
                content_type: &content_type,
                bytes,
            },
            &token,
        )
        .await?;

    Ok(Json(UploadResponse { url }))
}

/// `POST /admin/uploads/delete` (form: `url`)
///
/// # Errors
///
/// Returns 400 if the URL is not one of ours and 502 if storage rejects the delete.
#[instrument(skip(admin, state, headers, form), fields(user_id = %admin.user_id))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<DeleteImageForm>,
) -> Result<Response, AppError> {
    let token = access_token(&state, &headers)?;
    state.storage().delete_public_url(&form.url, &token).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_or_default() {
        assert_eq!(folder_or_default("projects"), "projects");
        assert_eq!(folder_or_default(" blog "), "blog");
        assert_eq!(folder_or_default("../etc"), "uploads");
        assert_eq!(folder_or_default(""), "uploads");
    }
}
