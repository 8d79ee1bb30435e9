//! File upload handlers

use std::collections::HashMap;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::storage::UploadedFile;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub path: String,
}

/// Text fields and file parts of a multipart body
#[derive(Debug, Default)]
pub(crate) struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub(crate) async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field.bytes().await.map_err(malformed)?;
                    form.files.insert(
                        name,
                        UploadedFile {
                            filename,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(malformed)?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }
}

fn malformed(err: axum::extract::multipart::MultipartError) -> AppError {
    tracing::debug!("Rejected multipart body: {}", err);
    AppError::validation(
        "file",
        "The uploaded data could not be read.",
        "Les données envoyées sont illisibles.",
    )
}

/// Store an image sent in the `image` field
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut form = MultipartForm::read(multipart).await?;

    let file = form.files.remove("image").ok_or_else(|| {
        AppError::validation(
            "image",
            "The image field is required.",
            "Le champ image est obligatoire.",
        )
    })?;

    let stored = state.storage.store_image(&file).await?;
    tracing::info!("User {} uploaded {}", user.user_id, stored.path);

    Ok(Json(UploadResponse {
        success: true,
        url: stored.url,
        path: stored.path,
    }))
}
