//! services/api/src/web/multipart.rs
//!
//! Reads a `multipart/form-data` body into text fields and file uploads.

use std::collections::HashMap;

use axum::extract::Multipart;
use identity_core::AssetUpload;
use tracing::error;

use crate::web::response::ApiFailure;

/// The parts of a form, split into text fields and files by whether a part
/// carries a file name.
#[derive(Debug, Default)]
pub struct FormParts {
    fields: HashMap<String, String>,
    files: HashMap<String, AssetUpload>,
}

impl FormParts {
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Removes and returns the upload sent under `name`, if any.
    pub fn take_file(&mut self, name: &str) -> Option<AssetUpload> {
        self.files.remove(name)
    }
}

pub async fn read_form(mut multipart: Multipart) -> Result<FormParts, ApiFailure> {
    let mut parts = FormParts::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart data: {}", e);
        ApiFailure::bad_request("Malformed multipart body")
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    error!("Failed to read file bytes: {}", e);
                    ApiFailure::bad_request("Malformed multipart body")
                })?;
                // Browsers send an empty part for an untouched file input.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                parts.files.insert(
                    name,
                    AssetUpload {
                        file_name,
                        content_type,
                        data,
                    },
                );
            }
            None => {
                let value = field.text().await.map_err(|e| {
                    error!("Failed to read form field: {}", e);
                    ApiFailure::bad_request("Malformed multipart body")
                })?;
                parts.fields.insert(name, value);
            }
        }
    }

    Ok(parts)
}
