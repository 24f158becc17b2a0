use std::collections::HashMap;

use axum::extract::Multipart;

use super::services::UploadItem;
use crate::error::AppError;

/// A multipart body split into text fields and file parts.
#[derive(Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadItem>,
}

impl MultipartForm {
    /// Parts named in `file_fields` are kept as files, the rest as text.
    pub async fn read(mut mp: Multipart, file_fields: &[&str]) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| AppError::validation(format!("invalid multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if file_fields.contains(&name.as_str()) {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("invalid file part: {e}")))?;
                // browsers send an empty part for an untouched file input
                if !body.is_empty() {
                    form.files.insert(name, UploadItem { body, content_type });
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("invalid text part: {e}")))?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    /// Trimmed text value; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadItem> {
        self.files.remove(name)
    }
}
