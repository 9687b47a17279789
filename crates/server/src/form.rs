//! Multipart form collection.
//!
//! Handlers read the whole form up front: text parts become (possibly
//! repeated) string values, parts carrying a file name become [`Upload`]s.

use std::collections::HashMap;

use axum::extract::Multipart;
use service::storage::Upload;

use crate::errors::JsonApiError;

#[derive(Debug, Default)]
pub struct FormData {
    texts: HashMap<String, Vec<String>>,
    files: HashMap<String, Upload>,
}

impl FormData {
    pub async fn collect(mut multipart: Multipart) -> Result<Self, JsonApiError> {
        let mut form = FormData::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| JsonApiError::bad_request(format!("Invalid form data: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else { continue };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| JsonApiError::bad_request(format!("Invalid form data: {e}")))?;
                    // browsers send an empty part for an untouched file input
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.insert(name, Upload::new(file_name, bytes.to_vec()));
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| JsonApiError::bad_request(format!("Invalid form data: {e}")))?;
                    form.texts.entry(name).or_default().push(value);
                }
            }
        }
        Ok(form)
    }

    /// First value of a text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.texts.get(name).and_then(|v| v.first()).cloned()
    }

    /// Every value of a repeated field, accepting both `name` and `name[]`.
    pub fn texts(&self, name: &str) -> Vec<String> {
        let bracketed = format!("{name}[]");
        [name, bracketed.as_str()]
            .iter()
            .filter_map(|k| self.texts.get(*k))
            .flatten()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }
}
