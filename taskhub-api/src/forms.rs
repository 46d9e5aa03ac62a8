/// Multipart form decoding for image-carrying resources
///
/// Project and task mutations arrive as multipart forms: text fields plus an
/// optional `image` file part. [`RecordForm`] collects the parts, and the
/// typed readers accumulate per-field problems into [`FormErrors`] so a bad
/// submission reports every broken field at once, before anything is
/// persisted or stored.

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;
use chrono::NaiveDate;
use uuid::Uuid;

use taskhub_shared::models::status::Status;

use crate::error::{ApiError, ValidationErrorDetail};

/// Maximum length of text fields such as names
pub const MAX_TEXT_LEN: usize = 255;

/// An uploaded image part
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Client-supplied filename, sanitized later by the image store
    pub file_name: String,

    /// Raw file contents
    pub bytes: Bytes,
}

/// Collected multipart form parts
#[derive(Debug, Default)]
pub struct RecordForm {
    fields: HashMap<String, String>,
    image: Option<UploadedImage>,
}

impl RecordForm {
    /// Drains a multipart body into text fields and the optional image part
    ///
    /// A file part named `image` with an empty filename or empty contents is
    /// what browsers send for an untouched file input; it counts as "no
    /// image".
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = RecordForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "image" && field.file_name().is_some() {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    form.image = Some(UploadedImage { file_name, bytes });
                }
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        fields: &[(&str, &str)],
        image: Option<UploadedImage>,
    ) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            image,
        }
    }

    /// Text field value, when present and non-empty
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Takes ownership of the uploaded image, if any
    pub fn take_image(&mut self) -> Option<UploadedImage> {
        self.image.take()
    }

    /// Required text field, at most [`MAX_TEXT_LEN`] characters
    pub fn require_text(&self, key: &'static str, errors: &mut FormErrors) -> String {
        match self.text(key) {
            None => {
                errors.push(key, format!("{} is required", key));
                String::new()
            }
            Some(v) if v.chars().count() > MAX_TEXT_LEN => {
                errors.push(key, format!("{} must be at most {} characters", key, MAX_TEXT_LEN));
                v.to_string()
            }
            Some(v) => v.to_string(),
        }
    }

    /// Optional text field; empty submissions become `None`
    pub fn optional_text(&self, key: &str) -> Option<String> {
        self.text(key).map(str::to_string)
    }

    /// Optional `YYYY-MM-DD` date field
    pub fn date(&self, key: &'static str, errors: &mut FormErrors) -> Option<NaiveDate> {
        let value = self.text(key)?;
        match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(key, format!("{} must be a date in YYYY-MM-DD format", key));
                None
            }
        }
    }

    /// Optional UUID field
    pub fn uuid(&self, key: &'static str, errors: &mut FormErrors) -> Option<Uuid> {
        let value = self.text(key)?;
        match Uuid::parse_str(value) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(key, format!("{} must be a valid id", key));
                None
            }
        }
    }

    /// Required UUID field
    pub fn require_uuid(&self, key: &'static str, errors: &mut FormErrors) -> Uuid {
        match self.text(key) {
            None => {
                errors.push(key, format!("{} is required", key));
                Uuid::nil()
            }
            Some(_) => self.uuid(key, errors).unwrap_or(Uuid::nil()),
        }
    }

    /// Required status field, checked against the status enum
    pub fn status(&self, key: &'static str, errors: &mut FormErrors) -> Status {
        match self.text(key) {
            None => {
                errors.push(key, format!("{} is required", key));
                Status::Pending
            }
            Some(v) => Status::parse(v).unwrap_or_else(|| {
                errors.push(key, format!("unknown status \"{}\"", v));
                Status::Pending
            }),
        }
    }
}

/// Accumulated per-field validation problems
#[derive(Debug, Default)]
pub struct FormErrors {
    errors: Vec<ValidationErrorDetail>,
}

impl FormErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationErrorDetail {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Fails with a validation error when any field problem was recorded
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationError(self.errors))
        }
    }
}
