//! Multipart upload extraction shared by the API and the front end.

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};

/// One file field pulled out of a multipart body.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-side file name, empty when the part carried none
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    /// True when the declared content type starts with `image/`.
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// Returns the first part named `field_name`, skipping all others.
pub async fn read_upload(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Option<Upload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        return Ok(Some(Upload {
            filename,
            content_type,
            bytes,
        }));
    }

    Ok(None)
}
