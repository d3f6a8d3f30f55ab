// handlers/uploads.rs - POST /api/uploads handler

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::path::Path;
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const IMAGE_FIELD: &str = "image";
const ALLOWED_TYPES: &[&str] = &["jpeg", "jpg", "png", "gif"];
const MAX_NAME_LEN: usize = 100;

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("File too large")
    } else {
        ApiError::bad_request(err.body_text())
    }
}

/// Both the extension and the declared mime type must name an allowed image type.
fn check_image_type(file_name: &str, mime: &str) -> ApiResult<()> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let subtype = mime
        .to_ascii_lowercase()
        .strip_prefix("image/")
        .map(str::to_string)
        .unwrap_or_default();

    if ALLOWED_TYPES.contains(&ext.as_str()) && ALLOWED_TYPES.contains(&subtype.as_str()) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Images only (jpeg, jpg, png, gif)"))
    }
}

/// Strip any directory part and reduce the name to a safe character set.
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    let mut name: String = cleaned.chars().rev().take(MAX_NAME_LEN).collect();
    name = name.chars().rev().collect();
    if name.is_empty() {
        "upload".to_string()
    } else {
        name
    }
}

/// POST /api/uploads
///
/// Accepts a single multipart file field named `image` and stores it as
/// `<millis>-<name>` under the upload directory.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let upload = &state.config.upload;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let original = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("image must be a file"))?;
        let mime = field.content_type().unwrap_or_default().to_string();
        check_image_type(&original, &mime)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > upload.max_file_size_bytes {
                return Err(ApiError::payload_too_large("File too large"));
            }
            bytes.extend_from_slice(&chunk);
        }

        let stored = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            sanitize_file_name(&original)
        );
        let write = async {
            tokio::fs::create_dir_all(&upload.dir).await?;
            tokio::fs::write(upload.dir.join(&stored), &bytes).await
        };
        write.await.map_err(|e| {
            error!("Failed to store upload {}: {}", stored, e);
            ApiError::internal_server_error("Could not store file")
        })?;

        info!("Stored upload {} ({} bytes)", stored, bytes.len());
        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "File uploaded",
                "url": format!("/uploads/{}", stored),
            })),
        ));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_images() {
        assert!(check_image_type("cat.PNG", "image/png").is_ok());
        assert!(check_image_type("cat.jpg", "image/jpeg").is_ok());
        assert!(check_image_type("cat.png", "text/plain").is_err());
        assert!(check_image_type("notes.txt", "image/png").is_err());
        assert!(check_image_type("cat", "image/gif").is_err());
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my cat (1).png"), "my_cat__1_.png");
        assert_eq!(sanitize_file_name("C:\\photos\\dog.gif"), "dog.gif");
        assert_eq!(sanitize_file_name(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
