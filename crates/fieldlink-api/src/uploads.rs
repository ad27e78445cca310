use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::info;

use fieldlink_types::api::{Claims, UploadResponse};
use fieldlink_types::error::ChatError;

use crate::auth::AppState;
use crate::error::ApiError;

/// Only these extensions are accepted, matching the portal's photo and
/// report-attachment allow-list.
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pdf"];

/// Store a raw-body upload and return the stored filename reference.
///
/// The stored name is prefixed with a content-hash fragment so repeated
/// uploads of the same client filename never clobber each other.
pub async fn upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(filename): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let sanitized = sanitize_filename(&filename);
    if !allowed_file(&sanitized) {
        return Err(ChatError::Validation(format!(
            "file type not allowed (accepted: {})",
            ALLOWED_EXTENSIONS.join(", ")
        ))
        .into());
    }
    if body.is_empty() {
        return Err(ChatError::Validation("upload body is empty".to_string()).into());
    }

    let digest = hex::encode(Sha256::digest(&body));
    let stored = format!("{}_{}", &digest[..8], sanitized);

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(ChatError::persistence)?;
    tokio::fs::write(state.upload_dir.join(&stored), &body)
        .await
        .map_err(ChatError::persistence)?;

    info!(
        "{} ({}) uploaded {} ({} bytes)",
        claims.name,
        claims.sub,
        stored,
        body.len()
    );

    Ok((StatusCode::CREATED, Json(UploadResponse { filename: stored })))
}

/// Reduce a client-supplied filename to a safe final path component.
fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_matches_case_insensitively() {
        assert!(allowed_file("site.png"));
        assert!(allowed_file("photo.JPG"));
        assert!(allowed_file("scan.jpeg"));
        assert!(allowed_file("report.PDF"));
        assert!(!allowed_file("script.sh"));
        assert!(!allowed_file("archive.tar.gz"));
        assert!(!allowed_file("noextension"));
        assert!(!allowed_file(".png"));
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd.png"), "passwd.png");
        assert_eq!(sanitize_filename("C:\\temp\\photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("site survey (1).png"), "site_survey__1_.png");
    }
}
