//! Image upload and prediction handler

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::models::Prediction;
use crate::{AppError, AppResult, AppState};

/// File extensions accepted for upload
const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Handle an image upload and run it through the classifier.
///
/// Validation failures come back as 400 with an error body; save failures
/// as 500. Inference outcomes (including model-absent and decode errors)
/// are always 200 with the prediction payload.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Prediction>> {
    // The field borrows `multipart`, so it must be consumed inside the
    // loop rather than carried out of it.
    let mut file_field = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            if filename.is_empty() {
                return Err(AppError::ValidationError("No file selected".to_string()));
            }
            if !allowed_file(&filename) {
                return Err(AppError::ValidationError(
                    "File type not allowed. Use PNG, JPG, JPEG, or GIF".to_string(),
                ));
            }

            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InternalError(format!("Failed to read upload: {}", e)))?;
            file_field = Some((filename, data));
            break;
        }
    }

    let (filename, data) =
        file_field.ok_or_else(|| AppError::ValidationError("No file uploaded".to_string()))?;

    // Collisions overwrite the previous upload; uploads are not expired.
    let filepath = state.config.upload_dir.join(sanitize_filename(&filename));
    tokio::fs::write(&filepath, &data).await?;
    tracing::info!("Saved upload: {}", filepath.display());

    let classifier = state.classifier.clone();
    let prediction = tokio::task::spawn_blocking(move || classifier.predict_file(&filepath))
        .await
        .map_err(|e| AppError::InternalError(format!("Inference task failed: {}", e)))?;

    Ok(Json(prediction))
}

/// Extension check, case-insensitive. Files without an extension fail.
fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduce a client-supplied filename to a safe basename: path components
/// are dropped, anything outside [A-Za-z0-9._-] becomes an underscore,
/// and leading dots are stripped so uploads cannot hide or escape.
fn sanitize_filename(filename: &str) -> String {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let cleaned: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions() {
        assert!(allowed_file("tree.png"));
        assert!(allowed_file("tree.jpg"));
        assert!(allowed_file("tree.jpeg"));
        assert!(allowed_file("tree.gif"));
        assert!(allowed_file("TREE.JPG"));
        assert!(allowed_file("archive.tar.png"));
    }

    #[test]
    fn test_disallowed_extensions() {
        assert!(!allowed_file("notes.txt"));
        assert!(!allowed_file("script.sh"));
        assert!(!allowed_file("noextension"));
        assert!(!allowed_file("trailingdot."));
        assert!(!allowed_file(".bashrc"));
    }

    #[test]
    fn test_sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd.png"), "passwd.png");
        assert_eq!(sanitize_filename("C:\\temp\\shot.jpg"), "shot.jpg");
        assert_eq!(sanitize_filename("plain.gif"), "plain.gif");
    }

    #[test]
    fn test_sanitize_replaces_special_chars() {
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_filename("tr\u{e9}e.png"), "tr_e.png");
    }

    #[test]
    fn test_sanitize_strips_leading_dots() {
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_filename("..."), "upload");
    }
}
