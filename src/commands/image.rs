use crate::error::AppError;
use crate::models::image_types::ImageReference;
use crate::services::image_service;

/// Render an image reference for display as a JPEG data URI.
#[tauri::command]
pub async fn get_preview(uri: String) -> Result<String, AppError> {
    let reference = ImageReference::parse(&uri)
        .ok_or_else(|| AppError::EmptySelection("No image URI to show".to_string()))?;
    tokio::task::spawn_blocking(move || image_service::preview_data_uri(&reference))
        .await
        .map_err(|e| AppError::decode(format!("Task join failed: {}", e)))?
}
