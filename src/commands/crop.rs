use crate::error::AppError;
use crate::models::crop_types::{AspectOption, AspectRatio, CropRegion};
use crate::models::image_types::ImageReference;
use crate::services::crop_flow::FlowState;
use crate::services::crop_service;
use crate::state::AppState;
use tauri::{AppHandle, State};
use tauri_plugin_dialog::{DialogExt, FilePath};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif", "tiff", "tif"];

#[tauri::command]
pub fn aspect_ratio_options() -> Vec<AspectOption> {
    AspectRatio::ALL
        .iter()
        .map(|&ratio| AspectOption {
            label: ratio.label(),
            ratio,
        })
        .collect()
}

#[tauri::command]
pub async fn get_flow_state(state: State<'_, AppState>) -> Result<FlowState, AppError> {
    Ok(state.flow().state().clone())
}

#[tauri::command]
pub async fn current_image(state: State<'_, AppState>) -> Result<Option<String>, AppError> {
    Ok(state.current_image().map(|r| r.to_string()))
}

/// Show the system picker. A selection moves on to the aspect chooser; closing
/// the picker returns the flow to idle.
#[tauri::command]
pub async fn pick_image(app: AppHandle, state: State<'_, AppState>) -> Result<FlowState, AppError> {
    state.flow().open_picker()?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    app.dialog()
        .file()
        .add_filter("Images", IMAGE_EXTENSIONS)
        .pick_file(move |file| {
            let _ = tx.send(file);
        });

    let selection = match rx.await {
        Ok(file) => file.and_then(to_reference),
        Err(_) => None,
    };

    let mut flow = state.flow();
    flow.picked(selection)?;
    Ok(flow.state().clone())
}

#[tauri::command]
pub async fn choose_aspect_ratio(
    state: State<'_, AppState>,
    ratio: Option<AspectRatio>,
) -> Result<FlowState, AppError> {
    let mut flow = state.flow();
    flow.choose_aspect(ratio)?;
    Ok(flow.state().clone())
}

/// Finish the crop with the rectangle drawn in the cropper (or the centred
/// default) and make the result the current image.
#[tauri::command]
pub async fn apply_crop(
    state: State<'_, AppState>,
    region: Option<CropRegion>,
) -> Result<String, AppError> {
    let (source, ratio) = state
        .flow()
        .pending_crop()
        .ok_or_else(|| AppError::invalid_state("no crop in progress"))?;

    let max_size = state.config.max_crop_size;
    let cache_dir = state.cache_dir.clone();
    let result = tokio::task::spawn_blocking(move || {
        crop_service::crop_to_file(&source, ratio, region, max_size, &cache_dir)
    })
    .await
    .unwrap_or_else(|e| Err(AppError::crop(format!("Task join failed: {}", e))));

    let image = crop_service::finish_crop(&mut state.flow(), result)?;
    if let Err(e) = state.save_session() {
        tracing::warn!(error = %e, "failed to save session");
    }
    Ok(image.to_string())
}

/// Leave the flow from any stage. Cancelling an open crop UI reports
/// `CropCancelled` so the frontend can tell the user.
#[tauri::command]
pub async fn cancel_crop(state: State<'_, AppState>) -> Result<FlowState, AppError> {
    let mut flow = state.flow();
    if flow.pending_crop().is_some() {
        flow.crop_finished(Err(AppError::CropCancelled))?;
    } else {
        flow.cancel();
    }
    Ok(flow.state().clone())
}

fn to_reference(file: FilePath) -> Option<ImageReference> {
    match file {
        FilePath::Path(path) => Some(ImageReference::from_path(&path)),
        FilePath::Url(url) => ImageReference::parse(url.as_str()),
    }
}
