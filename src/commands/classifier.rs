use crate::error::AppError;
use crate::models::classify_types::{AnalysisOutcome, ModelStatus, ResultHandoff, ResultView};
use crate::services::classifier::model_manager::ModelManager;
use crate::services::classifier::pipeline;
use crate::state::AppState;
use tauri::{AppHandle, Emitter, State};

pub const EMPTY_IMAGE_WARNING: &str = "Please select an image first";

#[tauri::command]
pub async fn get_model_status(model_manager: State<'_, ModelManager>) -> Result<ModelStatus, AppError> {
    Ok(model_manager.status())
}

/// Classify the current image off the UI thread. On a prediction the result is
/// parked for the display screen and `navigate-result` is emitted.
#[tauri::command]
pub async fn analyze_image(
    app: AppHandle,
    model_manager: State<'_, ModelManager>,
    state: State<'_, AppState>,
) -> Result<AnalysisOutcome, AppError> {
    let reference = state
        .current_image()
        .ok_or_else(|| AppError::EmptySelection(EMPTY_IMAGE_WARNING.to_string()))?;

    let manager = model_manager.inner().clone();
    let config = state.config.clone();
    let task_reference = reference.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        pipeline::analyze(&manager, &task_reference, &config)
    })
    .await
    .map_err(|e| AppError::inference(format!("Task join failed: {}", e)))??;

    if let AnalysisOutcome::Navigate {
        ref result_text,
        ref image_uri,
        ..
    } = outcome
    {
        let handoff = ResultHandoff {
            result_text: Some(result_text.clone()),
            image_uri: Some(image_uri.clone()),
        };
        state.park_result(handoff.clone());
        if let Err(e) = app.emit("navigate-result", &handoff) {
            tracing::warn!(error = %e, "failed to emit navigate-result");
        }
    }

    Ok(outcome)
}

#[tauri::command]
pub async fn cancel_analysis(model_manager: State<'_, ModelManager>) -> Result<(), AppError> {
    model_manager.cancel();
    Ok(())
}

/// Called once by the result screen; a second call sees the fallbacks.
#[tauri::command]
pub async fn take_result(state: State<'_, AppState>) -> Result<ResultView, AppError> {
    Ok(ResultView::from_handoff(state.take_result()))
}
