use crate::error::AppError;
use crate::state::AppState;
use tauri::State;

#[tauri::command]
pub async fn save_session(state: State<'_, AppState>) -> Result<(), AppError> {
    state.save_session()
}

/// Re-read the saved image reference and make it current.
#[tauri::command]
pub async fn restore_session(state: State<'_, AppState>) -> Result<Option<String>, AppError> {
    Ok(state.restore_session().map(|r| r.to_string()))
}
