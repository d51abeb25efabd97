use crate::config::AppConfig;
use crate::models::classify_types::ResultHandoff;
use crate::models::image_types::ImageReference;
use crate::services::crop_flow::CropFlow;
use crate::services::session_store::SessionStore;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Per-window state shared by the commands.
pub struct AppState {
    pub config: AppConfig,
    pub cache_dir: PathBuf,
    pub session: SessionStore,
    flow: Mutex<CropFlow>,
    handoff: Mutex<Option<ResultHandoff>>,
}

impl AppState {
    pub fn new(config: AppConfig, cache_dir: PathBuf, session: SessionStore) -> Self {
        Self {
            config,
            cache_dir,
            session,
            flow: Mutex::new(CropFlow::default()),
            handoff: Mutex::new(None),
        }
    }

    pub fn flow(&self) -> MutexGuard<'_, CropFlow> {
        self.flow.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn current_image(&self) -> Option<ImageReference> {
        self.flow().current_image().cloned()
    }

    /// Park the result for the display screen; replaces any unread one.
    pub fn park_result(&self, handoff: ResultHandoff) {
        *self.handoff.lock().unwrap_or_else(|p| p.into_inner()) = Some(handoff);
    }

    /// Hand the parked result over exactly once.
    pub fn take_result(&self) -> Option<ResultHandoff> {
        self.handoff.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    /// Restore the saved image reference, if any. Never touches the picker or model.
    pub fn restore_session(&self) -> Option<ImageReference> {
        match self.session.load() {
            Ok(Some(image)) => {
                tracing::info!(%image, "restored current image");
                self.flow().restore(image.clone());
                Some(image)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "could not restore session");
                None
            }
        }
    }

    pub fn save_session(&self) -> Result<(), crate::error::AppError> {
        let current = self.current_image();
        self.session.save(current.as_ref())
    }
}
