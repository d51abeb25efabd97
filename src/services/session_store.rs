use crate::error::AppError;
use crate::models::image_types::ImageReference;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedSession {
    #[serde(rename = "currentImageUri", default, skip_serializing_if = "Option::is_none")]
    current_image_uri: Option<String>,
}

/// Persists the current image reference (the handle string, never the bytes)
/// so it survives the window being torn down and rebuilt.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    pub fn save(&self, current: Option<&ImageReference>) -> Result<(), AppError> {
        let session = SavedSession {
            current_image_uri: current.map(|r| r.to_string()),
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&session)?;
        // Replace atomically
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// `Ok(None)` when nothing (or an empty string) was saved.
    pub fn load(&self) -> Result<Option<ImageReference>, AppError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session: SavedSession = serde_json::from_slice(&bytes)?;
        Ok(session
            .current_image_uri
            .as_deref()
            .and_then(ImageReference::parse))
    }
}
