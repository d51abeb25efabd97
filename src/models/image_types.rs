use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Opaque handle to image bytes: a `file://` URI or a plain path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// `file://` URI for absolute paths; anything else is kept as a plain path.
    pub fn from_path(path: &Path) -> Self {
        match Url::from_file_path(path) {
            Ok(url) => Self(url.to_string()),
            Err(()) => Self(path.to_string_lossy().into_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the handle to a local file path.
    pub fn to_path(&self) -> Result<PathBuf, AppError> {
        if !self.0.contains("://") {
            return Ok(PathBuf::from(&self.0));
        }

        let url = Url::parse(&self.0)
            .map_err(|e| AppError::decode(format!("invalid image reference '{}': {}", self.0, e)))?;
        if url.scheme() != "file" {
            return Err(AppError::decode(format!(
                "unsupported image reference scheme '{}'",
                url.scheme()
            )));
        }
        url.to_file_path()
            .map_err(|_| AppError::decode(format!("'{}' is not a local file", self.0)))
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
