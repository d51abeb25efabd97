use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    /// The model never loaded; carries the original load error.
    #[error("{0}")]
    ModelUnavailable(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("{0}")]
    EmptySelection(String),

    #[error("Cropping cancelled or failed")]
    CropCancelled,

    #[error("Crop failed: {0}")]
    Crop(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Classifier is busy with another image")]
    Busy,

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session error: {0}")]
    Session(String),
}

impl AppError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn crop(msg: impl Into<String>) -> Self {
        Self::Crop(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Stable identifier the frontend switches on.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ModelLoad(_) => "model_load",
            AppError::ModelUnavailable(_) => "model_unavailable",
            AppError::Decode(_) => "decode",
            AppError::Inference(_) => "inference",
            AppError::EmptySelection(_) => "empty_selection",
            AppError::CropCancelled => "crop_cancelled",
            AppError::Crop(_) => "crop",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Busy => "busy",
            AppError::Cancelled => "cancelled",
            AppError::Io(_) => "io",
            AppError::Session(_) => "session",
        }
    }
}

impl Serialize for AppError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<ort::Error> for AppError {
    fn from(err: ort::Error) -> Self {
        AppError::Inference(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Session(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_kind_and_message() {
        let err = AppError::decode("not an image");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "decode");
        assert_eq!(json["message"], "Failed to decode image: not an image");
    }

    #[test]
    fn unavailable_model_repeats_load_message() {
        let err = AppError::ModelUnavailable("Failed to load model: missing".into());
        assert_eq!(err.to_string(), "Failed to load model: missing");
    }
}
