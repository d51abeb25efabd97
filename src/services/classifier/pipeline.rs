use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::classify_types::AnalysisOutcome;
use crate::models::image_types::ImageReference;
use crate::services::classifier::inference::{self, ScoreModel};
use crate::services::classifier::model_manager::ModelManager;
use crate::services::classifier::presentation::{self, NO_RESULTS_MESSAGE};
use crate::services::image_service;

/// Decode, preprocess, infer and pick the label for one image. Blocking.
pub fn analyze<M: ScoreModel>(
    manager: &ModelManager<M>,
    reference: &ImageReference,
    config: &AppConfig,
) -> Result<AnalysisOutcome, AppError> {
    // Surface a failed load before paying for the decode.
    if let Some(err) = manager.get_error() {
        return Err(AppError::ModelUnavailable(err));
    }

    let img = image_service::decode_reference(reference).map_err(|e| {
        tracing::error!(%reference, error = %e, "Error decoding image");
        e
    })?;
    let tensor = inference::preprocess_image(&img, config.input_size, config.layout)?;
    let output = manager.classify(tensor, config.labels.len())?;

    match presentation::top_prediction(Some(&output.scores), &config.labels) {
        Some(prediction) => {
            tracing::info!(
                label = %prediction.class_name,
                percent = prediction.percent,
                inference_time_ms = output.inference_time_ms,
                "classified image"
            );
            Ok(AnalysisOutcome::Navigate {
                result_text: prediction.display_text(),
                image_uri: reference.to_string(),
                inference_time_ms: output.inference_time_ms,
            })
        }
        None => {
            tracing::warn!(%reference, "model returned no scores");
            Ok(AnalysisOutcome::NoResults {
                message: NO_RESULTS_MESSAGE.to_string(),
            })
        }
    }
}
