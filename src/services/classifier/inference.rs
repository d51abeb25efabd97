use crate::config::TensorLayout;
use crate::error::AppError;
use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::time::Instant;

/// Maps a channel value in [0, 255] to [-1, 1]. Must match training-time normalization.
#[inline]
pub fn normalize_channel(value: u8) -> f32 {
    value as f32 / 127.5 - 1.0
}

/// Nearest-neighbour resize to `size` x `size` followed by [-1, 1] normalization.
/// Aspect ratio is not preserved.
pub fn preprocess_image(
    img: &DynamicImage,
    size: u32,
    layout: TensorLayout,
) -> Result<Array4<f32>, AppError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(AppError::decode("image has no pixels"));
    }

    let rgb = img.to_rgb8();
    let (src_w, src_h) = (rgb.width() as u64, rgb.height() as u64);
    let side = size as usize;
    let hw = side * side;

    // Pass 1: sample and normalize into an HWC buffer.
    let mut interleaved = vec![0f32; 3 * hw];
    for y in 0..side {
        let sy = ((y as u64 * src_h) / size as u64) as u32;
        for x in 0..side {
            let sx = ((x as u64 * src_w) / size as u64) as u32;
            let pixel = rgb.get_pixel(sx, sy);
            let off = (y * side + x) * 3;
            interleaved[off] = normalize_channel(pixel[0]);
            interleaved[off + 1] = normalize_channel(pixel[1]);
            interleaved[off + 2] = normalize_channel(pixel[2]);
        }
    }

    let tensor = match layout {
        TensorLayout::Nhwc => Array4::from_shape_vec((1, side, side, 3), interleaved),
        TensorLayout::Nchw => {
            // Pass 2: transpose HWC -> CHW in tiles so reads and the three
            // channel write-heads stay cache resident.
            let mut data = vec![0f32; 3 * hw];
            const TILE: usize = 1024;
            for base in (0..hw).step_by(TILE) {
                let end = (base + TILE).min(hw);
                for i in base..end {
                    let src = i * 3;
                    data[i] = interleaved[src];
                    data[hw + i] = interleaved[src + 1];
                    data[2 * hw + i] = interleaved[src + 2];
                }
            }
            Array4::from_shape_vec((1, 3, side, side), data)
        }
    }
    .map_err(|e| AppError::inference(format!("Failed to create tensor: {}", e)))?;

    Ok(tensor)
}

/// Anything that maps one preprocessed tensor to a flat score vector.
pub trait ScoreModel: Send {
    fn infer(&mut self, input: Array4<f32>) -> Result<Vec<f32>, AppError>;
}

impl ScoreModel for Session {
    fn infer(&mut self, input: Array4<f32>) -> Result<Vec<f32>, AppError> {
        let input_name = self
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| AppError::inference("Model declares no inputs"))?;

        let input_tensor = Value::from_array(input)
            .map_err(|e| AppError::inference(format!("Failed to create tensor value: {}", e)))?;

        let outputs = self
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .map_err(|e| AppError::inference(e.to_string()))?;

        let output_value = outputs
            .values()
            .next()
            .ok_or_else(|| AppError::inference("Model produced no outputs"))?;

        let (_, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::inference(format!("Failed to extract output tensor: {}", e)))?;

        Ok(data.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutput {
    pub scores: Vec<f32>,
    /// Wall-clock time of the forward pass; diagnostic only.
    pub inference_time_ms: u64,
}

/// One blocking forward pass. An empty output is passed through so the caller
/// can report "no results"; any other length must equal `expected_len`.
pub fn run_inference<M: ScoreModel + ?Sized>(
    model: &mut M,
    input: Array4<f32>,
    expected_len: usize,
) -> Result<InferenceOutput, AppError> {
    let start = Instant::now();
    let scores = model.infer(input)?;
    let inference_time_ms = start.elapsed().as_millis() as u64;

    if !scores.is_empty() && scores.len() != expected_len {
        return Err(AppError::inference(format!(
            "expected {} scores, model produced {}",
            expected_len,
            scores.len()
        )));
    }

    tracing::debug!(?scores, inference_time_ms, "inference finished");
    Ok(InferenceOutput {
        scores,
        inference_time_ms,
    })
}
