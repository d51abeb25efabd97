//! Application configuration.

use serde::Serialize;

pub const DEFAULT_MODEL_ASSET: &str = "cancer_classification.onnx";
pub const DEFAULT_LABELS: [&str; 2] = ["Non Cancer", "Cancer"];
pub const DEFAULT_INPUT_SIZE: u32 = 224;
pub const DEFAULT_MAX_CROP: u32 = 800;

/// Memory order the model expects for its single input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, H, W, C]`
    Nhwc,
    /// `[1, C, H, W]`
    Nchw,
}

impl TensorLayout {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nhwc" => Some(TensorLayout::Nhwc),
            "nchw" => Some(TensorLayout::Nchw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// File name of the model inside the resource directory
    pub model_asset: String,
    /// Class names, index-aligned with the model output
    pub labels: Vec<String>,
    /// Square spatial size of the model input
    pub input_size: u32,
    pub layout: TensorLayout,
    /// Crop output is scaled down to fit this square
    pub max_crop_size: u32,
    pub use_gpu: bool,
    pub intra_threads: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_asset: DEFAULT_MODEL_ASSET.to_string(),
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
            input_size: DEFAULT_INPUT_SIZE,
            layout: TensorLayout::Nhwc,
            max_crop_size: DEFAULT_MAX_CROP,
            use_gpu: false,
            intra_threads: 1,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `ASCLEPIUS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            model_asset: lookup("ASCLEPIUS_MODEL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.model_asset),
            labels: lookup("ASCLEPIUS_LABELS")
                .map(|s| {
                    s.split(',')
                        .map(|l| l.trim().to_string())
                        .filter(|l| !l.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|labels| !labels.is_empty())
                .unwrap_or(defaults.labels),
            input_size: lookup("ASCLEPIUS_INPUT_SIZE")
                .and_then(|s| s.parse().ok())
                .filter(|&n: &u32| n > 0)
                .unwrap_or(defaults.input_size),
            layout: lookup("ASCLEPIUS_LAYOUT")
                .and_then(|s| TensorLayout::parse(&s))
                .unwrap_or(defaults.layout),
            max_crop_size: lookup("ASCLEPIUS_MAX_CROP")
                .and_then(|s| s.parse().ok())
                .filter(|&n: &u32| n > 0)
                .unwrap_or(defaults.max_crop_size),
            use_gpu: lookup("ASCLEPIUS_USE_GPU")
                .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.use_gpu),
            intra_threads: lookup("ASCLEPIUS_THREADS")
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.intra_threads),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_bundled_model() {
        let config = config_with(&[]);
        assert_eq!(config.model_asset, "cancer_classification.onnx");
        assert_eq!(config.labels, vec!["Non Cancer", "Cancer"]);
        assert_eq!(config.input_size, 224);
        assert_eq!(config.layout, TensorLayout::Nhwc);
        assert_eq!(config.max_crop_size, 800);
        assert!(!config.use_gpu);
    }

    #[test]
    fn env_overrides_apply() {
        let config = config_with(&[
            ("ASCLEPIUS_LABELS", "benign, malignant ,"),
            ("ASCLEPIUS_LAYOUT", "NCHW"),
            ("ASCLEPIUS_INPUT_SIZE", "299"),
            ("ASCLEPIUS_USE_GPU", "true"),
        ]);
        assert_eq!(config.labels, vec!["benign", "malignant"]);
        assert_eq!(config.layout, TensorLayout::Nchw);
        assert_eq!(config.input_size, 299);
        assert!(config.use_gpu);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_with(&[
            ("ASCLEPIUS_INPUT_SIZE", "0"),
            ("ASCLEPIUS_LAYOUT", "chw"),
            ("ASCLEPIUS_LABELS", " , "),
        ]);
        assert_eq!(config.input_size, 224);
        assert_eq!(config.layout, TensorLayout::Nhwc);
        assert_eq!(config.labels.len(), 2);
    }
}
