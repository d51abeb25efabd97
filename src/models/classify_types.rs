use serde::Serialize;

#[derive(Debug, Serialize, Clone)]
pub struct ModelStatus {
    pub model_name: String,
    pub loading: bool,
    pub ready: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Prediction {
    pub class_name: String,
    /// Score truncated to a whole percent.
    pub percent: i32,
}

impl Prediction {
    pub fn display_text(&self) -> String {
        format!("{}: {}%", self.class_name, self.percent)
    }
}

/// What the analysis screen hands to the result screen.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultHandoff {
    pub result_text: Option<String>,
    pub image_uri: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnalysisOutcome {
    #[serde(rename_all = "camelCase")]
    Navigate {
        result_text: String,
        image_uri: String,
        inference_time_ms: u64,
    },
    NoResults { message: String },
}

/// Render-ready content for the result screen.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub result_text: String,
    pub image_uri: Option<String>,
    /// User-facing notice, set when something expected was missing.
    pub notice: Option<String>,
}
