use crate::error::AppError;
use crate::models::crop_types::AspectRatio;
use crate::models::image_types::ImageReference;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FlowState {
    Idle,
    PickerOpen,
    AspectChoiceOpen {
        source: ImageReference,
    },
    CropUiOpen {
        source: ImageReference,
        ratio: AspectRatio,
    },
    Cropped {
        image: ImageReference,
    },
}

impl FlowState {
    fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::PickerOpen => "picker open",
            FlowState::AspectChoiceOpen { .. } => "aspect choice open",
            FlowState::CropUiOpen { .. } => "crop UI open",
            FlowState::Cropped { .. } => "cropped",
        }
    }
}

/// Pick -> aspect ratio -> crop. The current image only changes on a finished
/// crop; leaving the flow any other way keeps whatever was shown before.
#[derive(Debug)]
pub struct CropFlow {
    state: FlowState,
    current: Option<ImageReference>,
}

impl Default for CropFlow {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CropFlow {
    pub fn new(current: Option<ImageReference>) -> Self {
        Self {
            state: FlowState::Idle,
            current,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn current_image(&self) -> Option<&ImageReference> {
        self.current.as_ref()
    }

    /// Replace the current image without going through the flow (restore).
    pub fn restore(&mut self, image: ImageReference) {
        self.current = Some(image);
        self.state = FlowState::Idle;
    }

    pub fn open_picker(&mut self) -> Result<(), AppError> {
        match self.state {
            FlowState::Idle | FlowState::Cropped { .. } => {
                self.state = FlowState::PickerOpen;
                Ok(())
            }
            ref other => Err(self.rejected("open the picker", other)),
        }
    }

    /// Returns `true` when a selection moved the flow on to the aspect chooser.
    pub fn picked(&mut self, selection: Option<ImageReference>) -> Result<bool, AppError> {
        if self.state != FlowState::PickerOpen {
            return Err(self.rejected("accept a picker result", &self.state));
        }
        match selection {
            Some(source) => {
                self.state = FlowState::AspectChoiceOpen { source };
                Ok(true)
            }
            None => {
                tracing::debug!("No media selected");
                self.state = FlowState::Idle;
                Ok(false)
            }
        }
    }

    /// `None` means the chooser was dismissed.
    pub fn choose_aspect(
        &mut self,
        ratio: Option<AspectRatio>,
    ) -> Result<Option<(ImageReference, AspectRatio)>, AppError> {
        let source = match &self.state {
            FlowState::AspectChoiceOpen { source } => source.clone(),
            other => return Err(self.rejected("choose an aspect ratio", other)),
        };
        match ratio {
            Some(ratio) => {
                self.state = FlowState::CropUiOpen {
                    source: source.clone(),
                    ratio,
                };
                Ok(Some((source, ratio)))
            }
            None => {
                self.state = FlowState::Idle;
                Ok(None)
            }
        }
    }

    /// The crop in progress, if the crop UI is open.
    pub fn pending_crop(&self) -> Option<(ImageReference, AspectRatio)> {
        match &self.state {
            FlowState::CropUiOpen { source, ratio } => Some((source.clone(), *ratio)),
            _ => None,
        }
    }

    /// Feed the crop UI's outcome back in. Failure returns the flow to idle
    /// and hands the error back to the caller.
    pub fn crop_finished(
        &mut self,
        result: Result<ImageReference, AppError>,
    ) -> Result<ImageReference, AppError> {
        if self.pending_crop().is_none() {
            return Err(self.rejected("finish a crop", &self.state));
        }
        match result {
            Ok(image) => {
                self.current = Some(image.clone());
                self.state = FlowState::Cropped {
                    image: image.clone(),
                };
                Ok(image)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Cropping cancelled, using previous image");
                self.state = FlowState::Idle;
                Err(e)
            }
        }
    }

    /// Abandon the flow from any stage.
    pub fn cancel(&mut self) {
        if self.state != FlowState::Idle {
            tracing::debug!(from = self.state.name(), "crop flow cancelled");
        }
        self.state = FlowState::Idle;
    }

    fn rejected(&self, action: &str, state: &FlowState) -> AppError {
        AppError::invalid_state(format!("cannot {} while {}", action, state.name()))
    }
}
