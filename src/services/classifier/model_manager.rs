use crate::error::AppError;
use crate::models::classify_types::ModelStatus;
use crate::services::classifier::inference::{run_inference, InferenceOutput, ScoreModel};
use ndarray::Array4;
use ort::session::Session;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};

/// Owns the single model handle. Cheap to clone; clones share the handle.
pub struct ModelManager<M = Session> {
    pub model_name: String,
    model: Arc<Mutex<Option<M>>>,
    loading: Arc<AtomicBool>,
    error: Arc<Mutex<Option<String>>>,
    cancel_flag: Arc<AtomicBool>,
}

impl<M> Clone for ModelManager<M> {
    fn clone(&self) -> Self {
        Self {
            model_name: self.model_name.clone(),
            model: self.model.clone(),
            loading: self.loading.clone(),
            error: self.error.clone(),
            cancel_flag: self.cancel_flag.clone(),
        }
    }
}

impl<M: ScoreModel> ModelManager<M> {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            model: Arc::new(Mutex::new(None)),
            loading: Arc::new(AtomicBool::new(false)),
            error: Arc::new(Mutex::new(None)),
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_model(model_name: impl Into<String>, model: M) -> Self {
        let manager = Self::new(model_name);
        manager.install(model);
        manager
    }

    pub fn install(&self, model: M) {
        *lock(&self.model) = Some(model);
    }

    /// Keeps the first load failure; later failures are only logged.
    pub fn record_error(&self, message: String) {
        let mut slot = lock(&self.error);
        if slot.is_none() {
            *slot = Some(message);
        } else {
            tracing::debug!(%message, "model error already recorded");
        }
    }

    pub fn is_ready(&self) -> bool {
        lock(&self.model).is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Relaxed)
    }

    pub fn get_error(&self) -> Option<String> {
        lock(&self.error).clone()
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            model_name: self.model_name.clone(),
            loading: self.is_loading(),
            ready: self.is_ready(),
            error: self.get_error(),
        }
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    fn reset_cancel_flag(&self) {
        self.cancel_flag.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Runs one forward pass. A failed load short-circuits with the load error;
    /// a second caller while a pass is running gets `Busy` and leaves the
    /// running pass's cancel state alone.
    pub fn classify(
        &self,
        input: Array4<f32>,
        expected_len: usize,
    ) -> Result<InferenceOutput, AppError> {
        if let Some(err) = self.get_error() {
            return Err(AppError::ModelUnavailable(err));
        }

        let mut guard = match self.model.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(AppError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let model = guard.as_mut().ok_or_else(|| {
            AppError::ModelUnavailable(format!("Model {} is not loaded yet", self.model_name))
        })?;

        // Only the holder of the model may clear a pending cancel.
        self.reset_cancel_flag();
        let output = run_inference(model, input, expected_len)?;
        if self.is_cancelled() {
            tracing::info!("discarding result of cancelled analysis");
            return Err(AppError::Cancelled);
        }

        Ok(output)
    }
}

impl ModelManager<Session> {
    /// Load the bundled model on a blocking worker. Failure is recorded once and
    /// every later `classify` reports it.
    pub async fn load_model(
        &self,
        model_path: PathBuf,
        use_gpu: bool,
        intra_threads: usize,
    ) -> Result<(), AppError> {
        self.loading.store(true, Ordering::Relaxed);

        let result = tokio::task::spawn_blocking(move || -> Result<Session, AppError> {
            if !model_path.exists() {
                return Err(AppError::ModelLoad(format!(
                    "model asset not found: {}",
                    model_path.display()
                )));
            }

            let _ = ort::init().with_name("asclepius").commit();

            let mut builder = Session::builder()
                .map_err(|e| AppError::ModelLoad(format!("Failed to create session builder: {}", e)))?
                .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
                .map_err(|e| AppError::ModelLoad(format!("Failed to set optimization level: {}", e)))?
                .with_intra_threads(intra_threads)
                .map_err(|e| AppError::ModelLoad(format!("Failed to set intra threads: {}", e)))?;

            if use_gpu {
                builder = builder
                    .with_execution_providers([
                        ort::execution_providers::DirectMLExecutionProvider::default().build(),
                        ort::execution_providers::CoreMLExecutionProvider::default().build(),
                        ort::execution_providers::CUDAExecutionProvider::default().build(),
                        ort::execution_providers::CPUExecutionProvider::default().build(),
                    ])
                    .map_err(|e| AppError::ModelLoad(format!("Failed to register GPU execution providers: {}", e)))?;
            } else {
                builder = builder
                    .with_execution_providers([
                        ort::execution_providers::CPUExecutionProvider::default().build(),
                    ])
                    .map_err(|e| AppError::ModelLoad(format!("Failed to register CPU execution provider: {}", e)))?;
            }

            builder
                .commit_from_file(&model_path)
                .map_err(|e| AppError::ModelLoad(format!("{}: {}", model_path.display(), e)))
        })
        .await
        .map_err(|e| AppError::ModelLoad(format!("Failed to spawn model loading task: {}", e)))
        .and_then(|r| r);

        self.loading.store(false, Ordering::Relaxed);

        match result {
            Ok(session) => {
                self.install(session);
                tracing::info!(model = %self.model_name, "model loaded");
                Ok(())
            }
            Err(e) => {
                tracing::error!(model = %self.model_name, error = %e, "Error initializing model");
                self.record_error(e.to_string());
                Err(e)
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::inference::tests::FixedModel;
    use std::sync::mpsc;
    use std::time::Duration;

    fn input() -> Array4<f32> {
        Array4::zeros((1, 4, 4, 3))
    }

    #[test]
    fn ready_model_classifies() {
        let manager = ModelManager::with_model("test", FixedModel::new(vec![0.3, 0.7]));
        assert!(manager.is_ready());
        let out = manager.classify(input(), 2).unwrap();
        assert_eq!(out.scores, vec![0.3, 0.7]);
    }

    #[test]
    fn load_failure_short_circuits_every_request() {
        let manager: ModelManager<FixedModel> = ModelManager::new("test");
        manager.record_error("Failed to load model: missing".into());
        manager.record_error("second failure".into());

        for _ in 0..3 {
            match manager.classify(input(), 2) {
                Err(AppError::ModelUnavailable(msg)) => {
                    assert_eq!(msg, "Failed to load model: missing")
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(manager.status().error.as_deref(), Some("Failed to load model: missing"));
    }

    #[test]
    fn unloaded_model_is_unavailable() {
        let manager: ModelManager<FixedModel> = ModelManager::new("test");
        assert!(matches!(
            manager.classify(input(), 2),
            Err(AppError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn stale_cancel_does_not_affect_next_run() {
        let manager = ModelManager::with_model("test", FixedModel::new(vec![0.3, 0.7]));
        manager.cancel();
        assert!(manager.classify(input(), 2).is_ok());
        assert!(!manager.is_cancelled());
    }

    struct GatedModel {
        entered: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }

    impl ScoreModel for GatedModel {
        fn infer(&mut self, _input: Array4<f32>) -> Result<Vec<f32>, AppError> {
            self.entered.send(()).unwrap();
            self.release.recv_timeout(Duration::from_secs(5)).unwrap();
            Ok(vec![1.0, 0.0])
        }
    }

    fn gated() -> (ModelManager<GatedModel>, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let manager = ModelManager::with_model(
            "test",
            GatedModel {
                entered: entered_tx,
                release: release_rx,
            },
        );
        (manager, entered_rx, release_tx)
    }

    #[test]
    fn concurrent_request_is_busy() {
        let (manager, entered_rx, release_tx) = gated();

        let worker = {
            let manager = manager.clone();
            std::thread::spawn(move || manager.classify(input(), 2))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(matches!(manager.classify(input(), 2), Err(AppError::Busy)));

        release_tx.send(()).unwrap();
        assert!(worker.join().unwrap().is_ok());
    }

    #[test]
    fn cancel_during_run_discards_result() {
        let (manager, entered_rx, release_tx) = gated();
        let worker = {
            let manager = manager.clone();
            std::thread::spawn(move || manager.classify(input(), 2))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        manager.cancel();
        release_tx.send(()).unwrap();
        assert!(matches!(worker.join().unwrap(), Err(AppError::Cancelled)));
    }

    #[test]
    fn busy_request_keeps_pending_cancel() {
        let (manager, entered_rx, release_tx) = gated();
        let worker = {
            let manager = manager.clone();
            std::thread::spawn(move || manager.classify(input(), 2))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        manager.cancel();
        assert!(matches!(manager.classify(input(), 2), Err(AppError::Busy)));
        assert!(manager.is_cancelled());

        release_tx.send(()).unwrap();
        assert!(matches!(worker.join().unwrap(), Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn missing_asset_is_recorded_once() {
        let dir = tempfile::tempdir().unwrap();
        let manager: ModelManager = ModelManager::new("cancer_classification.onnx");
        let err = manager
            .load_model(dir.path().join("cancer_classification.onnx"), false, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ModelLoad(_)));
        assert!(!manager.is_ready());
        assert!(!manager.is_loading());
        assert_eq!(manager.get_error(), Some(err.to_string()));
    }
}
