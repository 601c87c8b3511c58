//! ONNX Runtime segmenter for U²-Net style background removal models.
//!
//! One ONNX session is created per worker. ort sessions need exclusive
//! access while running, so each sits behind its own mutex and a request
//! takes the first free one.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use image::{GrayImage, RgbImage};
use ndarray::{Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use super::segmenter::{image_to_tensor, prediction_to_mask, Segmenter};
use crate::error::{ModelError, ProcessingError};

/// Default model location, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "models/u2net.onnx";

/// Default ONNX Runtime intra-op threads per session.
pub const DEFAULT_INTRA_THREADS: usize = 1;

/// Segmenter backed by an ONNX model file.
pub struct OnnxSegmenter {
    sessions: Vec<Mutex<Session>>,
    next: AtomicUsize,
    input_name: String,
    name: String,
}

impl std::fmt::Debug for OnnxSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSegmenter")
            .field("name", &self.name)
            .field("input_name", &self.input_name)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl OnnxSegmenter {
    /// Load `sessions` copies of the model at `model_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, ONNX Runtime cannot
    /// load it, or `sessions`/`intra_threads` is zero.
    pub fn load(
        model_path: impl AsRef<Path>,
        sessions: usize,
        intra_threads: usize,
    ) -> Result<Self, ModelError> {
        let model_path = model_path.as_ref();

        if sessions == 0 {
            return Err(ModelError::InvalidConfig(
                "session count must be greater than 0".to_string(),
            ));
        }
        if intra_threads == 0 {
            return Err(ModelError::InvalidConfig(
                "intra_threads must be greater than 0".to_string(),
            ));
        }
        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path.to_path_buf()));
        }

        info!(
            "Loading segmentation model from {} ({} session(s), {} thread(s) each)",
            model_path.display(),
            sessions,
            intra_threads
        );

        let mut loaded = Vec::with_capacity(sessions);
        for _ in 0..sessions {
            loaded.push(Mutex::new(build_session(model_path, intra_threads)?));
        }

        let input_name = loaded
            .first()
            .and_then(|session| session.lock().ok())
            .and_then(|session| session.inputs.first().map(|input| input.name.clone()))
            .unwrap_or_else(|| "input.1".to_string());

        let name = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        debug!("Segmentation model '{}' input: {}", name, input_name);

        Ok(Self {
            sessions: loaded,
            next: AtomicUsize::new(0),
            input_name,
            name,
        })
    }

    /// Number of loaded sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Take the first unlocked session, or wait on one in rotation.
    fn acquire_session(&self) -> Result<MutexGuard<'_, Session>, ProcessingError> {
        let count = self.sessions.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed);

        for offset in 0..count {
            if let Ok(session) = self.sessions[(start + offset) % count].try_lock() {
                return Ok(session);
            }
        }

        self.sessions[start % count]
            .lock()
            .map_err(|_| ProcessingError::Model("model session lock poisoned".to_string()))
    }
}

fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session, ModelError> {
    Session::builder()
        .map_err(load_error)?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .map_err(load_error)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(load_error)?
        .with_intra_threads(intra_threads)
        .map_err(load_error)?
        .commit_from_file(model_path)
        .map_err(load_error)
}

fn load_error(e: impl std::fmt::Display) -> ModelError {
    ModelError::Load(e.to_string())
}

impl Segmenter for OnnxSegmenter {
    fn name(&self) -> &str {
        &self.name
    }

    fn segment(&self, image: &RgbImage) -> Result<GrayImage, ProcessingError> {
        let input = Value::from_array(image_to_tensor(image))
            .map_err(|e| ProcessingError::Model(format!("failed to create input tensor: {}", e)))?;

        let mut session = self.acquire_session()?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input])
            .map_err(|e| ProcessingError::Model(format!("inference failed: {}", e)))?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ProcessingError::Model(format!("failed to extract output: {}", e)))?;

        // Outputs are [1, 1, H, W]; drop leading axes down to [H, W].
        let mut prediction = output.view();
        while prediction.ndim() > 2 {
            prediction = prediction.index_axis_move(Axis(0), 0);
        }
        let prediction = prediction.into_dimensionality::<Ix2>().map_err(|e| {
            ProcessingError::Model(format!("unexpected output shape {:?}: {}", output.shape(), e))
        })?;

        Ok(prediction_to_mask(prediction))
    }
}
