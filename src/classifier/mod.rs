//! Binary image classifier - ONNX Runtime integration
//!
//! Loads the exported two-class trimming model once at startup and runs
//! single-image forward passes. A failed load leaves the session absent;
//! the service keeps running and every prediction short-circuits with a
//! model-absent payload instead of crashing.

pub mod preprocess;

use std::path::{Path, PathBuf};

use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use thiserror::Error;

#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;

use crate::config::Config;
use crate::models::Prediction;

/// Input resolution expected by the network
pub const IMG_SIZE: u32 = 224;

/// Ordered class labels; index matches the model's output logits
pub const CLASSES: [&str; 2] = ["no_trim", "trim"];

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error("Model not found: {}", .0.display())]
    MissingWeights(PathBuf),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Inference failed: {0}")]
    Inference(#[from] ort::Error),
    #[error("Unexpected model output: {0}")]
    Output(String),
}

/// Loaded classifier state, immutable after construction.
///
/// The session sits behind a mutex because ONNX Runtime takes `&mut` to
/// run; there is no other shared mutability.
pub struct Classifier {
    session: Option<Mutex<Session>>,
    device: String,
}

impl Classifier {
    /// Build the classifier from configuration. Never fails: a load error
    /// is logged and recorded as an absent session so the service can
    /// still start and answer health checks.
    pub fn load(config: &Config) -> Self {
        let device = if config.use_cuda && cfg!(feature = "cuda") {
            "cuda"
        } else {
            "cpu"
        };

        let session = match Self::build_session(&config.model_path, config.use_cuda) {
            Ok(session) => {
                tracing::info!(
                    "Model loaded successfully on {} ({})",
                    device,
                    config.model_path.display()
                );
                Some(Mutex::new(session))
            }
            Err(e) => {
                tracing::error!("Error loading model: {}", e);
                None
            }
        };

        Self {
            session,
            device: device.to_string(),
        }
    }

    fn build_session(model_path: &Path, use_cuda: bool) -> Result<Session, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::MissingWeights(model_path.to_path_buf()));
        }

        let builder = Session::builder()?;

        #[cfg(feature = "cuda")]
        let builder = if use_cuda {
            builder.with_execution_providers([CUDAExecutionProvider::default().build()])?
        } else {
            builder
        };

        #[cfg(not(feature = "cuda"))]
        if use_cuda {
            tracing::warn!("USE_CUDA is set but the cuda feature is not compiled in; using CPU");
        }

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::from)?
            .commit_from_file(model_path)?;

        Ok(session)
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Classify the image at `path`. Always returns a `Prediction`:
    /// model-absent and runtime failures come back as error-shaped
    /// payloads, never as panics or propagated errors.
    pub fn predict_file(&self, path: &Path) -> Prediction {
        match self.try_predict(path) {
            Ok(prediction) => prediction,
            Err(ClassifierError::ModelNotLoaded) => Prediction::model_absent(),
            Err(e) => {
                tracing::error!("Error during prediction: {}", e);
                Prediction::failed(e.to_string())
            }
        }
    }

    fn try_predict(&self, path: &Path) -> Result<Prediction, ClassifierError> {
        let session = self.session.as_ref().ok_or(ClassifierError::ModelNotLoaded)?;

        let img = image::open(path)?;
        let input = preprocess::to_tensor(&img);

        let (class_idx, confidence) = Self::forward(session, input)?;
        Ok(Prediction::success(CLASSES[class_idx], confidence))
    }

    fn forward(
        session: &Mutex<Session>,
        input: Array4<f32>,
    ) -> Result<(usize, f32), ClassifierError> {
        let mut session = session.lock();

        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| ClassifierError::Output("model defines no outputs".to_string()))?;

        let input_tensor = Value::from_array(input)?;
        let outputs = session.run(ort::inputs![input_tensor])?;

        let output = outputs
            .get(&output_name)
            .ok_or_else(|| ClassifierError::Output("missing output tensor".to_string()))?;

        let (_, logits) = output.try_extract_tensor::<f32>()?;
        if logits.len() < CLASSES.len() {
            return Err(ClassifierError::Output(format!(
                "expected {} logits, got {}",
                CLASSES.len(),
                logits.len()
            )));
        }

        let probabilities = softmax(&logits[..CLASSES.len()]);
        Ok(argmax(&probabilities))
    }
}

/// Numerically stable softmax over raw class scores
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|&e| e / sum).collect()
}

/// Index and value of the maximum-probability class
fn argmax(probabilities: &[f32]) -> (usize, f32) {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, p)| {
            if p > best.1 {
                (i, p)
            } else {
                best
            }
        })
}
