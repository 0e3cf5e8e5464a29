// Binary emotion classification on preprocessed face tensors

use std::sync::Arc;

use crate::config::FACE_INPUT_SIZE;
use crate::error::{PipelineError, Result};
use crate::models::EmotionProbability;
use crate::preprocess::FaceTensor;

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmotionModel;

/// A pre-trained binary model with a single sigmoid output.
pub trait EmotionModel: Send + Sync {
    /// Raw output for one `[1, 224, 224, 3]` tensor: probability of "Sad"
    fn predict(&self, tensor: &FaceTensor) -> Result<f32>;
}

/// Shared, read-only handle over the loaded emotion model
#[derive(Clone)]
pub struct EmotionClassifier {
    model: Arc<dyn EmotionModel>,
}

impl EmotionClassifier {
    pub fn new(model: Arc<dyn EmotionModel>) -> Self {
        Self { model }
    }

    /// Runs the model and returns the "Sad" class probability
    pub fn classify(&self, tensor: &FaceTensor) -> Result<EmotionProbability> {
        let side = FACE_INPUT_SIZE as usize;
        let expected = [1, side, side, 3];
        if tensor.shape() != expected {
            return Err(PipelineError::Inference(format!(
                "classifier expects {expected:?}, got {:?}",
                tensor.shape()
            )));
        }

        let raw = self.model.predict(tensor)?;
        if !raw.is_finite() {
            return Err(PipelineError::Inference(format!(
                "model produced a non-finite output: {raw}"
            )));
        }

        Ok(EmotionProbability::new(f64::from(raw)))
    }
}

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;
    use std::sync::Mutex;

    use ort::session::builder::GraphOptimizationLevel;
    use ort::session::Session;
    use ort::value::Tensor;
    use tracing::{error, info};

    use super::EmotionModel;
    use crate::config::TensorLayout;
    use crate::error::{PipelineError, Result};
    use crate::preprocess::FaceTensor;

    /// Emotion model using ONNX Runtime
    pub struct OnnxEmotionModel {
        session: Mutex<Session>,
        layout: TensorLayout,
    }

    impl OnnxEmotionModel {
        /// Loads the ONNX model; any failure here is fatal for serving
        pub fn load(model_path: &Path, layout: TensorLayout) -> Result<Self> {
            if !model_path.exists() {
                return Err(PipelineError::ModelLoad(format!(
                    "emotion model not found at {}",
                    model_path.display()
                )));
            }

            let session = Session::builder()
                .map_err(|e| {
                    PipelineError::ModelLoad(format!("Failed to create session builder: {e}"))
                })?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| PipelineError::ModelLoad(format!("ORT opt level: {e}")))?
                .commit_from_file(model_path)
                .map_err(|e| {
                    error!("Failed to load ONNX model: {}", e);
                    PipelineError::ModelLoad(format!("ONNX model load failed: {e}"))
                })?;

            info!(path = %model_path.display(), ?layout, "emotion model loaded");
            Ok(Self {
                session: Mutex::new(session),
                layout,
            })
        }
    }

    impl EmotionModel for OnnxEmotionModel {
        fn predict(&self, tensor: &FaceTensor) -> Result<f32> {
            let [n, h, w, c] = tensor.shape();
            let (shape, values) = match self.layout {
                TensorLayout::Nhwc => (vec![n, h, w, c], tensor.to_nhwc()),
                TensorLayout::Nchw => (vec![n, c, h, w], tensor.to_nchw()),
            };

            let input = Tensor::from_array((shape, values.into_boxed_slice())).map_err(|e| {
                PipelineError::Inference(format!("Failed to create input tensor: {e}"))
            })?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| PipelineError::Inference("ORT session poisoned".to_string()))?;

            let outputs = session.run(ort::inputs![input]).map_err(|e| {
                error!("ONNX inference failed: {}", e);
                PipelineError::Inference(format!("Inference failed: {e}"))
            })?;

            let (_, output) = outputs
                .iter()
                .next()
                .ok_or_else(|| PipelineError::Inference("No output from model".to_string()))?;

            let (_, data) = output.try_extract_tensor::<f32>().map_err(|e| {
                PipelineError::Inference(format!("Failed to extract output tensor: {e}"))
            })?;

            let value = data.first().copied();
            value.ok_or_else(|| PipelineError::Inference("Model output is empty".to_string()))
        }
    }
}
