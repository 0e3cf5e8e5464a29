// Error types for the face emotion pipeline

use crate::models::BoundingBox;
use thiserror::Error;

/// Main error type for the face emotion pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image decoding failed: {0}")]
    Decode(String),

    #[error("Crop {bbox} exceeds image bounds {width}x{height}")]
    CropOutOfBounds {
        bbox: BoundingBox,
        width: u32,
        height: u32,
    },

    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Face detection failed: {0}")]
    FaceDetection(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Invalid dataset layout: {0}")]
    Dataset(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True when the failure was caused by the uploaded bytes rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Decode(_))
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        PipelineError::Decode(err.to_string())
    }
}

// Conversion from OpenCV errors
#[cfg(feature = "opencv")]
impl From<opencv::Error> for PipelineError {
    fn from(err: opencv::Error) -> Self {
        PipelineError::FaceDetection(err.to_string())
    }
}

// Conversion from ONNX Runtime errors
#[cfg(feature = "onnx")]
impl From<ort::Error> for PipelineError {
    fn from(err: ort::Error) -> Self {
        PipelineError::Inference(err.to_string())
    }
}

// Conversion from nokhwa errors
#[cfg(feature = "webcam")]
impl From<nokhwa::NokhwaError> for PipelineError {
    fn from(err: nokhwa::NokhwaError) -> Self {
        match err {
            nokhwa::NokhwaError::OpenDeviceError(device, error) => {
                PipelineError::Camera(format!("Device {device}: {error}"))
            }
            nokhwa::NokhwaError::GetPropertyError { property, error } => {
                PipelineError::Camera(format!("Property {property}: {error}"))
            }
            _ => PipelineError::Camera(err.to_string()),
        }
    }
}
