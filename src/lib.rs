// Library exports for facemood - Happy/Sad face emotion classifier

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod decode;
pub mod detector;
pub mod error;
pub mod frontend;
pub mod live;
pub mod models;
pub mod pipeline;
pub mod preprocess;
pub mod server;

#[cfg(feature = "webcam")]
pub mod camera;

pub use classifier::{EmotionClassifier, EmotionModel};
pub use config::{AppConfig, DetectionParams, PipelineProfile};
pub use detector::FaceLocator;
pub use error::{PipelineError, Result};
pub use models::{BoundingBox, EmotionLabel, EmotionResult, PredictionResponse};
pub use pipeline::InferencePipeline;
