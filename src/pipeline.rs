// Face-crop-then-classify inference pipeline

use std::sync::Arc;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::classifier::EmotionClassifier;
use crate::config::PipelineProfile;
use crate::decode::{decode, grayscale};
use crate::detector::FaceLocator;
use crate::error::Result;
use crate::models::{BoundingBox, EmotionResult, FaceEmotion};
use crate::preprocess::FacePreprocessor;

/// Decode, locate, crop, classify.
///
/// Holds only shared read-only handles to the loaded detector and
/// classifier, so one instance can serve concurrent calls. Each call is a
/// single synchronous attempt with no state carried over.
#[derive(Clone)]
pub struct InferencePipeline {
    locator: Arc<dyn FaceLocator>,
    classifier: EmotionClassifier,
    profile: PipelineProfile,
    preprocessor: FacePreprocessor,
}

impl InferencePipeline {
    pub fn new(
        locator: Arc<dyn FaceLocator>,
        classifier: EmotionClassifier,
        profile: PipelineProfile,
    ) -> Self {
        Self {
            locator,
            classifier,
            profile,
            preprocessor: FacePreprocessor::new(profile.preprocess),
        }
    }

    pub fn profile(&self) -> &PipelineProfile {
        &self.profile
    }

    /// Same loaded models, different call-site parameters
    pub fn with_profile(&self, profile: PipelineProfile) -> Self {
        Self::new(Arc::clone(&self.locator), self.classifier.clone(), profile)
    }

    /// Runs the full pipeline on encoded image bytes.
    pub fn infer(&self, image_bytes: &[u8]) -> Result<EmotionResult> {
        let grid = decode(image_bytes)?;
        self.infer_grid(&grid)
    }

    /// Classifies the first detected face of an already decoded grid.
    ///
    /// Only the first box in detector order is used; an image without a
    /// face yields [`EmotionResult::no_face`].
    pub fn infer_grid(&self, grid: &RgbImage) -> Result<EmotionResult> {
        let boxes = self.locate(grid)?;

        let Some(&bbox) = boxes.first() else {
            info!("no face detected");
            return Ok(EmotionResult::no_face());
        };

        if boxes.len() > 1 {
            debug!(faces = boxes.len(), %bbox, "multiple faces, using the first");
        }

        let result = self.classify_face(grid, bbox)?;
        info!(
            label = %result.label,
            confidence = result.confidence_percent,
            "prediction complete"
        );
        Ok(result)
    }

    /// Classifies every detected face, in detector order.
    ///
    /// A face that fails to crop or classify is logged and left out; the
    /// others are still returned. Only a detector failure is an error.
    pub fn analyze_faces(&self, grid: &RgbImage) -> Result<Vec<FaceEmotion>> {
        let boxes = self.locate(grid)?;
        let mut faces = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            match self.classify_face(grid, bbox) {
                Ok(result) => faces.push(FaceEmotion { bbox, result }),
                Err(e) => warn!(%bbox, "Skipping face: {}", e),
            }
        }
        Ok(faces)
    }

    fn locate(&self, grid: &RgbImage) -> Result<Vec<BoundingBox>> {
        let gray = grayscale(grid);
        self.locator.locate(&gray, &self.profile.detection)
    }

    fn classify_face(&self, grid: &RgbImage, bbox: BoundingBox) -> Result<EmotionResult> {
        let tensor = self.preprocessor.prepare(grid, bbox)?;
        let probability = self.classifier.classify(&tensor)?;
        Ok(EmotionResult::from_probability(probability))
    }
}
