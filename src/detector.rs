// Face localization behind a pluggable detector backend

use image::GrayImage;

use crate::config::DetectionParams;
use crate::error::Result;
use crate::models::BoundingBox;

#[cfg(feature = "opencv")]
pub use cascade::CascadeFaceLocator;

/// Finds candidate face rectangles in a grayscale grid.
///
/// Boxes come back in the backend's scan order, unranked. An image without
/// faces (including a zero-sized one) yields an empty vector, not an error.
/// Implementations are loaded once and shared read-only across requests.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, gray: &GrayImage, params: &DetectionParams) -> Result<Vec<BoundingBox>>;
}

/// Converts a raw detector rectangle into a box inside a `width` x `height`
/// grid, dropping negative, empty or out-of-bounds rectangles.
pub fn to_bounding_box(x: i32, y: i32, w: i32, h: i32, width: u32, height: u32) -> Option<BoundingBox> {
    let (x, y, w, h) = (
        u32::try_from(x).ok()?,
        u32::try_from(y).ok()?,
        u32::try_from(w).ok()?,
        u32::try_from(h).ok()?,
    );
    BoundingBox::new(x, y, w, h).filter(|bbox| bbox.fits_within(width, height))
}

#[cfg(feature = "opencv")]
mod cascade {
    use std::path::Path;
    use std::sync::Mutex;

    use image::GrayImage;
    use opencv::core::{Mat, Rect, Size, Vector};
    use opencv::objdetect::CascadeClassifier;
    use opencv::prelude::*;
    use tracing::{debug, error, info};

    use super::{to_bounding_box, FaceLocator};
    use crate::config::DetectionParams;
    use crate::error::{PipelineError, Result};
    use crate::models::BoundingBox;

    /// Face locator using an OpenCV Haar cascade
    pub struct CascadeFaceLocator {
        // detect_multi_scale needs &mut for its scratch buffers
        classifier: Mutex<CascadeClassifier>,
    }

    impl CascadeFaceLocator {
        /// Loads the cascade XML; a missing or empty cascade is fatal
        pub fn load(path: &Path) -> Result<Self> {
            if !path.exists() {
                return Err(PipelineError::ModelLoad(format!(
                    "Haar cascade not found at {}",
                    path.display()
                )));
            }

            let path_str = path.to_str().ok_or_else(|| {
                PipelineError::ModelLoad(format!("non UTF-8 cascade path {}", path.display()))
            })?;

            let classifier = CascadeClassifier::new(path_str).map_err(|e| {
                error!("Failed to load Haar Cascade: {}", e);
                PipelineError::ModelLoad(format!("Haar Cascade load failed: {e}"))
            })?;

            if classifier.empty()? {
                return Err(PipelineError::ModelLoad(
                    "Haar Cascade classifier is empty".to_string(),
                ));
            }

            info!(path = %path.display(), "Haar cascade loaded");
            Ok(Self {
                classifier: Mutex::new(classifier),
            })
        }
    }

    impl FaceLocator for CascadeFaceLocator {
        fn locate(&self, gray: &GrayImage, params: &DetectionParams) -> Result<Vec<BoundingBox>> {
            let (width, height) = gray.dimensions();
            if width == 0 || height == 0 {
                return Ok(Vec::new());
            }

            let mat = Mat::from_slice(gray.as_raw()).map_err(|e| {
                PipelineError::FaceDetection(format!("Failed to create Mat: {e}"))
            })?;

            let mat = mat.reshape(1, height as i32).map_err(|e| {
                PipelineError::FaceDetection(format!("Failed to reshape Mat: {e}"))
            })?;

            let min_size = params.min_size as i32;
            let mut faces = Vector::<Rect>::new();
            {
                let mut classifier = self.classifier.lock().map_err(|_| {
                    PipelineError::FaceDetection("cascade classifier lock poisoned".to_string())
                })?;

                classifier
                    .detect_multi_scale(
                        &mat,
                        &mut faces,
                        params.scale_factor,
                        params.min_neighbors,
                        0,
                        Size::new(min_size, min_size),
                        Size::new(0, 0), // no upper bound
                    )
                    .map_err(|e| {
                        PipelineError::FaceDetection(format!("Face detection failed: {e}"))
                    })?;
            }

            let boxes: Vec<BoundingBox> = faces
                .iter()
                .filter_map(|r| to_bounding_box(r.x, r.y, r.width, r.height, width, height))
                .collect();

            debug!(candidates = faces.len(), kept = boxes.len(), "cascade scan finished");
            Ok(boxes)
        }
    }
}
