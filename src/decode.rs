// Image decoding into the pipeline's canonical pixel grids

use image::{GrayImage, RgbImage};

use crate::error::{PipelineError, Result};

/// Decodes encoded image bytes (any format the `image` crate recognizes)
/// into an 8-bit, 3-channel grid in R, G, B order. Alpha is dropped.
pub fn decode(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(PipelineError::Decode("empty image payload".to_string()));
    }

    let image = image::load_from_memory(bytes)?;
    Ok(image.to_rgb8())
}

/// Luma conversion used for face detection
pub fn grayscale(grid: &RgbImage) -> GrayImage {
    image::imageops::grayscale(grid)
}
