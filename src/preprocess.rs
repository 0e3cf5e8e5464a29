// Face crop normalization into the classifier's input tensor

use image::imageops;
use image::RgbImage;
use ndarray::Array4;

use crate::config::{ChannelOrder, PreprocessConfig};
use crate::error::{PipelineError, Result};
use crate::models::BoundingBox;

/// Batch-of-one face tensor, shape `[1, H, W, 3]`, values in [0, 1]
#[derive(Clone, Debug, PartialEq)]
pub struct FaceTensor {
    data: Array4<f32>,
}

impl FaceTensor {
    /// Wraps an NHWC array; fails if the trailing axis is not 3 channels
    pub fn from_array(data: Array4<f32>) -> Result<Self> {
        if data.shape()[0] != 1 || data.shape()[3] != 3 {
            return Err(PipelineError::Inference(format!(
                "expected a [1, H, W, 3] tensor, got {:?}",
                data.shape()
            )));
        }
        Ok(Self { data })
    }

    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }

    /// Values in `[1, H, W, 3]` order
    pub fn to_nhwc(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// Values in `[1, 3, H, W]` order
    pub fn to_nchw(&self) -> Vec<f32> {
        self.data
            .view()
            .permuted_axes([0, 3, 1, 2])
            .iter()
            .copied()
            .collect()
    }
}

/// Crops, stretches and rescales a face for the emotion classifier
#[derive(Clone, Copy, Debug)]
pub struct FacePreprocessor {
    config: PreprocessConfig,
}

impl FacePreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Crops `bbox` out of `grid`, resizes it to a `target_size` square
    /// (aspect ratio is not preserved) and divides every channel by 255.
    pub fn prepare(&self, grid: &RgbImage, bbox: BoundingBox) -> Result<FaceTensor> {
        let (width, height) = grid.dimensions();
        if !bbox.fits_within(width, height) {
            return Err(PipelineError::CropOutOfBounds {
                bbox,
                width,
                height,
            });
        }

        let crop = imageops::crop_imm(grid, bbox.x, bbox.y, bbox.width, bbox.height).to_image();

        let size = self.config.target_size;
        let face = if crop.dimensions() == (size, size) {
            crop
        } else {
            imageops::resize(&crop, size, size, self.config.filter)
        };

        let side = size as usize;
        let mut values = Vec::with_capacity(side * side * 3);
        for pixel in face.pixels() {
            let [r, g, b] = pixel.0;
            let ordered = match self.config.channel_order {
                ChannelOrder::Rgb => [r, g, b],
                ChannelOrder::Bgr => [b, g, r],
            };
            values.extend(ordered.iter().map(|&v| f32::from(v) / 255.0));
        }

        let data = Array4::from_shape_vec((1, side, side, 3), values).map_err(|e| {
            PipelineError::Inference(format!("Failed to create input array: {e}"))
        })?;

        Ok(FaceTensor { data })
    }
}
