#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use facemood::classifier::{EmotionClassifier, EmotionModel};
use facemood::config::{DetectionParams, PipelineProfile};
use facemood::detector::FaceLocator;
use facemood::preprocess::FaceTensor;
use facemood::{BoundingBox, InferencePipeline, Result};
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};

/// Treats the bounding rectangle of all dark pixels as the single face.
#[derive(Default)]
pub struct DarkRegionLocator {
    pub seen: Mutex<Vec<DetectionParams>>,
}

impl FaceLocator for DarkRegionLocator {
    fn locate(&self, gray: &GrayImage, params: &DetectionParams) -> Result<Vec<BoundingBox>> {
        self.seen.lock().unwrap().push(*params);

        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in gray.enumerate_pixels() {
            if pixel.0[0] >= 128 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }

        Ok(bounds
            .and_then(|(x0, y0, x1, y1)| BoundingBox::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
            .into_iter()
            .collect())
    }
}

/// Always returns the same boxes, in the given order.
pub struct FixedLocator(pub Vec<BoundingBox>);

impl FaceLocator for FixedLocator {
    fn locate(&self, _gray: &GrayImage, _params: &DetectionParams) -> Result<Vec<BoundingBox>> {
        Ok(self.0.clone())
    }
}

/// Sigmoid output fixed at construction.
pub struct ConstantModel(pub f32);

impl EmotionModel for ConstantModel {
    fn predict(&self, _tensor: &FaceTensor) -> Result<f32> {
        Ok(self.0)
    }
}

/// Mean normalized intensity of the face: bright faces read as "Sad".
pub struct MeanIntensityModel;

impl EmotionModel for MeanIntensityModel {
    fn predict(&self, tensor: &FaceTensor) -> Result<f32> {
        Ok(tensor.as_array().mean().unwrap_or(0.0))
    }
}

pub fn pipeline_with(locator: impl FaceLocator + 'static, model: impl EmotionModel + 'static) -> InferencePipeline {
    InferencePipeline::new(
        Arc::new(locator),
        EmotionClassifier::new(Arc::new(model)),
        PipelineProfile::serving(),
    )
}

/// White canvas with one black square standing in for a face.
pub fn face_image() -> RgbImage {
    let mut image = RgbImage::from_pixel(320, 240, Rgb([255, 255, 255]));
    for y in 60..180 {
        for x in 100..200 {
            image.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    image
}

pub fn blank_image() -> RgbImage {
    RgbImage::from_pixel(320, 240, Rgb([255, 255, 255]))
}

pub fn encode_png(image: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub const BOUNDARY: &str = "facemood-test-boundary";

/// A multipart/form-data body with a single file part.
pub fn multipart_body(field: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}
