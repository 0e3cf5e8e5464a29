// Camera module for webcam capture and the live emotion loop

use std::sync::atomic::AtomicBool;

use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{error, info};

use crate::error::{PipelineError, Result};
use crate::live::{run_frames, FrameSource, LiveSummary};
use crate::models::FaceEmotion;
use crate::pipeline::InferencePipeline;

/// Owns an open webcam and hands out RGB frames
pub struct CameraManager {
    camera: Camera,
}

impl CameraManager {
    /// Opens camera `index`, falling back to `index + 1`
    pub fn open(index: u32) -> Result<Self> {
        // Request 640x480 at 30 FPS
        let requested_format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            nokhwa::utils::CameraFormat::new(
                nokhwa::utils::Resolution::new(640, 480),
                nokhwa::utils::FrameFormat::YUYV,
                30,
            ),
        ));

        // Some systems start numbering at 0, others at 1
        let camera = Self::try_open_camera(index, requested_format)
            .or_else(|_| Self::try_open_camera(index + 1, requested_format))
            .map_err(|e| {
                error!("Failed to initialize camera after trying two indices: {}", e);
                PipelineError::Camera(format!(
                    "Could not open camera. Make sure:\n\
                    1. A camera is connected\n\
                    2. No other app is using it\n\
                    3. Camera permissions are granted\n\
                    Error: {e}"
                ))
            })?;

        Ok(Self { camera })
    }

    fn try_open_camera(index: u32, requested_format: RequestedFormat) -> Result<Camera> {
        Camera::new(CameraIndex::Index(index), requested_format)
            .map_err(|e| PipelineError::Camera(e.to_string()))
    }

    /// Lists available camera devices
    pub fn list_devices() -> Result<Vec<String>> {
        let devices = nokhwa::query(nokhwa::utils::ApiBackend::Auto)?;

        Ok(devices
            .iter()
            .map(|info| info.human_name().to_string())
            .collect())
    }

    /// Returns the current camera resolution
    pub fn resolution(&self) -> (u32, u32) {
        let res = self.camera.resolution();
        (res.width(), res.height())
    }

    /// Returns the camera's human readable name
    pub fn camera_info(&self) -> String {
        self.camera.info().human_name().to_string()
    }

    /// Opens the camera stream and checks that it delivers frames
    pub fn ensure_stream_open(&mut self) -> Result<()> {
        if !self.camera.is_stream_open() {
            self.camera.open_stream()?;
            // Give the device a moment to start delivering frames
            std::thread::sleep(std::time::Duration::from_millis(200));
        }

        match self.camera.frame() {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Camera stream not working: {}", e);
                Err(PipelineError::Camera(format!(
                    "Camera stream not working: {e}. Make sure camera permissions are granted."
                )))
            }
        }
    }

    /// Grabs the most recent frame (blocking)
    pub fn get_current_frame(&mut self) -> Result<RgbImage> {
        let frame_data = self
            .camera
            .frame()
            .map_err(|e| PipelineError::Camera(format!("Failed to capture frame: {e}")))?;

        let buffer = frame_data
            .decode_image::<RgbFormat>()
            .map_err(|e| PipelineError::Camera(format!("Failed to decode frame: {e}")))?;

        let (width, height) = (buffer.width(), buffer.height());
        RgbImage::from_raw(width, height, buffer.into_raw()).ok_or_else(|| {
            PipelineError::Camera(format!("frame buffer does not match {width}x{height}"))
        })
    }

    /// Stops the camera stream
    pub fn stop_capture(&mut self) {
        if !self.camera.is_stream_open() {
            return;
        }

        if let Err(e) = self.camera.stop_stream() {
            error!("Error stopping camera stream: {}", e);
        }
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.stop_capture();
    }
}

impl FrameSource for CameraManager {
    fn next_frame(&mut self) -> Result<RgbImage> {
        self.get_current_frame()
    }
}

/// Captures frames from `device` and labels every face in each one.
///
/// See [`run_frames`] for the stop conditions.
pub fn run_live<F>(
    pipeline: &InferencePipeline,
    device: u32,
    max_frames: u64,
    stop: &AtomicBool,
    on_frame: F,
) -> Result<LiveSummary>
where
    F: FnMut(u64, &[FaceEmotion]),
{
    let mut camera = CameraManager::open(device)?;
    camera.ensure_stream_open()?;

    let (width, height) = camera.resolution();
    info!(camera = %camera.camera_info(), width, height, "webcam started");

    let outcome = run_frames(&mut camera, pipeline, max_frames, stop, on_frame);
    camera.stop_capture();

    let summary = outcome?;
    info!(frames = summary.frames, faces = summary.faces, "webcam stopped");
    Ok(summary)
}
