// Frame-by-frame emotion loop shared by live capture sources

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use image::RgbImage;
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::models::FaceEmotion;
use crate::pipeline::InferencePipeline;

/// Consecutive failed grabs after which the source is considered gone
pub const MAX_GRAB_FAILURES: u32 = 3;

const GRAB_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Anything that yields RGB frames on demand (blocking)
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<RgbImage>;
}

/// Totals for one live session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveSummary {
    pub frames: u64,
    pub faces: u64,
}

/// Pulls frames from `source` and labels every face in each one.
///
/// Runs until `max_frames` frames were analyzed (0 = no limit) or `stop`
/// is set. A frame whose faces cannot be located is skipped.
/// [`MAX_GRAB_FAILURES`] failed grabs in a row end the session with an error.
pub fn run_frames<S, F>(
    source: &mut S,
    pipeline: &InferencePipeline,
    max_frames: u64,
    stop: &AtomicBool,
    mut on_frame: F,
) -> Result<LiveSummary>
where
    S: FrameSource + ?Sized,
    F: FnMut(u64, &[FaceEmotion]),
{
    let mut summary = LiveSummary::default();
    let mut failures = 0;

    while !stop.load(Ordering::Relaxed) {
        if max_frames > 0 && summary.frames >= max_frames {
            break;
        }

        let frame = match source.next_frame() {
            Ok(frame) => {
                failures = 0;
                frame
            }
            Err(e) => {
                failures += 1;
                warn!(attempt = failures, "Failed to grab frame: {}", e);
                if failures >= MAX_GRAB_FAILURES {
                    return Err(PipelineError::Camera(format!(
                        "giving up after {failures} failed frame grabs: {e}"
                    )));
                }
                thread::sleep(GRAB_RETRY_DELAY);
                continue;
            }
        };

        summary.frames += 1;
        match pipeline.analyze_faces(&frame) {
            Ok(faces) => {
                summary.faces += faces.len() as u64;
                on_frame(summary.frames, &faces);
            }
            Err(e) => warn!(frame = summary.frames, "Skipping frame: {}", e),
        }
    }

    Ok(summary)
}
