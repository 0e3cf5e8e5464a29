//! Runtime configuration.
//!
//! Service settings come from `FACEMOOD_*` environment variables (a `.env`
//! file is loaded by the binary first). Detection and preprocessing knobs
//! live in two named profiles: the upload path favours recall, the webcam
//! path favours precision.

use std::path::PathBuf;
use std::str::FromStr;

use image::imageops::FilterType;

use crate::error::{PipelineError, Result};

/// Side length of the square face crop the classifier was trained on.
pub const FACE_INPUT_SIZE: u32 = 224;

/// Cascade classifier scan parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Image pyramid step between scales.
    pub scale_factor: f64,
    /// Overlapping candidates required to keep a region.
    pub min_neighbors: i32,
    /// Smallest accepted face, in pixels (square).
    pub min_size: u32,
}

impl DetectionParams {
    /// Looser voting threshold for uploaded photos.
    pub const fn serving() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 3,
            min_size: 50,
        }
    }

    /// Stricter voting threshold for live webcam frames.
    pub const fn interactive() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 30,
        }
    }
}

/// Channel order of the tensor handed to the classifier.
///
/// The shipped model was fed B, G, R pixels on both the upload and the
/// webcam path, so `Bgr` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    Rgb,
    #[default]
    Bgr,
}

impl FromStr for ChannelOrder {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "bgr" => Ok(Self::Bgr),
            other => Err(PipelineError::Config(format!(
                "unknown channel order '{other}' (expected rgb or bgr)"
            ))),
        }
    }
}

/// Memory layout of the classifier's input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorLayout {
    /// `[1, H, W, 3]`, the layout of a Keras export.
    #[default]
    Nhwc,
    /// `[1, 3, H, W]`
    Nchw,
}

impl FromStr for TensorLayout {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "nhwc" => Ok(Self::Nhwc),
            "nchw" => Ok(Self::Nchw),
            other => Err(PipelineError::Config(format!(
                "unknown tensor layout '{other}' (expected nhwc or nchw)"
            ))),
        }
    }
}

/// Face crop normalization settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessConfig {
    pub target_size: u32,
    pub filter: FilterType,
    pub channel_order: ChannelOrder,
}

/// Everything that differs between the upload and webcam call sites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineProfile {
    pub detection: DetectionParams,
    pub preprocess: PreprocessConfig,
}

impl PipelineProfile {
    pub fn serving() -> Self {
        Self {
            detection: DetectionParams::serving(),
            preprocess: PreprocessConfig {
                target_size: FACE_INPUT_SIZE,
                filter: FilterType::CatmullRom,
                channel_order: ChannelOrder::default(),
            },
        }
    }

    pub fn interactive() -> Self {
        Self {
            detection: DetectionParams::interactive(),
            preprocess: PreprocessConfig {
                target_size: FACE_INPUT_SIZE,
                filter: FilterType::Triangle,
                channel_order: ChannelOrder::default(),
            },
        }
    }

    pub fn with_channel_order(mut self, channel_order: ChannelOrder) -> Self {
        self.preprocess.channel_order = channel_order;
        self
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API bind host
    pub host: String,
    /// API bind port
    pub port: u16,
    /// Browser origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Max upload size in bytes
    pub max_body_size: usize,
    /// Haar cascade XML
    pub cascade_path: PathBuf,
    /// ONNX emotion model
    pub model_path: PathBuf,
    pub tensor_layout: TensorLayout,
    pub channel_order: ChannelOrder,
    /// Front end bind port
    pub frontend_port: u16,
    /// Base URL the front end forwards uploads to
    pub api_url: String,
    /// Directory served by the front end
    pub static_dir: PathBuf,
    /// Log to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: default_cors_origins(),
            max_body_size: 10 * 1024 * 1024, // 10MB
            cascade_path: PathBuf::from("assets/models/haarcascade_frontalface_default.xml"),
            model_path: PathBuf::from("assets/models/face_emotion_model.onnx"),
            tensor_layout: TensorLayout::Nhwc,
            channel_order: ChannelOrder::Bgr,
            frontend_port: 5000,
            api_url: "http://127.0.0.1:8000".to_string(),
            static_dir: PathBuf::from("static"),
            log_file: None,
        }
    }
}

fn default_cors_origins() -> Vec<String> {
    [
        "http://localhost",
        "http://localhost:5000",
        "http://127.0.0.1",
        "http://127.0.0.1:5000",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl AppConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tensor_layout = match lookup("FACEMOOD_TENSOR_LAYOUT") {
            Some(v) => v.parse()?,
            None => defaults.tensor_layout,
        };
        let channel_order = match lookup("FACEMOOD_CHANNEL_ORDER") {
            Some(v) => v.parse()?,
            None => defaults.channel_order,
        };

        Ok(Self {
            host: lookup("FACEMOOD_HOST").unwrap_or(defaults.host),
            port: lookup("FACEMOOD_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: lookup("FACEMOOD_CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            max_body_size: lookup("FACEMOOD_MAX_BODY_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            cascade_path: lookup("FACEMOOD_CASCADE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cascade_path),
            model_path: lookup("FACEMOOD_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            tensor_layout,
            channel_order,
            frontend_port: lookup("FACEMOOD_FRONTEND_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frontend_port),
            api_url: lookup("FACEMOOD_API_URL").unwrap_or(defaults.api_url),
            static_dir: lookup("FACEMOOD_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            log_file: lookup("FACEMOOD_LOG_FILE").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn serving_and_interactive_profiles_stay_distinct() {
        let serving = PipelineProfile::serving();
        let interactive = PipelineProfile::interactive();

        assert_eq!(serving.detection.min_neighbors, 3);
        assert_eq!(serving.detection.min_size, 50);
        assert_eq!(interactive.detection.min_neighbors, 5);
        assert_eq!(interactive.detection.min_size, 30);
        assert_eq!(serving.detection.scale_factor, 1.1);
        assert_eq!(interactive.detection.scale_factor, 1.1);
        assert_eq!(serving.preprocess.channel_order, ChannelOrder::Bgr);
        assert_eq!(interactive.preprocess.channel_order, ChannelOrder::Bgr);
        assert_eq!(serving.preprocess.target_size, 224);
        assert_eq!(interactive.preprocess.target_size, 224);
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.frontend_port, 5000);
        assert_eq!(config.cors_origins.len(), 4);
        assert_eq!(config.tensor_layout, TensorLayout::Nhwc);
        assert_eq!(config.channel_order, ChannelOrder::Bgr);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("FACEMOOD_PORT", "9001"),
            ("FACEMOOD_CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("FACEMOOD_TENSOR_LAYOUT", "NCHW"),
            ("FACEMOOD_CHANNEL_ORDER", "RGB"),
            ("FACEMOOD_MODEL_PATH", "/models/emotion.onnx"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9001);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.tensor_layout, TensorLayout::Nchw);
        assert_eq!(config.channel_order, ChannelOrder::Rgb);
        assert_eq!(config.model_path, PathBuf::from("/models/emotion.onnx"));
    }

    #[test]
    fn unparseable_port_falls_back() {
        let config = AppConfig::from_lookup(lookup_from(&[("FACEMOOD_PORT", "http")])).unwrap();
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn unknown_layout_is_a_config_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("FACEMOOD_TENSOR_LAYOUT", "chw")]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
