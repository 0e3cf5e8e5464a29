// Core data models for the face emotion pipeline

use serde::{Deserialize, Serialize};

/// Axis-aligned face rectangle in pixel coordinates, origin at the top-left
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Creates a box, rejecting zero-area rectangles
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Returns true if the box lies entirely inside a `width` x `height` grid
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(x={}, y={}, w={}, h={})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Outcome label of one inference call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionLabel {
    Happy,
    Sad,
    #[serde(rename = "No Face Detected")]
    NoFaceDetected,
}

impl EmotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Happy => "Happy",
            EmotionLabel::Sad => "Sad",
            EmotionLabel::NoFaceDetected => "No Face Detected",
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sigmoid output of the classifier: probability of the "Sad" class (index 1)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmotionProbability(f64);

impl EmotionProbability {
    /// Wraps a raw sigmoid value, clamped into [0, 1]
    pub fn new(sad: f64) -> Self {
        Self(sad.clamp(0.0, 1.0))
    }

    pub fn sad(&self) -> f64 {
        self.0
    }

    /// Complement of the "Sad" probability
    pub fn happy(&self) -> f64 {
        1.0 - self.0
    }

    /// "Sad" only when strictly more likely than "Happy"; a 0.5 tie is "Happy"
    pub fn label(&self) -> EmotionLabel {
        if self.sad() > self.happy() {
            EmotionLabel::Sad
        } else {
            EmotionLabel::Happy
        }
    }

    /// Probability of the winning label
    pub fn confidence(&self) -> f64 {
        self.sad().max(self.happy())
    }
}

/// Per-label percentages, serialized as `{"Happy": .., "Sad": ..}`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    #[serde(rename = "Happy")]
    pub happy: f64,
    #[serde(rename = "Sad")]
    pub sad: f64,
}

/// Result of one inference call
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmotionResult {
    pub label: EmotionLabel,
    /// Confidence of `label`, 0-100, two decimals
    pub confidence_percent: f64,
    pub probabilities: Probabilities,
}

impl EmotionResult {
    /// The terminal outcome for an image without a detectable face
    pub fn no_face() -> Self {
        Self {
            label: EmotionLabel::NoFaceDetected,
            confidence_percent: 0.0,
            probabilities: Probabilities {
                happy: 0.0,
                sad: 0.0,
            },
        }
    }

    /// Thresholds a classifier output into a labelled, rounded result
    pub fn from_probability(probability: EmotionProbability) -> Self {
        Self {
            label: probability.label(),
            confidence_percent: to_percent(probability.confidence()),
            probabilities: Probabilities {
                happy: to_percent(probability.happy()),
                sad: to_percent(probability.sad()),
            },
        }
    }

    pub fn has_face(&self) -> bool {
        self.label != EmotionLabel::NoFaceDetected
    }
}

impl std::fmt::Display for EmotionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.2}% confidence)", self.label, self.confidence_percent)
    }
}

/// Scales a [0, 1] probability to a percentage rounded to two decimals,
/// half to even
fn to_percent(probability: f64) -> f64 {
    (probability * 10_000.0).round_ties_even() / 100.0
}

/// One labelled face from a multi-face analysis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceEmotion {
    pub bbox: BoundingBox,
    pub result: EmotionResult,
}

/// JSON body returned by the prediction endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub filename: String,
    pub predicted_class: EmotionLabel,
    pub confidence: f64,
    pub all_probabilities: Probabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PredictionResponse {
    pub const NO_FACE_DETAIL: &'static str = "No face detected in the image.";

    pub fn new(filename: impl Into<String>, result: &EmotionResult) -> Self {
        Self {
            filename: filename.into(),
            predicted_class: result.label,
            confidence: result.confidence_percent,
            all_probabilities: result.probabilities,
            detail: (!result.has_face()).then(|| Self::NO_FACE_DETAIL.to_string()),
        }
    }
}
