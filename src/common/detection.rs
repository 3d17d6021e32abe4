use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::geometry::{BoundingBox, Dimensions, Point};

/// Facial expressions reported by the face detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Disgusted,
    Surprised,
    Fearful,
}

impl Expression {
    pub const ALL: [Expression; 7] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Disgusted,
        Expression::Surprised,
        Expression::Fearful,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Disgusted => "disgusted",
            Expression::Surprised => "surprised",
            Expression::Fearful => "fearful",
        }
    }
}

/// Expression confidences in the order the detector reported them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpressionScores(IndexMap<Expression, f32>);

impl ExpressionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, expression: Expression, score: f32) {
        self.0.insert(expression, score);
    }

    pub fn get(&self, expression: Expression) -> Option<f32> {
        self.0.get(&expression).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Expression with the strictly greatest score. On a tie the entry inserted first wins;
    /// non-finite scores never win.
    pub fn dominant(&self) -> Option<Expression> {
        let mut best: Option<(Expression, f32)> = None;
        for (&expression, &score) in &self.0 {
            if !score.is_finite() {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((expression, score)),
            }
        }
        best.map(|(expression, _)| expression)
    }
}

impl FromIterator<(Expression, f32)> for ExpressionScores {
    fn from_iter<I: IntoIterator<Item = (Expression, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceResult {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub expressions: Option<ExpressionScores>,
}

impl FaceResult {
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            expressions: None,
        }
    }

    pub fn with_expressions(mut self, expressions: ExpressionScores) -> Self {
        self.expressions = Some(expressions);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectResult {
    pub label: String,
    pub confidence: f32,
    #[serde(default)]
    pub bbox: BoundingBox,
}

impl ObjectResult {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// Keypoint part names used by the pose estimator.
pub mod part {
    pub const LEFT_WRIST: &str = "leftWrist";
    pub const RIGHT_WRIST: &str = "rightWrist";
    pub const LEFT_SHOULDER: &str = "leftShoulder";
    pub const RIGHT_SHOULDER: &str = "rightShoulder";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: String,
    pub position: Point,
    pub score: f32,
}

impl Keypoint {
    pub fn new(part: impl Into<String>, x: f32, y: f32, score: f32) -> Self {
        Self {
            part: part.into(),
            position: Point::new(x, y),
            score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseResult {
    pub keypoints: Vec<Keypoint>,
}

impl PoseResult {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    pub fn keypoint(&self, part: &str) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| k.part == part)
    }
}

/// Maps face boxes from the detector's input size onto the display size.
pub fn resize_results(results: Vec<FaceResult>, from: Dimensions, to: Dimensions) -> Vec<FaceResult> {
    if from.is_empty() || from == to {
        return results;
    }
    let scale_x = to.width as f32 / from.width as f32;
    let scale_y = to.height as f32 / from.height as f32;
    results
        .into_iter()
        .map(|face| FaceResult {
            bbox: face.bbox.scaled(scale_x, scale_y),
            expressions: face.expressions,
        })
        .collect()
}
