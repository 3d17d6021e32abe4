use crate::common::detection::part;
use crate::common::{Expression, FaceResult, PoseResult};
use crate::config::SignalSettings;

use super::state::DetectionSnapshot;

pub const MIN_KEYPOINT_CONFIDENCE: f32 = 0.2;

/// Conditions derived from one detection snapshot. Recomputed on every policy tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conditions {
    pub hand_raised: bool,
    pub wearing_hat: bool,
    pub wearing_sunglasses: bool,
    /// Computed for completeness; the caption policy never consults it.
    pub multiple_faces: bool,
    pub dominant_expression: Expression,
}

/// Turns the latest detection snapshot into [`Conditions`].
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    min_keypoint_confidence: f32,
    hat_label: String,
    sunglasses_label: String,
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::from(&SignalSettings::default())
    }
}

impl From<&SignalSettings> for SignalExtractor {
    fn from(settings: &SignalSettings) -> Self {
        Self {
            min_keypoint_confidence: settings.min_keypoint_confidence,
            hat_label: settings.hat_label.clone(),
            sunglasses_label: settings.sunglasses_label.clone(),
        }
    }
}

impl SignalExtractor {
    pub fn extract(&self, snapshot: &DetectionSnapshot) -> Conditions {
        Conditions {
            hand_raised: snapshot
                .primary_pose()
                .map(|pose| self.arm_raised(pose))
                .unwrap_or(false),
            wearing_hat: snapshot.objects.iter().any(|o| o.label == self.hat_label),
            wearing_sunglasses: snapshot
                .objects
                .iter()
                .any(|o| o.label == self.sunglasses_label),
            multiple_faces: snapshot.faces.len() > 1,
            dominant_expression: dominant_expression(snapshot.primary_face()),
        }
    }

    /// True when either wrist is above its shoulder and both keypoints clear the threshold.
    pub fn arm_raised(&self, pose: &PoseResult) -> bool {
        self.side_raised(pose, part::LEFT_WRIST, part::LEFT_SHOULDER)
            || self.side_raised(pose, part::RIGHT_WRIST, part::RIGHT_SHOULDER)
    }

    fn side_raised(&self, pose: &PoseResult, wrist: &str, shoulder: &str) -> bool {
        match (pose.keypoint(wrist), pose.keypoint(shoulder)) {
            (Some(wrist), Some(shoulder)) => {
                wrist.score > self.min_keypoint_confidence
                    && shoulder.score > self.min_keypoint_confidence
                    && wrist.position.y < shoulder.position.y
            }
            _ => false,
        }
    }
}

/// Arm-raise check with the default keypoint threshold.
pub fn check_arm_raised(pose: &PoseResult) -> bool {
    SignalExtractor::default().arm_raised(pose)
}

/// Dominant expression of the primary face, `Neutral` when there is nothing to go on.
pub fn dominant_expression(face: Option<&FaceResult>) -> Expression {
    face.and_then(|f| f.expressions.as_ref())
        .and_then(|scores| scores.dominant())
        .unwrap_or(Expression::Neutral)
}
