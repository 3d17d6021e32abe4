//! Scenario replay stand-ins for the camera and the three perception models.
//!
//! A scenario is a cyclic list of steps; every collaborator reports whatever the step active at
//! the current instant prescribes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::common::detection::part;
use crate::common::{
    BoundingBox, Dimensions, Expression, FaceResult, Frame, Keypoint, ObjectResult, PoseResult,
};
use crate::error::{AppError, DetectorError, MediaError};

use super::detectors::{FaceDetector, ModelLoader, ObjectDetector, PoseEstimator};
use super::media::{MediaSource, VideoStream};

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedScenario {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_face_latency")]
    pub face_latency_ms: u64,
    #[serde(default = "default_object_latency")]
    pub object_latency_ms: u64,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioStep {
    #[serde(default)]
    pub label: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub faces: Vec<FaceResult>,
    #[serde(default)]
    pub objects: Vec<ObjectResult>,
    #[serde(default)]
    pub poses: Vec<PoseResult>,
}

fn default_width() -> u32 {
    720
}

fn default_height() -> u32 {
    560
}

fn default_fps() -> u32 {
    15
}

fn default_face_latency() -> u64 {
    60
}

fn default_object_latency() -> u64 {
    150
}

impl ScriptedScenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let scenario: ScriptedScenario =
            serde_json::from_str(text).map_err(|e| AppError::Scenario(e.to_string()))?;
        scenario.validate().map_err(AppError::Scenario)?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.steps.is_empty() {
            return Err("Scenario needs at least one step".to_string());
        }
        if self.total_duration().is_zero() {
            return Err("Scenario steps must last longer than 0 ms".to_string());
        }
        if self.fps == 0 {
            return Err("Scenario fps must be greater than 0".to_string());
        }
        if self.width == 0 || self.height == 0 {
            return Err("Scenario frame size must not be empty".to_string());
        }
        Ok(())
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.steps.iter().map(|s| s.duration_ms).sum())
    }

    /// Step active `elapsed` after start; the scenario repeats forever.
    pub fn step_at(&self, elapsed: Duration) -> &ScenarioStep {
        let total = self.total_duration().as_millis();
        if total == 0 {
            return &self.steps[0];
        }
        let mut offset = elapsed.as_millis() % total;
        for step in &self.steps {
            if offset < u128::from(step.duration_ms) {
                return step;
            }
            offset -= u128::from(step.duration_ms);
        }
        &self.steps[self.steps.len() - 1]
    }

    /// A short tour through every caption rule.
    pub fn demo() -> Self {
        let face = |x: f32, expression: Expression| {
            FaceResult::new(BoundingBox::new(x, 180.0, 160.0, 180.0)).with_expressions(
                [(Expression::Neutral, 0.1), (expression, 0.8)]
                    .into_iter()
                    .collect(),
            )
        };
        let object =
            |label: &str| ObjectResult::new(label, 0.8, BoundingBox::new(270.0, 120.0, 180.0, 90.0));
        let raised_hand = PoseResult::new(vec![
            Keypoint::new(part::LEFT_WRIST, 220.0, 120.0, 0.8),
            Keypoint::new(part::LEFT_SHOULDER, 260.0, 420.0, 0.9),
            Keypoint::new(part::RIGHT_WRIST, 470.0, 520.0, 0.7),
            Keypoint::new(part::RIGHT_SHOULDER, 460.0, 420.0, 0.9),
        ]);
        let step = |label: &str,
                    faces: Vec<FaceResult>,
                    objects: Vec<ObjectResult>,
                    poses: Vec<PoseResult>| ScenarioStep {
            label: Some(label.to_string()),
            duration_ms: 4000,
            faces,
            objects,
            poses,
        };

        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            face_latency_ms: default_face_latency(),
            object_latency_ms: default_object_latency(),
            steps: vec![
                step("nobody", vec![], vec![], vec![]),
                step("neutral", vec![face(280.0, Expression::Neutral)], vec![], vec![]),
                step("happy", vec![face(280.0, Expression::Happy)], vec![], vec![]),
                step(
                    "hat",
                    vec![face(280.0, Expression::Sad)],
                    vec![object("hat")],
                    vec![],
                ),
                step(
                    "hand raised",
                    vec![face(280.0, Expression::Neutral)],
                    vec![object("sunglasses")],
                    vec![raised_hand],
                ),
                step(
                    "two people",
                    vec![
                        face(120.0, Expression::Surprised),
                        face(440.0, Expression::Happy),
                    ],
                    vec![],
                    vec![],
                ),
            ],
        }
    }
}

/// A scenario anchored to the instant it started playing.
pub struct ScenarioTimeline {
    scenario: ScriptedScenario,
    started: Instant,
}

impl ScenarioTimeline {
    pub fn start(scenario: ScriptedScenario) -> Arc<Self> {
        info!(
            "Replaying scenario with {} step(s), {:?} per cycle",
            scenario.steps.len(),
            scenario.total_duration()
        );
        Arc::new(Self {
            scenario,
            started: Instant::now(),
        })
    }

    pub fn scenario(&self) -> &ScriptedScenario {
        &self.scenario
    }

    pub fn current_step(&self) -> &ScenarioStep {
        self.scenario.step_at(self.started.elapsed())
    }
}

/// Camera producing blank frames at the scenario's frame rate.
pub struct ScriptedMedia {
    timeline: Arc<ScenarioTimeline>,
}

impl ScriptedMedia {
    pub fn new(timeline: Arc<ScenarioTimeline>) -> Self {
        Self { timeline }
    }
}

#[async_trait]
impl MediaSource for ScriptedMedia {
    async fn acquire_video_stream(&self) -> Result<VideoStream, MediaError> {
        let dimensions = self.timeline.scenario().dimensions();
        let period = self.timeline.scenario().frame_period();
        let (publisher, stream) = VideoStream::channel(dimensions);
        let stream_id = stream.id();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if publisher.is_closed() {
                    debug!("No viewers left on stream {}, stopping capture", stream_id);
                    break;
                }
                publisher.publish(Frame::blank(stream_id, dimensions));
            }
        });
        Ok(stream)
    }
}

/// Hands out detectors that replay the scenario.
pub struct ScriptedModels {
    timeline: Arc<ScenarioTimeline>,
}

impl ScriptedModels {
    pub fn new(timeline: Arc<ScenarioTimeline>) -> Self {
        Self { timeline }
    }
}

#[async_trait]
impl ModelLoader for ScriptedModels {
    async fn load_face_detector(
        &self,
        base_url: &str,
    ) -> Result<Arc<dyn FaceDetector>, DetectorError> {
        debug!("Scripted face detector ignores model location {}", base_url);
        Ok(Arc::new(ScriptedFaceDetector {
            timeline: self.timeline.clone(),
        }))
    }

    async fn load_object_detector(
        &self,
        _base_url: &str,
    ) -> Result<Arc<dyn ObjectDetector>, DetectorError> {
        Ok(Arc::new(ScriptedObjectDetector {
            timeline: self.timeline.clone(),
        }))
    }

    async fn load_pose_estimator(
        &self,
        _base_url: &str,
        _stream: &VideoStream,
    ) -> Result<Box<dyn PoseEstimator>, DetectorError> {
        Ok(Box::new(ScriptedPoseEstimator {
            timeline: self.timeline.clone(),
        }))
    }
}

struct ScriptedFaceDetector {
    timeline: Arc<ScenarioTimeline>,
}

#[async_trait]
impl FaceDetector for ScriptedFaceDetector {
    async fn detect_all_faces(&self, _frame: &Frame) -> Result<Vec<FaceResult>, DetectorError> {
        tokio::time::sleep(Duration::from_millis(self.timeline.scenario().face_latency_ms)).await;
        Ok(self.timeline.current_step().faces.clone())
    }

    fn name(&self) -> &'static str {
        "scripted-faces"
    }
}

struct ScriptedObjectDetector {
    timeline: Arc<ScenarioTimeline>,
}

#[async_trait]
impl ObjectDetector for ScriptedObjectDetector {
    async fn detect(&self, _frame: &Frame) -> Result<Vec<ObjectResult>, DetectorError> {
        tokio::time::sleep(Duration::from_millis(self.timeline.scenario().object_latency_ms))
            .await;
        Ok(self.timeline.current_step().objects.clone())
    }

    fn name(&self) -> &'static str {
        "scripted-objects"
    }
}

struct ScriptedPoseEstimator {
    timeline: Arc<ScenarioTimeline>,
}

impl PoseEstimator for ScriptedPoseEstimator {
    fn subscribe(&mut self) -> mpsc::Receiver<Vec<PoseResult>> {
        let (poses_tx, poses_rx) = mpsc::channel(8);
        let timeline = self.timeline.clone();
        tokio::spawn(async move {
            let mut ticker = interval(timeline.scenario().frame_period());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let poses = timeline.current_step().poses.clone();
                if poses_tx.send(poses).await.is_err() {
                    break;
                }
            }
        });
        poses_rx
    }

    fn name(&self) -> &'static str {
        "scripted-poses"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "width": 320,
        "height": 240,
        "steps": [
            { "duration_ms": 1000 },
            {
                "label": "happy",
                "duration_ms": 500,
                "faces": [{
                    "bbox": { "x": 10, "y": 20, "width": 30, "height": 40 },
                    "expressions": { "neutral": 0.2, "happy": 0.7 }
                }],
                "objects": [{ "label": "hat", "confidence": 0.4 }]
            }
        ]
    }"#;

    #[test]
    fn parses_a_scenario_with_defaults() {
        let scenario = ScriptedScenario::from_json(SCENARIO).unwrap();
        assert_eq!(scenario.dimensions(), Dimensions::new(320, 240));
        assert_eq!(scenario.fps, 15);
        assert_eq!(scenario.total_duration(), Duration::from_millis(1500));
        let happy = &scenario.steps[1];
        assert_eq!(happy.objects[0].label, "hat");
        assert_eq!(
            happy.faces[0].expressions.as_ref().and_then(|e| e.dominant()),
            Some(Expression::Happy)
        );
    }

    #[test]
    fn steps_repeat_cyclically() {
        let scenario = ScriptedScenario::from_json(SCENARIO).unwrap();
        let label = |ms| scenario.step_at(Duration::from_millis(ms)).label.clone();
        assert_eq!(label(0), None);
        assert_eq!(label(999), None);
        assert_eq!(label(1000), Some("happy".to_string()));
        assert_eq!(label(1499), Some("happy".to_string()));
        assert_eq!(label(1500), None);
        assert_eq!(label(2600), Some("happy".to_string()));
    }

    #[test]
    fn rejects_empty_or_zero_length_scenarios() {
        assert!(ScriptedScenario::from_json(r#"{ "steps": [] }"#).is_err());
        assert!(ScriptedScenario::from_json(r#"{ "steps": [{ "duration_ms": 0 }] }"#).is_err());
        assert!(ScriptedScenario::from_json("not json").is_err());
    }

    #[test]
    fn demo_scenario_is_valid() {
        let demo = ScriptedScenario::demo();
        assert!(demo.validate().is_ok());
        assert!(demo.steps.iter().any(|s| s.faces.len() > 1));
        assert!(demo.steps.iter().any(|s| !s.poses.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_collaborators_follow_the_timeline() {
        let timeline = ScenarioTimeline::start(ScriptedScenario::from_json(SCENARIO).unwrap());
        let mut stream = ScriptedMedia::new(timeline.clone())
            .acquire_video_stream()
            .await
            .unwrap();
        let frame = stream.next_frame().await.unwrap();
        assert_eq!(frame.dimensions(), Dimensions::new(320, 240));

        let models = ScriptedModels::new(timeline.clone());
        let faces = models.load_face_detector("./models").await.unwrap();
        let objects = models.load_object_detector("./models").await.unwrap();
        assert!(faces.detect_all_faces(&frame).await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(faces.detect_all_faces(&frame).await.unwrap().len(), 1);
        assert_eq!(objects.detect(&frame).await.unwrap()[0].label, "hat");
    }
}
