pub mod detectors;
pub mod feeds;
pub mod media;
pub mod scripted;

pub use detectors::{FaceDetector, LoadedModels, ModelLoader, ObjectDetector, PoseEstimator};
pub use feeds::{FaceFeed, ObjectFeed, PoseFeed};
pub use media::{FramePublisher, MediaSource, VideoStream};
pub use scripted::{ScenarioTimeline, ScriptedMedia, ScriptedModels, ScriptedScenario};
