use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::common::{FaceResult, Frame, ObjectResult, PoseResult};
use crate::error::DetectorError;

use super::media::VideoStream;

/// Face detector with expression scores, boxes in the frame's own pixel space.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect_all_faces(&self, frame: &Frame) -> Result<Vec<FaceResult>, DetectorError>;
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Result<Vec<ObjectResult>, DetectorError>;
    fn name(&self) -> &'static str;
}

/// Push-style pose estimator bound to a video stream at load time.
pub trait PoseEstimator: Send {
    /// Every emitted pose list is delivered on the returned receiver until the estimator stops.
    fn subscribe(&mut self) -> mpsc::Receiver<Vec<PoseResult>>;
    fn name(&self) -> &'static str;
}

/// Loads the three perception models from a base location.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load_face_detector(&self, base_url: &str)
        -> Result<Arc<dyn FaceDetector>, DetectorError>;

    async fn load_object_detector(
        &self,
        base_url: &str,
    ) -> Result<Arc<dyn ObjectDetector>, DetectorError>;

    async fn load_pose_estimator(
        &self,
        base_url: &str,
        stream: &VideoStream,
    ) -> Result<Box<dyn PoseEstimator>, DetectorError>;
}

pub struct LoadedModels {
    pub faces: Arc<dyn FaceDetector>,
    pub objects: Arc<dyn ObjectDetector>,
    pub poses: Box<dyn PoseEstimator>,
}

impl LoadedModels {
    /// Loads face, object and pose models in that order; the first failure aborts.
    pub async fn load(
        loader: &dyn ModelLoader,
        base_url: &str,
        stream: &VideoStream,
    ) -> Result<Self, DetectorError> {
        let faces = loader.load_face_detector(base_url).await?;
        tracing::info!("Face detector '{}' loaded", faces.name());
        let objects = loader.load_object_detector(base_url).await?;
        tracing::info!("Object detector '{}' loaded", objects.name());
        let poses = loader.load_pose_estimator(base_url, stream).await?;
        tracing::info!("Pose estimator '{}' loaded", poses.name());
        Ok(Self {
            faces,
            objects,
            poses,
        })
    }
}
