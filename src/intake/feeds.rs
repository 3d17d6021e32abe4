use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::common::{resize_results, Dimensions, FaceResult, ObjectResult, PoseResult};
use crate::pipeline::SliceWriter;

use super::detectors::{FaceDetector, ObjectDetector, PoseEstimator};
use super::media::VideoStream;

/// Detects faces on every new video frame and publishes them in display coordinates.
pub struct FaceFeed {
    detector: Arc<dyn FaceDetector>,
    stream: VideoStream,
    display: Dimensions,
    writer: SliceWriter<FaceResult>,
}

impl FaceFeed {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        stream: VideoStream,
        display: Dimensions,
        writer: SliceWriter<FaceResult>,
    ) -> Self {
        Self {
            detector,
            stream,
            display,
            writer,
        }
    }

    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!("Face feed started with '{}'", self.detector.name());
        loop {
            let frame = tokio::select! {
                _ = cancel_token.cancelled() => break,
                frame = self.stream.next_frame() => frame,
            };
            let Some(frame) = frame else {
                warn!("Video stream ended, stopping face feed");
                break;
            };

            let result = tokio::select! {
                _ = cancel_token.cancelled() => break,
                result = self.detector.detect_all_faces(&frame) => result,
            };
            match result {
                Ok(faces) => {
                    debug!("{} face(s) on frame {}", faces.len(), frame.frame_id());
                    self.writer
                        .publish(resize_results(faces, frame.dimensions(), self.display));
                }
                Err(e) => {
                    warn!("Face detection failed: {}", e);
                    self.writer.publish(Vec::new());
                }
            }
        }
        info!("Face feed stopped");
    }

    pub fn spawn(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel_token))
    }
}

/// Re-runs object detection on the current frame as soon as the previous call completes.
pub struct ObjectFeed {
    detector: Arc<dyn ObjectDetector>,
    stream: VideoStream,
    writer: SliceWriter<ObjectResult>,
}

impl ObjectFeed {
    pub fn new(
        detector: Arc<dyn ObjectDetector>,
        stream: VideoStream,
        writer: SliceWriter<ObjectResult>,
    ) -> Self {
        Self {
            detector,
            stream,
            writer,
        }
    }

    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!("Object feed started with '{}'", self.detector.name());
        loop {
            let frame = tokio::select! {
                _ = cancel_token.cancelled() => break,
                frame = self.stream.latest_frame() => frame,
            };
            let Some(frame) = frame else {
                warn!("Video stream ended, stopping object feed");
                break;
            };

            let result = tokio::select! {
                _ = cancel_token.cancelled() => break,
                result = self.detector.detect(&frame) => result,
            };
            // A failed cycle counts as "nothing detected"; the chain keeps going.
            let objects = result.unwrap_or_else(|e| {
                error!("Object detection failed: {}", e);
                Vec::new()
            });
            debug!("{} object(s) on frame {}", objects.len(), frame.frame_id());
            self.writer.publish(objects);

            tokio::task::yield_now().await;
        }
        info!("Object feed stopped");
    }

    pub fn spawn(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel_token))
    }
}

/// Overwrites the pose slice whenever the estimator emits.
pub struct PoseFeed {
    estimator: Box<dyn PoseEstimator>,
    writer: SliceWriter<PoseResult>,
}

impl PoseFeed {
    pub fn new(estimator: Box<dyn PoseEstimator>, writer: SliceWriter<PoseResult>) -> Self {
        Self { estimator, writer }
    }

    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!("Pose feed subscribed to '{}'", self.estimator.name());
        let mut poses_rx = self.estimator.subscribe();
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                poses = poses_rx.recv() => match poses {
                    Some(poses) => self.writer.publish(poses),
                    None => {
                        warn!("Pose estimator stopped emitting");
                        break;
                    }
                },
            }
        }
        info!("Pose feed stopped");
    }

    pub fn spawn(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel_token))
    }
}
