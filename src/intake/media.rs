use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::common::{Dimensions, Frame};
use crate::error::MediaError;

/// Acquires the camera stream.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire_video_stream(&self) -> Result<VideoStream, MediaError>;
}

/// Producer side of a [`VideoStream`]; dropping it ends the stream.
pub struct FramePublisher {
    tx: watch::Sender<Option<Frame>>,
}

impl FramePublisher {
    pub fn publish(&self, frame: Frame) {
        self.tx.send_replace(Some(frame));
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle on a live video stream. Only the latest frame is kept.
#[derive(Clone)]
pub struct VideoStream {
    id: Uuid,
    dimensions: Dimensions,
    frames: watch::Receiver<Option<Frame>>,
}

impl VideoStream {
    pub fn channel(dimensions: Dimensions) -> (FramePublisher, VideoStream) {
        let (tx, frames) = watch::channel(None);
        (
            FramePublisher { tx },
            VideoStream {
                id: Uuid::new_v4(),
                dimensions,
                frames,
            },
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn current_frame(&self) -> Option<Frame> {
        self.frames.borrow().clone()
    }

    /// Waits for a frame this handle has not seen yet. `None` once the publisher is gone.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            self.frames.changed().await.ok()?;
            if let Some(frame) = self.frames.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }

    /// The current frame, or the next one if nothing has been captured yet.
    pub async fn latest_frame(&mut self) -> Option<Frame> {
        if let Some(frame) = self.current_frame() {
            return Some(frame);
        }
        self.next_frame().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn next_frame_waits_for_a_new_frame() {
        let dimensions = Dimensions::new(8, 8);
        let (publisher, mut stream) = VideoStream::channel(dimensions);
        assert!(stream.current_frame().is_none());

        let frame = Frame::blank(stream.id(), dimensions);
        publisher.publish(frame.clone());
        let received = stream.next_frame().await.unwrap();
        assert_eq!(received.frame_id(), frame.frame_id());
        assert_eq!(
            stream.latest_frame().await.map(|f| f.frame_id()),
            Some(frame.frame_id())
        );
    }

    #[tokio::test]
    async fn stream_ends_when_publisher_drops() {
        let (publisher, mut stream) = VideoStream::channel(Dimensions::new(8, 8));
        drop(publisher);
        assert!(stream.next_frame().await.is_none());
    }
}
