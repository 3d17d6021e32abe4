use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::sync::Arc;
use uuid::Uuid;

use super::geometry::Dimensions;

/// A captured video frame. Clones share the pixel buffer.
#[derive(Clone)]
pub struct Frame {
    stream_id: Uuid,
    image: Arc<DynamicImage>,
    captured_at: DateTime<Utc>,
    frame_id: Uuid,
}

impl Frame {
    pub fn new(
        stream_id: Uuid,
        image: DynamicImage,
        captured_at: DateTime<Utc>,
        frame_id: Uuid,
    ) -> Self {
        Self {
            stream_id,
            image: Arc::new(image),
            captured_at,
            frame_id,
        }
    }

    /// Blank frame of the given size, stamped now.
    pub fn blank(stream_id: Uuid, dimensions: Dimensions) -> Self {
        Self::new(
            stream_id,
            DynamicImage::new_rgb8(dimensions.width, dimensions.height),
            Utc::now(),
            Uuid::new_v4(),
        )
    }

    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("stream_id", &self.stream_id)
            .field("frame_id", &self.frame_id)
            .field("captured_at", &self.captured_at)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}
