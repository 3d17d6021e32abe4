use serde::{Deserialize, Serialize};

/// Pixel size of a video stream or a display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn center(&self) -> Point {
        Point::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn full_rect(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box in a top-left-origin coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Scales the box independently along each axis.
    pub fn scaled(&self, scale_x: f32, scale_y: f32) -> Self {
        Self::new(
            self.x * scale_x,
            self.y * scale_y,
            self.width * scale_x,
            self.height * scale_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dimensions_are_detected() {
        assert!(Dimensions::default().is_empty());
        assert!(Dimensions::new(640, 0).is_empty());
        assert!(!Dimensions::new(640, 480).is_empty());
    }

    #[test]
    fn scaling_a_box_scales_origin_and_size() {
        let scaled = BoundingBox::new(10.0, 20.0, 30.0, 40.0).scaled(2.0, 0.5);
        assert_eq!(scaled, BoundingBox::new(20.0, 10.0, 60.0, 20.0));
        assert_eq!(scaled.center_x(), 50.0);
    }
}
