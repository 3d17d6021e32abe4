use std::sync::Arc;

use tokio::sync::watch;

use crate::common::{BoundingBox, Dimensions, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const YELLOW: Color = Color::rgba(255, 255, 0, 255);
    /// Black at 50% opacity.
    pub const TRANSLUCENT_BLACK: Color = Color::rgba(0, 0, 0, 128);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Text is anchored on its baseline at the given point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_px: f32,
    pub color: Color,
    pub align: TextAlign,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(BoundingBox),
    FillRect {
        rect: BoundingBox,
        color: Color,
    },
    FillText {
        text: String,
        at: Point,
        style: TextStyle,
    },
}

/// Minimal 2D drawing contract the render tick needs.
pub trait DisplaySurface: Send {
    fn dimensions(&self) -> Dimensions;
    /// Resizes the surface to match the video it overlays.
    fn match_dimensions(&mut self, dimensions: Dimensions);
    fn clear_rect(&mut self, rect: BoundingBox);
    fn fill_rect(&mut self, rect: BoundingBox, color: Color);
    fn fill_text(&mut self, text: &str, at: Point, style: TextStyle);
    /// Called once a tick has finished drawing.
    fn present(&mut self) {}

    fn is_initialized(&self) -> bool {
        !self.dimensions().is_empty()
    }
}

/// Records draw calls and publishes each presented tick as a command list.
pub struct RecordingSurface {
    dimensions: Dimensions,
    pending: Vec<DrawCommand>,
    frames_tx: watch::Sender<Arc<[DrawCommand]>>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    /// Starts uninitialised (zero-sized) until [`DisplaySurface::match_dimensions`] is called.
    pub fn new() -> Self {
        let (frames_tx, _) = watch::channel(Arc::from(Vec::<DrawCommand>::new()));
        Self {
            dimensions: Dimensions::default(),
            pending: Vec::new(),
            frames_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<[DrawCommand]>> {
        self.frames_tx.subscribe()
    }

    pub fn pending(&self) -> &[DrawCommand] {
        &self.pending
    }
}

impl DisplaySurface for RecordingSurface {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn match_dimensions(&mut self, dimensions: Dimensions) {
        self.dimensions = dimensions;
        self.pending.clear();
    }

    fn clear_rect(&mut self, rect: BoundingBox) {
        if rect == self.dimensions.full_rect() {
            self.pending.clear();
        }
        self.pending.push(DrawCommand::Clear(rect));
    }

    fn fill_rect(&mut self, rect: BoundingBox, color: Color) {
        self.pending.push(DrawCommand::FillRect { rect, color });
    }

    fn fill_text(&mut self, text: &str, at: Point, style: TextStyle) {
        self.pending.push(DrawCommand::FillText {
            text: text.to_string(),
            at,
            style,
        });
    }

    fn present(&mut self) {
        let frame: Arc<[DrawCommand]> = std::mem::take(&mut self.pending).into();
        self.frames_tx.send_replace(frame);
    }
}
