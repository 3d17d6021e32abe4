use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

use crate::common::{BoundingBox, Point};
use crate::pipeline::{Caption, DetectionState};

use super::status::AppStatus;
use super::surface::{Color, DisplaySurface, TextAlign, TextStyle};

pub const DEFAULT_RENDER_PERIOD: Duration = Duration::from_millis(100);
pub const DEFAULT_FALLBACK_TEXT: &str = "look at the camera";

const LABEL_PADDING_X: f32 = 10.0;
const LABEL_OFFSET_Y: f32 = 40.0;
const LABEL_HEIGHT: f32 = 35.0;
const TEXT_OFFSET_Y: f32 = 15.0;

const CAPTION_STYLE: TextStyle = TextStyle {
    font_px: 22.0,
    color: Color::YELLOW,
    align: TextAlign::Center,
};

const FALLBACK_STYLE: TextStyle = TextStyle {
    font_px: 24.0,
    color: Color::WHITE,
    align: TextAlign::Center,
};

/// Paints the current caption over the primary face on a fixed period.
pub struct RenderTick {
    surface: Box<dyn DisplaySurface>,
    state: DetectionState,
    caption_rx: watch::Receiver<Caption>,
    status_rx: watch::Receiver<AppStatus>,
    period: Duration,
    fallback_text: String,
}

impl RenderTick {
    pub fn new(
        surface: Box<dyn DisplaySurface>,
        state: DetectionState,
        caption_rx: watch::Receiver<Caption>,
        status_rx: watch::Receiver<AppStatus>,
    ) -> Self {
        Self {
            surface,
            state,
            caption_rx,
            status_rx,
            period: DEFAULT_RENDER_PERIOD,
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_fallback_text(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = text.into();
        self
    }

    /// Draws one frame. Returns false when nothing was drawn.
    pub fn draw(&mut self) -> bool {
        if !self.status_rx.borrow().is_running() || !self.surface.is_initialized() {
            return false;
        }

        let dimensions = self.surface.dimensions();
        self.surface.clear_rect(dimensions.full_rect());

        let faces = self.state.faces();
        match faces.first() {
            Some(face) => {
                let caption = self.caption_rx.borrow().text.clone();
                self.surface
                    .fill_rect(label_rect(&face.bbox), Color::TRANSLUCENT_BLACK);
                self.surface
                    .fill_text(&caption, label_anchor(&face.bbox), CAPTION_STYLE);
                trace!("Drew caption '{}' over {} face(s)", caption, faces.len());
            }
            None => {
                self.surface
                    .fill_text(&self.fallback_text, dimensions.center(), FALLBACK_STYLE);
            }
        }

        self.surface.present();
        true
    }

    pub async fn run(mut self, cancel_token: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Render tick started, period {:?}", self.period);
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    self.draw();
                }
            }
        }
        info!("Render tick stopped");
    }

    pub fn spawn(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel_token))
    }
}

fn label_rect(face: &BoundingBox) -> BoundingBox {
    BoundingBox::new(
        face.x - LABEL_PADDING_X,
        face.y - LABEL_OFFSET_Y,
        face.width + 2.0 * LABEL_PADDING_X,
        LABEL_HEIGHT,
    )
}

fn label_anchor(face: &BoundingBox) -> Point {
    Point::new(face.center_x(), face.y - TEXT_OFFSET_Y)
}
