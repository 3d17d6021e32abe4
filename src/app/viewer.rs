use std::sync::Arc;
use std::time::Duration;

use egui::{Align2, Color32, FontId, Pos2, Rect, Vec2};
use tokio::sync::watch;
use tracing::info;

use crate::common::{BoundingBox, Point};
use crate::error::AppError;
use crate::pipeline::Caption;

use super::status::AppStatus;
use super::surface::{Color, DrawCommand, TextAlign};

const WINDOW_TITLE: &str = "Face Caption Overlay";
const REPAINT_INTERVAL: Duration = Duration::from_millis(100);
const PLACEHOLDER_SIZE: Vec2 = Vec2::new(720.0, 560.0);
const VIDEO_BACKGROUND: Color32 = Color32::from_rgb(24, 24, 24);

/// Desktop window replaying the draw commands of the latest render tick.
pub struct OverlayViewer {
    frames_rx: watch::Receiver<Arc<[DrawCommand]>>,
    status_rx: watch::Receiver<AppStatus>,
    caption_rx: watch::Receiver<Caption>,
    show_overlay: bool,
    show_caption_info: bool,
}

impl OverlayViewer {
    pub fn new(
        frames_rx: watch::Receiver<Arc<[DrawCommand]>>,
        status_rx: watch::Receiver<AppStatus>,
        caption_rx: watch::Receiver<Caption>,
    ) -> Self {
        Self {
            frames_rx,
            status_rx,
            caption_rx,
            show_overlay: true,
            show_caption_info: true,
        }
    }

    /// Blocks the calling thread until the window is closed.
    pub fn run(self) -> Result<(), AppError> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(egui::vec2(800.0, 720.0))
                .with_title(WINDOW_TITLE),
            ..Default::default()
        };

        info!("Opening overlay viewer");
        eframe::run_native(WINDOW_TITLE, options, Box::new(|_cc| Ok(Box::new(self))))
            .map_err(|e| AppError::Viewer(e.to_string()))
    }

    fn draw_canvas(&self, ui: &mut egui::Ui, commands: &[DrawCommand]) {
        let size = canvas_size(commands).unwrap_or(PLACEHOLDER_SIZE);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let origin = response.rect.min;
        painter.rect_filled(response.rect, 0.0, VIDEO_BACKGROUND);

        if !self.show_overlay {
            return;
        }
        for command in commands {
            match command {
                // The canvas is repainted from scratch every frame.
                DrawCommand::Clear(_) => {}
                DrawCommand::FillRect { rect, color } => {
                    painter.rect_filled(to_rect(origin, rect), 0.0, to_color32(*color));
                }
                DrawCommand::FillText { text, at, style } => {
                    painter.text(
                        to_pos(origin, at),
                        baseline_anchor(style.align),
                        text,
                        FontId::proportional(style.font_px),
                        to_color32(style.color),
                    );
                }
            }
        }
    }
}

impl eframe::App for OverlayViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let status = self.status_rx.borrow().clone();
        let commands = self.frames_rx.borrow().clone();

        egui::TopBottomPanel::top("overlay_controls").show(ctx, |ui| {
            ui.heading(WINDOW_TITLE);
            ui.horizontal(|ui| {
                ui.checkbox(&mut self.show_overlay, "Show Overlay");
                ui.checkbox(&mut self.show_caption_info, "Show Caption Info");
            });
            if self.show_caption_info {
                let caption = self.caption_rx.borrow();
                ui.label(format!("Caption: {:?} - {}", caption.kind, caption.text));
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| match status.message() {
            Some(message) => {
                ui.centered_and_justified(|ui| {
                    ui.heading(message);
                });
            }
            None => self.draw_canvas(ui, &commands),
        });

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

/// Surface size taken from the full clear every tick starts with.
fn canvas_size(commands: &[DrawCommand]) -> Option<Vec2> {
    commands.iter().find_map(|command| match command {
        DrawCommand::Clear(rect) if rect.x == 0.0 && rect.y == 0.0 => {
            Some(Vec2::new(rect.width, rect.height))
        }
        _ => None,
    })
}

fn baseline_anchor(align: TextAlign) -> Align2 {
    match align {
        TextAlign::Left => Align2::LEFT_BOTTOM,
        TextAlign::Center => Align2::CENTER_BOTTOM,
        TextAlign::Right => Align2::RIGHT_BOTTOM,
    }
}

fn to_pos(origin: Pos2, point: &Point) -> Pos2 {
    origin + Vec2::new(point.x, point.y)
}

fn to_rect(origin: Pos2, rect: &BoundingBox) -> Rect {
    Rect::from_min_size(
        origin + Vec2::new(rect.x, rect.y),
        Vec2::new(rect.width, rect.height),
    )
}

fn to_color32(color: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::surface::TextStyle;

    #[test]
    fn canvas_size_comes_from_the_full_clear() {
        let commands = [
            DrawCommand::Clear(BoundingBox::new(0.0, 0.0, 640.0, 480.0)),
            DrawCommand::FillText {
                text: "look at the camera".into(),
                at: Point::new(320.0, 240.0),
                style: TextStyle {
                    font_px: 24.0,
                    color: Color::WHITE,
                    align: TextAlign::Center,
                },
            },
        ];
        assert_eq!(canvas_size(&commands), Some(Vec2::new(640.0, 480.0)));
        assert_eq!(canvas_size(&[]), None);
    }

    #[test]
    fn rects_are_offset_by_the_canvas_origin() {
        let rect = to_rect(
            Pos2::new(5.0, 5.0),
            &BoundingBox::new(90.0, 160.0, 100.0, 35.0),
        );
        assert_eq!(rect.min, Pos2::new(95.0, 165.0));
        assert_eq!(rect.max, Pos2::new(195.0, 200.0));
    }
}
