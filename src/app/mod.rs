pub mod render;
pub mod status;
pub mod surface;
pub mod viewer;

pub use render::RenderTick;
pub use status::{AppStatus, CAMERA_PERMISSION_MESSAGE, MODEL_LOAD_FAILED_MESSAGE};
pub use surface::{Color, DisplaySurface, DrawCommand, RecordingSurface, TextAlign, TextStyle};
pub use viewer::OverlayViewer;
