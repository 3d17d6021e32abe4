pub mod detection;
pub mod frame;
pub mod geometry;

pub use detection::{
    resize_results, Expression, ExpressionScores, FaceResult, Keypoint, ObjectResult, PoseResult,
};
pub use frame::Frame;
pub use geometry::{BoundingBox, Dimensions, Point};
