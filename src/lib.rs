pub mod app;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod intake;
pub mod pipeline;

pub use config::Settings;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{AppError, DetectorError, MediaError};
