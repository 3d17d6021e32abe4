use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Media Error: {0}")]
    Media(#[from] MediaError),
    #[error("Detector Error: {0}")]
    Detector(#[from] DetectorError),
    #[error("Failed to load scenario: {0}")]
    Scenario(String),
    #[error("Viewer Error: {0}")]
    Viewer(String),
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
}

// Video acquisition errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    #[error("Permission to use the camera was denied")]
    PermissionDenied,
    #[error("Camera unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("Failed to load {model} model: {reason}")]
    Load { model: &'static str, reason: String },
    #[error("{detector} detection failed: {reason}")]
    Inference {
        detector: &'static str,
        reason: String,
    },
}

impl DetectorError {
    pub fn load(model: &'static str, reason: impl Into<String>) -> Self {
        Self::Load {
            model,
            reason: reason.into(),
        }
    }

    pub fn inference(detector: &'static str, reason: impl Into<String>) -> Self {
        Self::Inference {
            detector,
            reason: reason.into(),
        }
    }
}
