pub const MODEL_LOAD_FAILED_MESSAGE: &str = "Failed to load the models. Please refresh.";
pub const CAMERA_PERMISSION_MESSAGE: &str = "Please allow webcam access.";

/// What the user should be told about the feature as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppStatus {
    #[default]
    Loading,
    Running,
    /// Detection never started; the message is shown instead of the overlay.
    Failed(String),
}

impl AppStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, AppStatus::Running)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            AppStatus::Loading => Some("Loading models..."),
            AppStatus::Running => None,
            AppStatus::Failed(message) => Some(message),
        }
    }
}
