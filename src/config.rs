use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::Level;

use crate::error::AppError;
use crate::pipeline::signals::MIN_KEYPOINT_CONFIDENCE;
use crate::pipeline::CaptionTexts;

pub const DEFAULT_CONFIG_FILE: &str = "facecaption";
pub const ENV_PREFIX: &str = "FACECAPTION";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base location handed to every model loader.
    pub model_base_url: String,
    pub log_level: String,
    /// Scenario replayed by the scripted collaborators; the built-in demo when unset.
    pub scenario_path: Option<String>,
    /// Opens the overlay window.
    pub viewer: bool,
    pub caption: CaptionSettings,
    pub render: RenderSettings,
    pub signals: SignalSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    pub period_ms: u64,
    pub texts: CaptionTexts,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub period_ms: u64,
    pub fallback_text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    pub min_keypoint_confidence: f32,
    pub hat_label: String,
    pub sunglasses_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_base_url: "./models".to_string(),
            log_level: "info".to_string(),
            scenario_path: None,
            viewer: false,
            caption: CaptionSettings::default(),
            render: RenderSettings::default(),
            signals: SignalSettings::default(),
        }
    }
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            period_ms: 3000,
            texts: CaptionTexts::default(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            period_ms: 100,
            fallback_text: "look at the camera".to_string(),
        }
    }
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            min_keypoint_confidence: MIN_KEYPOINT_CONFIDENCE,
            hat_label: "hat".to_string(),
            sunglasses_label: "sunglasses".to_string(),
        }
    }
}

impl Settings {
    /// Layers the optional config file and `FACECAPTION__*` environment variables over the defaults.
    /// An explicitly named file must exist.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let file = match path {
            Some(path) => config::File::with_name(path),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings: Settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate().map_err(AppError::InvalidConfig)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.caption.period_ms == 0 {
            return Err("Caption period must be greater than 0".to_string());
        }

        if self.render.period_ms == 0 {
            return Err("Render period must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.signals.min_keypoint_confidence) {
            return Err("Keypoint confidence threshold must be between 0.0 and 1.0".to_string());
        }

        if Level::from_str(&self.log_level).is_err() {
            return Err(format!("Unknown log level '{}'", self.log_level));
        }

        Ok(())
    }

    pub fn log_level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }

    pub fn caption_period(&self) -> Duration {
        Duration::from_millis(self.caption.period_ms)
    }

    pub fn render_period(&self) -> Duration {
        Duration::from_millis(self.render.period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.caption_period(), Duration::from_millis(3000));
        assert_eq!(settings.render_period(), Duration::from_millis(100));
        assert_eq!(settings.render.fallback_text, "look at the camera");
        assert_eq!(settings.log_level(), Level::INFO);
    }

    #[test]
    fn zero_periods_are_rejected() {
        let mut settings = Settings::default();
        settings.caption.period_ms = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.render.period_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let settings = Settings {
            log_level: "chatty".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(
                "viewer = true\n[caption]\nperiod_ms = 500\n[caption.texts]\nhat = \"Nice hat\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(settings.viewer);
        assert_eq!(settings.caption.period_ms, 500);
        assert_eq!(settings.caption.texts.hat, "Nice hat");
        assert_eq!(settings.caption.texts.sunglasses, CaptionTexts::default().sunglasses);
        assert_eq!(settings.render.period_ms, 100);
    }
}
