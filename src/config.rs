//! Configuration management for the head pointer

use crate::{
    calibration::CalibrationConfig,
    constants::DEFAULT_NO_FACE_TIMEOUT,
    features::FeatureConfig,
    filters::FilterConfig,
    mapping::ScreenRect,
    profile::{CalibrationProfile, ClickMapping},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Active calibration profile
    pub profile: CalibrationProfile,

    /// Blink gesture to click mapping
    pub clicks: ClickMapping,

    /// Cursor filter tuning
    pub filter: FilterConfig,

    /// Calibration run parameters
    pub calibration: CalibrationConfig,

    /// Landmark scheme and camera frame size
    pub features: FeatureConfig,

    /// Idle and lost-face handling
    pub safety: SafetyConfig,

    /// Target screen rectangle
    pub screen: ScreenRect,
}

/// Lost-face handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Seconds without a face before the pipeline pauses itself
    pub no_face_timeout: f64,

    /// Resume automatically when the face comes back
    pub auto_resume: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            no_face_timeout: DEFAULT_NO_FACE_TIMEOUT,
            auto_resume: true,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Serialization(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.profile.validate()?;
        self.clicks.validate()?;
        self.filter.validate()?;
        self.calibration.validate()?;
        self.features.validate()?;
        self.screen.validate()?;

        if !(self.safety.no_face_timeout.is_finite() && self.safety.no_face_timeout > 0.0) {
            return Err(Error::Configuration(
                "No-face timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head Pointer Configuration

# Calibration profile (normally written by a calibration run)
profile:
  center_x: 0.5
  center_y: 0.5
  min_x: 0.0
  max_x: 1.0
  min_y: 0.0
  max_y: 1.0
  ear_threshold: 0.21
  ear_consecutive_frames: 2
  sensitivity_x: 1.0
  sensitivity_y: 1.0
  deadzone_px: 8.0
  smoothing_alpha: 0.25

# Blink gestures: left_click, double_click, right_click or none
clicks:
  single_blink_action: left_click
  double_blink_action: double_click
  long_blink_action: right_click
  double_blink_window: 0.5
  long_blink_threshold: 0.3
  click_cooldown: 0.5

# Cursor filter chain
filter:
  process_noise: 1.0
  measurement_noise: 0.00001
  min_dt: 0.004166666666666667
  max_dt: 0.1
  outlier_factor: 3.0
  outlier_window: 10
  outlier_min_bound: 0.03
  outlier_min_history: 3
  max_consecutive_rejects: 5
  still_speed: 0.05
  fast_speed: 0.5
  still_factor: 0.5
  max_alpha: 0.8

# Calibration run
calibration:
  capture_frames: 30
  settle_frames: 10
  blink_capture_frames: 90
  trim_fraction: 0.1
  ear_threshold_min: 0.1
  ear_threshold_max: 0.35
  min_ear_separation: 0.05

# Landmark scheme (MediaPipe Face Mesh) and camera frame size
features:
  scheme:
    nose_tip: 1
    left_eye: [33, 160, 158, 133, 153, 144]
    right_eye: [362, 385, 387, 263, 373, 380]
  frame_width: 640.0
  frame_height: 480.0

# Lost-face handling
safety:
  no_face_timeout: 5.0
  auto_resume: true

# Target screen
screen:
  x: 0
  y: 0
  width: 1920
  height: 1080
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let config = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_yaml("safety:\n  auto_resume: false\n").unwrap();
        assert!(!config.safety.auto_resume);
        assert_eq!(config.safety.no_face_timeout, DEFAULT_NO_FACE_TIMEOUT);
        assert_eq!(config.profile, CalibrationProfile::default());
    }

    #[test]
    fn test_invalid_sections_rejected() {
        let mut config = Config::default();
        config.safety.no_face_timeout = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.screen.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(Config::from_yaml("profile: [1, 2"), Err(Error::Serialization(_))));
    }
}
