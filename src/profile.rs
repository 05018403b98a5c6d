//! Persisted user records: the calibration profile and the click mapping.
//!
//! Both are flat, versionless key/value records. Every field has a default,
//! so a record with missing keys still loads. YAML is used on disk; since YAML
//! is a superset of JSON, `calibration.json` files written by older tools load
//! as-is.

use crate::{
    blink::ClickKind,
    constants::{
        DEFAULT_CLICK_COOLDOWN, DEFAULT_DEADZONE_PX, DEFAULT_DOUBLE_BLINK_WINDOW, DEFAULT_EAR_CONSECUTIVE_FRAMES,
        DEFAULT_EAR_THRESHOLD, DEFAULT_LONG_BLINK_THRESHOLD, DEFAULT_SMOOTHING_ALPHA,
    },
    Error, Result,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;

/// Mapping from head position to screen space plus blink sensitivity.
///
/// Treated as a value object: the pipeline holds the active copy and only
/// replaces it wholesale after validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationProfile {
    /// Normalized nose x when looking at the screen center
    pub center_x: f64,
    /// Normalized nose y when looking at the screen center
    pub center_y: f64,
    /// Leftmost normalized nose x (maps to the screen's left edge)
    pub min_x: f64,
    /// Rightmost normalized nose x
    pub max_x: f64,
    /// Topmost normalized nose y
    pub min_y: f64,
    /// Bottommost normalized nose y
    pub max_y: f64,
    /// Eyes count as closed below this EAR
    pub ear_threshold: f64,
    /// Frames below threshold before a closure is accepted
    pub ear_consecutive_frames: u32,
    /// Horizontal gain around the center
    pub sensitivity_x: f64,
    /// Vertical gain around the center
    pub sensitivity_y: f64,
    /// Minimum cursor displacement in pixels before the cursor moves
    pub deadzone_px: f64,
    /// Base EMA weight of the newest sample
    pub smoothing_alpha: f64,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            center_x: 0.5,
            center_y: 0.5,
            min_x: 0.0,
            max_x: 1.0,
            min_y: 0.0,
            max_y: 1.0,
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            ear_consecutive_frames: DEFAULT_EAR_CONSECUTIVE_FRAMES,
            sensitivity_x: 1.0,
            sensitivity_y: 1.0,
            deadzone_px: DEFAULT_DEADZONE_PX,
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
        }
    }
}

impl CalibrationProfile {
    /// Check every invariant of the profile
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` naming the first violated invariant
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("center_x", self.center_x),
            ("center_y", self.center_y),
            ("min_x", self.min_x),
            ("max_x", self.max_x),
            ("min_y", self.min_y),
            ("max_y", self.max_y),
            ("ear_threshold", self.ear_threshold),
            ("sensitivity_x", self.sensitivity_x),
            ("sensitivity_y", self.sensitivity_y),
            ("deadzone_px", self.deadzone_px),
            ("smoothing_alpha", self.smoothing_alpha),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::Configuration(format!("{name} must be finite, got {value}")));
        }

        if self.min_x >= self.max_x {
            return Err(Error::Configuration(format!(
                "min_x ({}) must be less than max_x ({})",
                self.min_x, self.max_x
            )));
        }
        if self.min_y >= self.max_y {
            return Err(Error::Configuration(format!(
                "min_y ({}) must be less than max_y ({})",
                self.min_y, self.max_y
            )));
        }
        if self.ear_threshold <= 0.0 {
            return Err(Error::Configuration("EAR threshold must be positive".to_string()));
        }
        if self.ear_consecutive_frames == 0 {
            return Err(Error::Configuration(
                "EAR consecutive frames must be at least 1".to_string(),
            ));
        }
        if self.sensitivity_x <= 0.0 || self.sensitivity_y <= 0.0 {
            return Err(Error::Configuration("Sensitivity must be positive".to_string()));
        }
        if self.deadzone_px < 0.0 {
            return Err(Error::Configuration("Deadzone must be non-negative".to_string()));
        }
        if self.smoothing_alpha <= 0.0 || self.smoothing_alpha > 1.0 {
            return Err(Error::Configuration(
                "Smoothing alpha must be in (0, 1]".to_string(),
            ));
        }

        Ok(())
    }

    /// Width of the calibrated box on the x axis
    #[must_use]
    pub fn span_x(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the calibrated box on the y axis
    #[must_use]
    pub fn span_y(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Load a profile record; missing keys take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_record(path)
    }

    /// Save the profile as a flat record
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_record(self, path)
    }
}

/// What a blink gesture turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickAction {
    /// Single left click
    LeftClick,
    /// Left double click
    DoubleClick,
    /// Single right click
    RightClick,
    /// Gesture is ignored
    None,
}

impl ClickAction {
    /// Click kind delivered to the injector, if any
    #[must_use]
    pub const fn kind(self) -> Option<ClickKind> {
        match self {
            Self::LeftClick => Some(ClickKind::Left),
            Self::DoubleClick => Some(ClickKind::Double),
            Self::RightClick => Some(ClickKind::Right),
            Self::None => None,
        }
    }
}

/// Blink gesture to click translation and its timing, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickMapping {
    /// Action for one short blink
    pub single_blink_action: ClickAction,
    /// Action for two short blinks inside the window
    pub double_blink_action: ClickAction,
    /// Action for one long blink
    pub long_blink_action: ClickAction,
    /// Time after a short blink during which a second one makes a double
    pub double_blink_window: f64,
    /// Closures at least this long are long blinks
    pub long_blink_threshold: f64,
    /// Minimum time between two emitted clicks of any kind
    pub click_cooldown: f64,
}

impl Default for ClickMapping {
    fn default() -> Self {
        Self {
            single_blink_action: ClickAction::LeftClick,
            double_blink_action: ClickAction::DoubleClick,
            long_blink_action: ClickAction::RightClick,
            double_blink_window: DEFAULT_DOUBLE_BLINK_WINDOW,
            long_blink_threshold: DEFAULT_LONG_BLINK_THRESHOLD,
            click_cooldown: DEFAULT_CLICK_COOLDOWN,
        }
    }
}

impl ClickMapping {
    /// Validate timing values
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for non-finite or out-of-range durations
    pub fn validate(&self) -> Result<()> {
        if !(self.double_blink_window.is_finite() && self.double_blink_window > 0.0) {
            return Err(Error::Configuration(
                "Double blink window must be positive".to_string(),
            ));
        }
        if !(self.long_blink_threshold.is_finite() && self.long_blink_threshold > 0.0) {
            return Err(Error::Configuration(
                "Long blink threshold must be positive".to_string(),
            ));
        }
        if !(self.click_cooldown.is_finite() && self.click_cooldown >= 0.0) {
            return Err(Error::Configuration(
                "Click cooldown must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a click mapping record; missing keys take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_record(path)
    }

    /// Save the click mapping as a flat record
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_record(self, path)
    }
}

fn load_record<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| Error::Serialization(format!("Failed to parse record: {e}")))
}

fn save_record<T: Serialize, P: AsRef<Path>>(record: &T, path: P) -> Result<()> {
    let content =
        serde_yaml::to_string(record).map_err(|e| Error::Serialization(format!("Failed to serialize record: {e}")))?;
    std::fs::write(path, content)?;
    Ok(())
}
