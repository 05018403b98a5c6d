//! Normalized head position to screen pixel mapping.
//!
//! The calibrated box `[min_x, max_x] x [min_y, max_y]` is stretched over the
//! target screen rectangle, then scaled by the profile sensitivity around the
//! calibrated center and clamped to the screen.

use crate::{
    constants::{DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH},
    profile::CalibrationProfile,
    utils::safe_cast::{f64_to_i32_clamp, u32_to_i32},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute screen coordinate in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenPoint {
    /// Horizontal pixel
    pub x: i32,
    /// Vertical pixel
    pub y: i32,
}

impl ScreenPoint {
    /// Create a new point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point in pixels
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}

impl fmt::Display for ScreenPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Target screen rectangle, supplied by the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenRect {
    /// Left edge (may be negative on multi-monitor desktops)
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for ScreenRect {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: DEFAULT_SCREEN_WIDTH,
            height: DEFAULT_SCREEN_HEIGHT,
        }
    }
}

impl ScreenRect {
    /// Create a rectangle at `(x, y)` with the given size
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Validate the rectangle
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for an empty rectangle or one whose far
    /// edge does not fit in `i32`
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Configuration(format!(
                "Screen must have a non-zero size, got {}x{}",
                self.width, self.height
            )));
        }
        let right = u32_to_i32(self.width).ok().and_then(|w| self.x.checked_add(w - 1));
        let bottom = u32_to_i32(self.height).ok().and_then(|h| self.y.checked_add(h - 1));
        if right.is_none() || bottom.is_none() {
            return Err(Error::Configuration("Screen rectangle exceeds i32 range".to_string()));
        }
        Ok(())
    }

    /// Last pixel column inside the rectangle
    #[must_use]
    pub fn right(&self) -> i32 {
        let width = u32_to_i32(self.width).unwrap_or(i32::MAX);
        self.x.saturating_add(width.saturating_sub(1))
    }

    /// Last pixel row inside the rectangle
    #[must_use]
    pub fn bottom(&self) -> i32 {
        let height = u32_to_i32(self.height).unwrap_or(i32::MAX);
        self.y.saturating_add(height.saturating_sub(1))
    }

    /// Center pixel
    #[must_use]
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(
            self.x + (self.right() - self.x) / 2,
            self.y + (self.bottom() - self.y) / 2,
        )
    }

    /// Whether `point` lies inside the rectangle
    #[must_use]
    pub fn contains(&self, point: ScreenPoint) -> bool {
        (self.x..=self.right()).contains(&point.x) && (self.y..=self.bottom()).contains(&point.y)
    }

    /// Clamp `point` into the rectangle
    #[must_use]
    pub fn clamp(&self, point: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(point.x.clamp(self.x, self.right()), point.y.clamp(self.y, self.bottom()))
    }
}

/// Map a normalized position to unclamped, unrounded screen pixels
///
/// With sensitivity above one the result may lie outside `screen`;
/// [`map_to_screen`] rounds and clamps it.
#[must_use]
pub fn map_to_screen_f64(profile: &CalibrationProfile, screen: &ScreenRect, x: f64, y: f64) -> (f64, f64) {
    let u = scale_axis(x, profile.min_x, profile.span_x(), profile.center_x, profile.sensitivity_x);
    let v = scale_axis(y, profile.min_y, profile.span_y(), profile.center_y, profile.sensitivity_y);

    (
        f64::from(screen.x) + u * f64::from(screen.width),
        f64::from(screen.y) + v * f64::from(screen.height),
    )
}

/// Map a normalized position to a clamped screen pixel
#[must_use]
pub fn map_to_screen(profile: &CalibrationProfile, screen: &ScreenRect, x: f64, y: f64) -> ScreenPoint {
    let (px, py) = map_to_screen_f64(profile, screen, x, y);
    clamp_to_screen(screen, px, py)
}

/// Round and clamp pixel coordinates; non-finite values land on the screen center
#[must_use]
pub fn clamp_to_screen(screen: &ScreenRect, px: f64, py: f64) -> ScreenPoint {
    let center = screen.center();
    ScreenPoint::new(
        f64_to_i32_clamp(px, screen.x, screen.right(), center.x),
        f64_to_i32_clamp(py, screen.y, screen.bottom(), center.y),
    )
}

/// Position along one axis as a screen fraction, scaled around the calibrated center
fn scale_axis(value: f64, min: f64, span: f64, center: f64, sensitivity: f64) -> f64 {
    let fraction = (value - min) / span;
    let center_fraction = (center - min) / span;
    (fraction - center_fraction).mul_add(sensitivity, center_fraction)
}
