//! Guided calibration.
//!
//! The user looks at the screen center, then each corner, then blinks
//! naturally. Every step skips a few settle frames, collects a window of
//! samples and reduces it to one robust value. The new profile only exists
//! once the whole sequence finished and validated.

use crate::{
    constants::{
        DEFAULT_BLINK_CAPTURE_FRAMES, DEFAULT_CAPTURE_FRAMES, DEFAULT_SETTLE_FRAMES, DEFAULT_TRIM_FRACTION, EPSILON,
        EAR_THRESHOLD_MAX, EAR_THRESHOLD_MIN, MIN_EAR_SEPARATION,
    },
    features::FeatureSample,
    profile::CalibrationProfile,
    utils::{median, trimmed_mean},
    Error, Result,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_SPLIT_ITERATIONS: usize = 32;

/// Screen corner targeted by a capture step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        };
        f.write_str(name)
    }
}

/// Calibration state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStep {
    /// Not calibrating
    Idle,
    /// Recording the resting head position
    CenterCapture,
    /// Recording one corner of the screen
    CornerCapture(Corner),
    /// Recording eye openness while the user blinks
    BlinkThresholdCapture,
    /// Last run finished and produced a profile
    Complete,
}

impl CalibrationStep {
    /// Text shown to the user for this step
    #[must_use]
    pub const fn instruction(self) -> &'static str {
        match self {
            Self::Idle => "Calibration not running",
            Self::CenterCapture => "Look at center of screen",
            Self::CornerCapture(Corner::TopLeft) => "Look at top-left corner",
            Self::CornerCapture(Corner::TopRight) => "Look at top-right corner",
            Self::CornerCapture(Corner::BottomLeft) => "Look at bottom-left corner",
            Self::CornerCapture(Corner::BottomRight) => "Look at bottom-right corner",
            Self::BlinkThresholdCapture => "Blink naturally 3 times",
            Self::Complete => "Calibration complete",
        }
    }

    /// Whether samples are being collected
    #[must_use]
    pub const fn is_capturing(self) -> bool {
        !matches!(self, Self::Idle | Self::Complete)
    }

    const fn next(self) -> Self {
        match self {
            Self::CenterCapture => Self::CornerCapture(Corner::TopLeft),
            Self::CornerCapture(Corner::TopLeft) => Self::CornerCapture(Corner::TopRight),
            Self::CornerCapture(Corner::TopRight) => Self::CornerCapture(Corner::BottomLeft),
            Self::CornerCapture(Corner::BottomLeft) => Self::CornerCapture(Corner::BottomRight),
            Self::CornerCapture(Corner::BottomRight) => Self::BlinkThresholdCapture,
            Self::BlinkThresholdCapture | Self::Complete => Self::Complete,
            Self::Idle => Self::Idle,
        }
    }
}

impl fmt::Display for CalibrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::CenterCapture => f.write_str("center capture"),
            Self::CornerCapture(corner) => write!(f, "{corner} corner capture"),
            Self::BlinkThresholdCapture => f.write_str("blink threshold capture"),
            Self::Complete => f.write_str("complete"),
        }
    }
}

/// Calibration timing and limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Samples collected per center/corner step
    pub capture_frames: usize,
    /// Frames skipped at the start of each step
    pub settle_frames: usize,
    /// Samples collected during the blink step
    pub blink_capture_frames: usize,
    /// Fraction trimmed from each end before averaging positions
    pub trim_fraction: f64,
    /// Lowest EAR threshold calibration may produce
    pub ear_threshold_min: f64,
    /// Highest EAR threshold calibration may produce
    pub ear_threshold_max: f64,
    /// Open and closed EAR medians closer than this mean no blink was seen
    pub min_ear_separation: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            capture_frames: DEFAULT_CAPTURE_FRAMES,
            settle_frames: DEFAULT_SETTLE_FRAMES,
            blink_capture_frames: DEFAULT_BLINK_CAPTURE_FRAMES,
            trim_fraction: DEFAULT_TRIM_FRACTION,
            ear_threshold_min: EAR_THRESHOLD_MIN,
            ear_threshold_max: EAR_THRESHOLD_MAX,
            min_ear_separation: MIN_EAR_SEPARATION,
        }
    }
}

impl CalibrationConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for empty windows or inverted limits
    pub fn validate(&self) -> Result<()> {
        if self.capture_frames == 0 || self.blink_capture_frames == 0 {
            return Err(Error::Configuration(
                "Calibration capture windows must be non-empty".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&self.trim_fraction) {
            return Err(Error::Configuration(format!(
                "Trim fraction must be in [0, 0.5), got {}",
                self.trim_fraction
            )));
        }
        if !(self.ear_threshold_min > 0.0 && self.ear_threshold_min < self.ear_threshold_max) {
            return Err(Error::Configuration(
                "EAR threshold limits must satisfy 0 < min < max".to_string(),
            ));
        }
        if !(self.min_ear_separation.is_finite() && self.min_ear_separation >= 0.0) {
            return Err(Error::Configuration(
                "Minimum EAR separation must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Snapshot of a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationProgress {
    /// Current step
    pub step: CalibrationStep,
    /// Samples collected in this step
    pub collected: usize,
    /// Samples the step needs
    pub needed: usize,
    /// Text for the user
    pub instruction: &'static str,
}

/// Calibration state machine
#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    config: CalibrationConfig,
    step: CalibrationStep,
    base: CalibrationProfile,
    settle_remaining: usize,
    xs: Vec<f64>,
    ys: Vec<f64>,
    ears: Vec<f64>,
    center: Option<(f64, f64)>,
    corners: Vec<(f64, f64)>,
}

impl CalibrationEngine {
    /// Create an idle engine
    #[must_use]
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            step: CalibrationStep::Idle,
            base: CalibrationProfile::default(),
            settle_remaining: 0,
            xs: Vec::new(),
            ys: Vec::new(),
            ears: Vec::new(),
            center: None,
            corners: Vec::with_capacity(4),
        }
    }

    /// Begin a new run; any run in progress is discarded
    ///
    /// Fields calibration does not measure are copied from `base`.
    pub fn start(&mut self, base: CalibrationProfile) {
        self.clear();
        self.base = base;
        self.enter(CalibrationStep::CenterCapture);
    }

    /// Cancel the run in progress
    ///
    /// # Errors
    ///
    /// Returns `Error::CalibrationAborted` naming the interrupted step when a
    /// run was in progress
    pub fn abort(&mut self) -> Result<()> {
        let step = self.step;
        if !step.is_capturing() {
            return Ok(());
        }
        self.clear();
        self.step = CalibrationStep::Idle;
        info!("Calibration aborted during {step}");
        Err(Error::CalibrationAborted { step })
    }

    /// Feed one frame; `None` when no face was found
    ///
    /// Returns the new profile when the last step completes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the measured profile is invalid; the
    /// engine is then back in `Idle`
    pub fn feed(&mut self, sample: Option<&FeatureSample>) -> Result<Option<CalibrationProfile>> {
        if !self.step.is_capturing() {
            return Ok(None);
        }
        let Some(sample) = sample else {
            return Ok(None);
        };
        if self.settle_remaining > 0 {
            self.settle_remaining -= 1;
            return Ok(None);
        }

        if self.step == CalibrationStep::BlinkThresholdCapture {
            self.ears.push(sample.ear());
        } else {
            self.xs.push(sample.nose_x);
            self.ys.push(sample.nose_y);
        }

        if self.collected() < self.needed() {
            return Ok(None);
        }
        self.finish_step()
    }

    fn finish_step(&mut self) -> Result<Option<CalibrationProfile>> {
        match self.step {
            CalibrationStep::CenterCapture => {
                self.center = Some(self.reduce_position());
            }
            CalibrationStep::CornerCapture(_) => {
                let corner = self.reduce_position();
                self.corners.push(corner);
            }
            CalibrationStep::BlinkThresholdCapture => {
                let profile = self.build_profile();
                self.clear();
                return match profile {
                    Ok(profile) => {
                        self.step = CalibrationStep::Complete;
                        info!(
                            "Calibration complete: x [{:.3}, {:.3}], y [{:.3}, {:.3}], EAR threshold {:.3}",
                            profile.min_x, profile.max_x, profile.min_y, profile.max_y, profile.ear_threshold
                        );
                        Ok(Some(profile))
                    }
                    Err(e) => {
                        self.step = CalibrationStep::Idle;
                        warn!("Calibration failed: {e}");
                        Err(e)
                    }
                };
            }
            CalibrationStep::Idle | CalibrationStep::Complete => return Ok(None),
        }

        self.enter(self.step.next());
        Ok(None)
    }

    fn enter(&mut self, step: CalibrationStep) {
        self.step = step;
        self.settle_remaining = self.config.settle_frames;
        self.xs.clear();
        self.ys.clear();
        self.ears.clear();
        info!("Calibration step: {}", step.instruction());
    }

    fn reduce_position(&self) -> (f64, f64) {
        let fraction = self.config.trim_fraction;
        (
            trimmed_mean(&self.xs, fraction).unwrap_or(0.5),
            trimmed_mean(&self.ys, fraction).unwrap_or(0.5),
        )
    }

    fn build_profile(&self) -> Result<CalibrationProfile> {
        let (center_x, center_y) = self.center.unwrap_or((self.base.center_x, self.base.center_y));

        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in &self.corners {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        let ear_threshold = split_ear_threshold(
            &self.ears,
            self.config.min_ear_separation,
            self.config.ear_threshold_min,
            self.config.ear_threshold_max,
        )
        .unwrap_or_else(|| {
            warn!(
                "No blink separated from open-eye EAR, keeping threshold {:.3}",
                self.base.ear_threshold
            );
            self.base.ear_threshold
        });

        let profile = CalibrationProfile {
            center_x,
            center_y,
            min_x,
            max_x,
            min_y,
            max_y,
            ear_threshold,
            ..self.base
        };
        profile.validate()?;
        Ok(profile)
    }

    fn clear(&mut self) {
        self.settle_remaining = 0;
        self.xs.clear();
        self.ys.clear();
        self.ears.clear();
        self.center = None;
        self.corners.clear();
    }

    fn collected(&self) -> usize {
        if self.step == CalibrationStep::BlinkThresholdCapture {
            self.ears.len()
        } else {
            self.xs.len()
        }
    }

    fn needed(&self) -> usize {
        match self.step {
            CalibrationStep::BlinkThresholdCapture => self.config.blink_capture_frames,
            CalibrationStep::Idle | CalibrationStep::Complete => 0,
            _ => self.config.capture_frames,
        }
    }

    /// Current step
    #[must_use]
    pub const fn step(&self) -> CalibrationStep {
        self.step
    }

    /// Whether a run is in progress
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.step.is_capturing()
    }

    /// Text for the current step
    #[must_use]
    pub const fn instruction(&self) -> &'static str {
        self.step.instruction()
    }

    /// Snapshot of the current step
    #[must_use]
    pub fn progress(&self) -> CalibrationProgress {
        CalibrationProgress {
            step: self.step,
            collected: self.collected(),
            needed: self.needed(),
            instruction: self.step.instruction(),
        }
    }
}

/// EAR threshold halfway between the open-eye and closed-eye medians
///
/// The samples are split in two clusters, starting at the midpoint of their
/// range and moving the split to the midpoint of the cluster medians until it
/// settles. Returns `None` when fewer than two finite samples exist or the
/// clusters are less than `min_separation` apart.
#[must_use]
pub fn split_ear_threshold(ears: &[f64], min_separation: f64, min: f64, max: f64) -> Option<f64> {
    let values: Vec<f64> = ears.iter().copied().filter(|v| v.is_finite()).collect();
    if values.len() < 2 {
        return None;
    }

    let lowest = values.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut split = (lowest + highest) / 2.0;
    let mut medians = None;

    for _ in 0..MAX_SPLIT_ITERATIONS {
        let (closed, open): (Vec<f64>, Vec<f64>) = values.iter().copied().partition(|&v| v < split);
        let (Some(closed), Some(open)) = (median(&closed), median(&open)) else {
            return None;
        };
        medians = Some((closed, open));

        let next = (closed + open) / 2.0;
        if (next - split).abs() < EPSILON {
            break;
        }
        split = next;
    }

    let (closed, open) = medians?;
    if open - closed < min_separation {
        return None;
    }
    Some(((closed + open) / 2.0).clamp(min, max))
}
