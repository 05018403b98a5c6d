//! Cursor filter chain.
//!
//! Turns a noisy normalized nose position into a stable screen coordinate.
//! Stages, in order:
//!
//! 1. outlier rejection ([`outlier::OutlierGate`])
//! 2. constant-velocity Kalman estimation ([`kalman::KalmanFilter`])
//! 3. speed-adaptive exponential smoothing ([`adaptive::AdaptiveSmoother`])
//! 4. deadzone ([`deadzone::Deadzone`]), measured in mapped pixels
//! 5. affine mapping onto the screen ([`crate::mapping`])
//!
//! [`CursorFilterChain`] holds the validated, read-only parameters;
//! [`FilterState`] holds everything that changes per frame and is passed in
//! explicitly, so one chain never hides mutable state.

/// Constant-velocity Kalman filter
pub mod kalman;

/// Velocity-bound outlier rejection
pub mod outlier;

/// Speed-adaptive exponential smoothing
pub mod adaptive;

/// Pixel deadzone
pub mod deadzone;

use crate::{
    constants::{
        DEFAULT_FAST_SPEED, DEFAULT_FPS, DEFAULT_KALMAN_MEASUREMENT_NOISE, DEFAULT_KALMAN_PROCESS_NOISE,
        DEFAULT_MAX_ALPHA, DEFAULT_MAX_CONSECUTIVE_REJECTS, DEFAULT_MAX_DT, DEFAULT_MIN_DT, DEFAULT_OUTLIER_FACTOR,
        DEFAULT_OUTLIER_MIN_BOUND, DEFAULT_OUTLIER_MIN_HISTORY, DEFAULT_OUTLIER_WINDOW, DEFAULT_STILL_FACTOR,
        DEFAULT_STILL_SPEED,
    },
    mapping::{map_to_screen, ScreenPoint, ScreenRect},
    profile::CalibrationProfile,
    Error, Result,
};
use adaptive::AdaptiveSmoother;
use deadzone::Deadzone;
use kalman::KalmanFilter;
use log::debug;
use outlier::{GateDecision, OutlierGate};
use serde::{Deserialize, Serialize};

/// Tuning constants of the filter chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Kalman acceleration variance (normalized units² / s⁴)
    pub process_noise: f64,
    /// Kalman measurement variance (normalized units²)
    pub measurement_noise: f64,
    /// Smallest time step fed to the Kalman filter, in seconds
    pub min_dt: f64,
    /// Largest time step fed to the Kalman filter, in seconds
    pub max_dt: f64,
    /// Reject jumps larger than this multiple of the recent mean jump
    pub outlier_factor: f64,
    /// Number of recent jumps averaged by the outlier gate
    pub outlier_window: usize,
    /// Jumps below this are never rejected (normalized units)
    pub outlier_min_bound: f64,
    /// Jumps needed before the gate starts rejecting
    pub outlier_min_history: usize,
    /// Rejections in a row before a sample is force-accepted
    pub max_consecutive_rejects: u32,
    /// Below this speed the smoothing weight is reduced (units / s)
    pub still_speed: f64,
    /// At or above this speed the smoothing weight is `max_alpha` (units / s)
    pub fast_speed: f64,
    /// Multiplier on the base weight while still
    pub still_factor: f64,
    /// Largest smoothing weight
    pub max_alpha: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: DEFAULT_KALMAN_PROCESS_NOISE,
            measurement_noise: DEFAULT_KALMAN_MEASUREMENT_NOISE,
            min_dt: DEFAULT_MIN_DT,
            max_dt: DEFAULT_MAX_DT,
            outlier_factor: DEFAULT_OUTLIER_FACTOR,
            outlier_window: DEFAULT_OUTLIER_WINDOW,
            outlier_min_bound: DEFAULT_OUTLIER_MIN_BOUND,
            outlier_min_history: DEFAULT_OUTLIER_MIN_HISTORY,
            max_consecutive_rejects: DEFAULT_MAX_CONSECUTIVE_REJECTS,
            still_speed: DEFAULT_STILL_SPEED,
            fast_speed: DEFAULT_FAST_SPEED,
            still_factor: DEFAULT_STILL_FACTOR,
            max_alpha: DEFAULT_MAX_ALPHA,
        }
    }
}

impl FilterConfig {
    /// Validate the tuning constants
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` naming the offending value
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("process_noise", self.process_noise),
            ("measurement_noise", self.measurement_noise),
            ("min_dt", self.min_dt),
            ("max_dt", self.max_dt),
            ("outlier_factor", self.outlier_factor),
            ("fast_speed", self.fast_speed),
            ("still_factor", self.still_factor),
            ("max_alpha", self.max_alpha),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(Error::Configuration(format!("{name} must be positive, got {value}")));
        }
        if self.min_dt > self.max_dt {
            return Err(Error::Configuration("min_dt must not exceed max_dt".to_string()));
        }
        if self.outlier_window == 0 {
            return Err(Error::Configuration(
                "Outlier window size must be greater than 0".to_string(),
            ));
        }
        if !(self.outlier_min_bound.is_finite() && self.outlier_min_bound >= 0.0) {
            return Err(Error::Configuration("outlier_min_bound must be non-negative".to_string()));
        }
        if !(self.still_speed.is_finite() && self.still_speed >= 0.0 && self.still_speed < self.fast_speed) {
            return Err(Error::Configuration(
                "still_speed must be non-negative and below fast_speed".to_string(),
            ));
        }
        if self.still_factor > 1.0 || self.max_alpha > 1.0 {
            return Err(Error::Configuration(
                "still_factor and max_alpha must be at most 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Mutable per-frame state of one filter chain
#[derive(Debug, Clone)]
pub struct FilterState {
    gate: OutlierGate,
    kalman: KalmanFilter,
    smoother: AdaptiveSmoother,
    deadzone: Deadzone,
    last_timestamp: Option<f64>,
    last_output: Option<ScreenPoint>,
    rejected_frames: u64,
}

impl FilterState {
    /// Fresh state for the given tuning
    #[must_use]
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            gate: OutlierGate::new(
                config.outlier_factor,
                config.outlier_window,
                config.outlier_min_bound,
                config.outlier_min_history,
                config.max_consecutive_rejects,
            ),
            kalman: KalmanFilter::new(config.process_noise, config.measurement_noise),
            smoother: AdaptiveSmoother::new(
                config.still_speed,
                config.fast_speed,
                config.still_factor,
                config.max_alpha,
            ),
            deadzone: Deadzone::new(),
            last_timestamp: None,
            last_output: None,
            rejected_frames: 0,
        }
    }

    /// Forget all history (recenter, calibration change)
    pub fn reset(&mut self) {
        self.gate.reset();
        self.kalman.reset();
        self.smoother.reset();
        self.deadzone.reset();
        self.last_timestamp = None;
        self.last_output = None;
    }

    /// Kalman estimate `(x, y, vx, vy)`, if initialized
    #[must_use]
    pub fn kalman_estimate(&self) -> Option<(f64, f64, f64, f64)> {
        self.kalman.is_initialized().then(|| {
            let (x, y) = self.kalman.position();
            let (vx, vy) = self.kalman.velocity();
            (x, y, vx, vy)
        })
    }

    /// Last smoothed normalized position
    #[must_use]
    pub const fn smoothed(&self) -> Option<(f64, f64)> {
        self.smoother.last()
    }

    /// Last emitted cursor position
    #[must_use]
    pub const fn last_output(&self) -> Option<ScreenPoint> {
        self.last_output
    }

    /// Samples dropped by the outlier gate since creation
    #[must_use]
    pub const fn rejected_frames(&self) -> u64 {
        self.rejected_frames
    }

    fn time_step(&mut self, timestamp_s: f64, config: &FilterConfig) -> f64 {
        let dt = match self.last_timestamp {
            Some(last) if timestamp_s.is_finite() => timestamp_s - last,
            _ => 1.0 / DEFAULT_FPS,
        };
        if timestamp_s.is_finite() {
            self.last_timestamp = Some(timestamp_s);
        }
        if dt.is_finite() {
            dt.clamp(config.min_dt, config.max_dt)
        } else {
            1.0 / DEFAULT_FPS
        }
    }
}

/// Validated parameters of the cursor filter chain
#[derive(Debug, Clone)]
pub struct CursorFilterChain {
    profile: CalibrationProfile,
    config: FilterConfig,
    screen: ScreenRect,
}

impl CursorFilterChain {
    /// Build a chain; all invariants are checked here rather than per frame
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the profile, tuning or screen is invalid
    pub fn new(profile: CalibrationProfile, config: FilterConfig, screen: ScreenRect) -> Result<Self> {
        profile.validate()?;
        config.validate()?;
        screen.validate()?;
        Ok(Self { profile, config, screen })
    }

    /// Fresh state matching this chain's tuning
    #[must_use]
    pub fn new_state(&self) -> FilterState {
        FilterState::new(&self.config)
    }

    /// Active profile
    #[must_use]
    pub const fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// Tuning constants
    #[must_use]
    pub const fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Target screen
    #[must_use]
    pub const fn screen(&self) -> ScreenRect {
        self.screen
    }

    /// Switch the target screen without resetting the filters
    ///
    /// Only the deadzone anchor is dropped, so the next frame lands inside the
    /// new rectangle.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for an invalid rectangle; the old one stays
    pub fn set_screen(&mut self, screen: ScreenRect, state: &mut FilterState) -> Result<()> {
        screen.validate()?;
        self.screen = screen;
        state.deadzone.reset();
        state.last_output = state.last_output.map(|p| screen.clamp(p));
        Ok(())
    }

    /// Run one raw sample through every stage
    pub fn process(&self, state: &mut FilterState, raw_x: f64, raw_y: f64, timestamp_s: f64) -> ScreenPoint {
        let dt = state.time_step(timestamp_s, &self.config);

        if state.gate.check(raw_x, raw_y) == GateDecision::Reject {
            state.kalman.predict(dt);
            state.rejected_frames += 1;
            return self.hold(state);
        }

        let (kx, ky) = state.kalman.step(raw_x, raw_y, dt);
        if !(kx.is_finite() && ky.is_finite()) {
            debug!("Kalman estimate diverged, restarting from the raw sample");
            state.kalman.reset();
            state.kalman.update(raw_x, raw_y);
            return self.hold(state);
        }

        let (vx, vy) = state.kalman.velocity();
        let speed = vx.hypot(vy);
        let (sx, sy) = state.smoother.apply(kx, ky, self.profile.smoothing_alpha, speed);

        let candidate = map_to_screen(&self.profile, &self.screen, sx, sy);
        let output = state.deadzone.apply(candidate, self.profile.deadzone_px);
        state.last_output = Some(output);
        output
    }

    fn hold(&self, state: &FilterState) -> ScreenPoint {
        state.last_output.unwrap_or_else(|| self.screen.center())
    }
}
