/// Speed-adaptive exponential smoothing.
///
/// The EMA weight grows with head speed: a still head gets heavy smoothing,
/// a deliberate movement gets a fast response.
#[derive(Debug, Clone)]
pub struct AdaptiveSmoother {
    still_speed: f64,
    fast_speed: f64,
    still_factor: f64,
    max_alpha: f64,
    last: Option<(f64, f64)>,
    last_alpha: Option<f64>,
}

impl AdaptiveSmoother {
    /// Create a new smoother
    ///
    /// `still_speed` and `fast_speed` are in normalized units per second.
    ///
    /// # Panics
    ///
    /// Panics if the speed band is empty or the alphas are out of range
    #[must_use]
    pub fn new(still_speed: f64, fast_speed: f64, still_factor: f64, max_alpha: f64) -> Self {
        assert!(still_speed >= 0.0 && fast_speed > still_speed, "Speed band must be increasing");
        assert!(still_factor > 0.0 && still_factor <= 1.0, "Still factor must be in (0, 1]");
        assert!(max_alpha > 0.0 && max_alpha <= 1.0, "Alpha must be in (0, 1]");
        Self {
            still_speed,
            fast_speed,
            still_factor,
            max_alpha,
            last: None,
            last_alpha: None,
        }
    }

    /// EMA weight for `speed` given the profile's base weight
    #[must_use]
    pub fn alpha_for(&self, base_alpha: f64, speed: f64) -> f64 {
        let base_alpha = base_alpha.clamp(f64::EPSILON, 1.0);
        let top = self.max_alpha.max(base_alpha);

        let alpha = if !speed.is_finite() || speed >= self.fast_speed {
            top
        } else if speed < self.still_speed {
            base_alpha * self.still_factor
        } else {
            let t = (speed - self.still_speed) / (self.fast_speed - self.still_speed);
            (top - base_alpha).mul_add(t, base_alpha)
        };

        alpha.clamp(f64::EPSILON, 1.0)
    }

    /// Smooth one position
    pub fn apply(&mut self, x: f64, y: f64, base_alpha: f64, speed: f64) -> (f64, f64) {
        let alpha = self.alpha_for(base_alpha, speed);
        self.last_alpha = Some(alpha);

        let smoothed = match self.last {
            Some((last_x, last_y)) => (
                alpha.mul_add(x - last_x, last_x),
                alpha.mul_add(y - last_y, last_y),
            ),
            None => (x, y),
        };

        self.last = Some(smoothed);
        smoothed
    }

    /// Weight used for the most recent sample
    #[must_use]
    pub const fn last_alpha(&self) -> Option<f64> {
        self.last_alpha
    }

    /// Last smoothed position
    #[must_use]
    pub const fn last(&self) -> Option<(f64, f64)> {
        self.last
    }

    /// Forget the running average
    pub fn reset(&mut self) {
        self.last = None;
        self.last_alpha = None;
    }
}
