use std::collections::VecDeque;

/// Outcome of the outlier gate for one raw sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Sample is plausible and should be measured
    Accept,
    /// Sample is dropped for this frame
    Reject,
}

/// Velocity-bound outlier gate.
///
/// A raw sample is rejected when its jump from the last accepted sample is
/// larger than `factor` times the mean of the recent accepted jumps (with a
/// floor of `min_bound`). A rejected sample that agrees with the previous
/// rejected one (it stayed put, or kept moving along the same jump) is a
/// deliberate move rather than a spike and is accepted right away. After
/// `max_consecutive_rejects` rejections in a row the next sample is accepted
/// anyway. Either way the history starts over.
#[derive(Debug, Clone)]
pub struct OutlierGate {
    factor: f64,
    window: usize,
    min_bound: f64,
    min_history: usize,
    max_consecutive_rejects: u32,
    deltas: VecDeque<f64>,
    last_accepted: Option<(f64, f64)>,
    last_rejected: Option<(f64, f64)>,
    consecutive_rejects: u32,
}

impl OutlierGate {
    /// Create a new gate
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero or `factor` is not positive
    #[must_use]
    pub fn new(factor: f64, window: usize, min_bound: f64, min_history: usize, max_consecutive_rejects: u32) -> Self {
        assert!(window > 0, "Window size must be greater than 0");
        assert!(factor > 0.0, "Outlier factor must be positive, got {factor}");
        Self {
            factor,
            window,
            min_bound,
            min_history,
            max_consecutive_rejects,
            deltas: VecDeque::with_capacity(window),
            last_accepted: None,
            last_rejected: None,
            consecutive_rejects: 0,
        }
    }

    /// Current rejection bound, if enough history has been gathered
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Window is small
    pub fn bound(&self) -> Option<f64> {
        if self.deltas.len() < self.min_history.max(1) {
            return None;
        }
        let mean = self.deltas.iter().sum::<f64>() / self.deltas.len() as f64;
        Some((self.factor * mean).max(self.min_bound))
    }

    /// Classify a raw sample and record it if accepted
    pub fn check(&mut self, x: f64, y: f64) -> GateDecision {
        if !(x.is_finite() && y.is_finite()) {
            return GateDecision::Reject;
        }

        let Some((last_x, last_y)) = self.last_accepted else {
            self.last_accepted = Some((x, y));
            return GateDecision::Accept;
        };

        let delta = (x - last_x).hypot(y - last_y);

        if let Some(bound) = self.bound() {
            if delta > bound {
                let consistent = self.follows_rejected(x, y, (last_x, last_y), bound);
                if !consistent && self.consecutive_rejects < self.max_consecutive_rejects {
                    self.consecutive_rejects += 1;
                    self.last_rejected = Some((x, y));
                    log::debug!("Rejected outlier: jump {delta:.4} > bound {bound:.4}");
                    return GateDecision::Reject;
                }

                log::debug!("Re-acquiring after {} rejected samples", self.consecutive_rejects);
                self.deltas.clear();
                self.last_accepted = Some((x, y));
                self.last_rejected = None;
                self.consecutive_rejects = 0;
                return GateDecision::Accept;
            }
        }

        if self.deltas.len() >= self.window {
            self.deltas.pop_front();
        }
        self.deltas.push_back(delta);
        self.last_accepted = Some((x, y));
        self.last_rejected = None;
        self.consecutive_rejects = 0;
        GateDecision::Accept
    }

    /// Whether `(x, y)` confirms the previous rejected sample
    ///
    /// True when it lies within `bound` of that sample, or of where that
    /// sample's jump would have carried on to.
    fn follows_rejected(&self, x: f64, y: f64, accepted: (f64, f64), bound: f64) -> bool {
        let Some((rx, ry)) = self.last_rejected else {
            return false;
        };
        let (step_x, step_y) = (rx - accepted.0, ry - accepted.1);
        let tolerance = bound.max(0.5 * step_x.hypot(step_y));

        (x - rx).hypot(y - ry) <= bound || (x - (rx + step_x)).hypot(y - (ry + step_y)) <= tolerance
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.deltas.clear();
        self.last_accepted = None;
        self.last_rejected = None;
        self.consecutive_rejects = 0;
    }
}
