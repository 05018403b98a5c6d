//! Blink classification.
//!
//! Eye closure is debounced over a number of consecutive frames, its duration
//! measured on re-open, and the result classified as a single, double or long
//! blink. Gestures are translated into clicks through a [`ClickMapping`] and
//! rate-limited by a cooldown shared across click kinds.

use crate::profile::{ClickAction, ClickMapping};
use log::debug;

/// Click delivered to the injector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickKind {
    /// Left click
    Left,
    /// Left double click
    Double,
    /// Right click
    Right,
}

/// A click emitted for one frame cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    /// What to click
    pub kind: ClickKind,
    /// Frame timestamp the click was decided on, in seconds
    pub timestamp_s: f64,
}

/// Recognized blink gesture, before click mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkGesture {
    /// One short blink with no follow-up inside the window
    Single,
    /// Two short blinks inside the window
    Double,
    /// One blink held at least the long threshold
    Long,
}

/// Eye phase tracked by the classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlinkPhase {
    /// Eyes open
    Open,
    /// Below threshold, not yet for enough frames
    Closing {
        /// Below-threshold frames seen so far
        frames: u32,
        /// Timestamp of the first below-threshold frame
        since_s: f64,
    },
    /// Closure confirmed
    Closed {
        /// Timestamp of the first below-threshold frame
        since_s: f64,
    },
}

/// Blink state machine
#[derive(Debug, Clone)]
pub struct BlinkClassifier {
    threshold: f64,
    consecutive_frames: u32,
    mapping: ClickMapping,
    phase: BlinkPhase,
    pending_since: Option<f64>,
    last_click: Option<f64>,
}

impl BlinkClassifier {
    /// Create a classifier
    ///
    /// `consecutive_frames` of zero is treated as one.
    #[must_use]
    pub fn new(threshold: f64, consecutive_frames: u32, mapping: ClickMapping) -> Self {
        Self {
            threshold,
            consecutive_frames: consecutive_frames.max(1),
            mapping,
            phase: BlinkPhase::Open,
            pending_since: None,
            last_click: None,
        }
    }

    /// Feed one frame; `ear` is `None` when no valid eye measurement exists
    ///
    /// Returns at most one click per call.
    pub fn update(&mut self, ear: Option<f64>, timestamp_s: f64) -> Option<ClickEvent> {
        let expired = self.tick(timestamp_s);

        let gesture = match ear.filter(|e| e.is_finite()) {
            Some(ear) => self.advance(ear, timestamp_s),
            None => None,
        };

        match (expired, gesture) {
            (Some(event), Some(gesture)) => {
                debug!("Dropping {gesture:?} blink, a click was already emitted this frame");
                Some(event)
            }
            (Some(event), None) => Some(event),
            (None, Some(gesture)) => self.emit(gesture, timestamp_s),
            (None, None) => None,
        }
    }

    /// Advance timers only; fires a pending single blink whose window elapsed
    ///
    /// The pending blink is held while a dip that may still end as its second
    /// half is in progress.
    pub fn tick(&mut self, timestamp_s: f64) -> Option<ClickEvent> {
        let pending = self.pending_since?;
        if timestamp_s - pending < self.mapping.double_blink_window || self.second_dip_open(timestamp_s) {
            return None;
        }
        self.pending_since = None;
        self.emit(BlinkGesture::Single, timestamp_s)
    }

    /// A dip started inside the window and is not yet long enough to be a long blink
    fn second_dip_open(&self, timestamp_s: f64) -> bool {
        let since_s = match self.phase {
            BlinkPhase::Open => return false,
            BlinkPhase::Closing { since_s, .. } | BlinkPhase::Closed { since_s } => since_s,
        };
        timestamp_s - since_s < self.mapping.long_blink_threshold
    }

    fn advance(&mut self, ear: f64, timestamp_s: f64) -> Option<BlinkGesture> {
        let below = ear < self.threshold;

        match self.phase {
            BlinkPhase::Open if below => {
                self.phase = self.confirm(1, timestamp_s);
                None
            }
            BlinkPhase::Open => None,
            BlinkPhase::Closing { frames, since_s } if below => {
                self.phase = self.confirm(frames + 1, since_s);
                None
            }
            BlinkPhase::Closing { frames, .. } => {
                debug!("Ignoring {frames}-frame dip below EAR threshold");
                self.phase = BlinkPhase::Open;
                None
            }
            BlinkPhase::Closed { .. } if below => None,
            BlinkPhase::Closed { since_s } => {
                self.phase = BlinkPhase::Open;
                self.classify(since_s, timestamp_s)
            }
        }
    }

    fn confirm(&self, frames: u32, since_s: f64) -> BlinkPhase {
        if frames >= self.consecutive_frames {
            BlinkPhase::Closed { since_s }
        } else {
            BlinkPhase::Closing { frames, since_s }
        }
    }

    /// Classify a dip from its onset and re-open times
    ///
    /// A short dip is the second half of a double when it began inside the
    /// window of the pending one.
    fn classify(&mut self, since_s: f64, timestamp_s: f64) -> Option<BlinkGesture> {
        let duration_s = timestamp_s - since_s;
        if duration_s >= self.mapping.long_blink_threshold {
            debug!("Long blink of {duration_s:.3}s");
            return Some(BlinkGesture::Long);
        }

        match self.pending_since {
            Some(pending) if since_s - pending < self.mapping.double_blink_window => {
                self.pending_since = None;
                Some(BlinkGesture::Double)
            }
            _ => {
                debug!("Short blink of {duration_s:.3}s, waiting for a second one");
                self.pending_since = Some(timestamp_s);
                None
            }
        }
    }

    fn emit(&mut self, gesture: BlinkGesture, timestamp_s: f64) -> Option<ClickEvent> {
        let action = match gesture {
            BlinkGesture::Single => self.mapping.single_blink_action,
            BlinkGesture::Double => self.mapping.double_blink_action,
            BlinkGesture::Long => self.mapping.long_blink_action,
        };
        let Some(kind) = action.kind() else {
            debug!("{gesture:?} blink mapped to {:?}, nothing to emit", ClickAction::None);
            return None;
        };

        if let Some(last) = self.last_click {
            if timestamp_s - last < self.mapping.click_cooldown {
                debug!("Suppressing {kind:?} click inside cooldown");
                return None;
            }
        }

        self.last_click = Some(timestamp_s);
        Some(ClickEvent { kind, timestamp_s })
    }

    /// Back to `Open`, dropping any dip in progress and the pending single blink
    ///
    /// The cooldown clock is kept.
    pub fn reset(&mut self) {
        self.phase = BlinkPhase::Open;
        self.pending_since = None;
    }

    /// Change the EAR threshold and debounce length
    pub fn set_threshold(&mut self, threshold: f64, consecutive_frames: u32) {
        self.threshold = threshold;
        self.consecutive_frames = consecutive_frames.max(1);
    }

    /// Replace the click mapping
    pub fn set_mapping(&mut self, mapping: ClickMapping) {
        self.mapping = mapping;
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> BlinkPhase {
        self.phase
    }

    /// Completion time of a short blink still waiting for a second one
    #[must_use]
    pub const fn pending_since(&self) -> Option<f64> {
        self.pending_since
    }

    /// Active EAR threshold
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Active click mapping
    #[must_use]
    pub const fn mapping(&self) -> &ClickMapping {
        &self.mapping
    }
}
