//! Per-frame orchestration.
//!
//! [`Pipeline`] owns the feature extractor, the cursor filter chain and its
//! state, the blink classifier and the calibration engine. It is driven by
//! calling [`Pipeline::process_frame`] once per camera frame and exposes the
//! control surface used by a front end (pause, calibrate, profile edits).

use crate::{
    blink::{BlinkClassifier, ClickEvent},
    calibration::{CalibrationEngine, CalibrationProgress},
    config::{Config, SafetyConfig},
    features::{FeatureExtractor, FeatureSample, LandmarkFrame},
    filters::{CursorFilterChain, FilterState},
    mapping::{ScreenPoint, ScreenRect},
    profile::{CalibrationProfile, ClickMapping},
    Result,
};
use log::{debug, info, warn};

/// Result of one processed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    /// Absolute cursor position
    pub position: ScreenPoint,
    /// Click to inject, if any
    pub click: Option<ClickEvent>,
}

/// Why the pipeline is paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// Paused through the control surface
    User,
    /// No face for longer than the safety timeout
    NoFace,
}

/// Frame counters since creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Every call to `process_frame`
    pub frames_received: u64,
    /// Frames that produced a cursor position
    pub frames_processed: u64,
    /// Frames whose landmarks could not be reduced to features
    pub frames_dropped: u64,
    /// Frames without a face
    pub no_face_frames: u64,
    /// Frames whose position was rejected as an outlier
    pub rejected_outliers: u64,
    /// Clicks emitted
    pub clicks: u64,
}

/// Head pointer pipeline
#[derive(Debug)]
pub struct Pipeline {
    extractor: FeatureExtractor,
    chain: CursorFilterChain,
    filter_state: FilterState,
    blink: BlinkClassifier,
    calibration: CalibrationEngine,
    safety: SafetyConfig,
    paused: Option<PauseReason>,
    no_face_since: Option<f64>,
    stats: PipelineStats,
}

impl Pipeline {
    /// Build a pipeline from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if any section is invalid
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let extractor = FeatureExtractor::new(&config.features)?;
        let chain = CursorFilterChain::new(config.profile, config.filter.clone(), config.screen)?;
        let filter_state = chain.new_state();
        let blink = BlinkClassifier::new(
            config.profile.ear_threshold,
            config.profile.ear_consecutive_frames,
            config.clicks,
        );

        info!(
            "Pipeline ready: screen {}x{}+{}+{}, EAR threshold {:.3}",
            config.screen.width, config.screen.height, config.screen.x, config.screen.y, config.profile.ear_threshold
        );

        Ok(Self {
            extractor,
            chain,
            filter_state,
            blink,
            calibration: CalibrationEngine::new(config.calibration.clone()),
            safety: config.safety.clone(),
            paused: None,
            no_face_since: None,
            stats: PipelineStats::default(),
        })
    }

    /// Run one frame cycle; `frame` is `None` when the detector found no face
    ///
    /// Returns `None` for frames that produce nothing: paused, calibrating,
    /// or no usable face without a pending click.
    pub fn process_frame(&mut self, frame: Option<&LandmarkFrame>, timestamp_s: f64) -> Option<FrameOutput> {
        self.stats.frames_received += 1;

        let sample = frame.and_then(|frame| self.extract(frame));
        self.track_face(sample.is_some(), timestamp_s);

        if self.paused.is_some() {
            return None;
        }

        if self.calibration.is_running() {
            self.feed_calibration(sample.as_ref());
            return None;
        }

        let Some(sample) = sample else {
            let click = self.blink.update(None, timestamp_s)?;
            self.stats.clicks += 1;
            let position = self.filter_state.last_output().unwrap_or_else(|| self.chain.screen().center());
            return Some(FrameOutput {
                position,
                click: Some(click),
            });
        };

        let rejected_before = self.filter_state.rejected_frames();
        let position = self
            .chain
            .process(&mut self.filter_state, sample.nose_x, sample.nose_y, timestamp_s);
        if self.filter_state.rejected_frames() > rejected_before {
            self.stats.rejected_outliers += 1;
        }

        let click = self.blink.update(Some(sample.ear()), timestamp_s);
        if let Some(event) = click {
            info!("{:?} click at {position}", event.kind);
            self.stats.clicks += 1;
        }

        self.stats.frames_processed += 1;
        Some(FrameOutput { position, click })
    }

    fn extract(&mut self, frame: &LandmarkFrame) -> Option<FeatureSample> {
        match self.extractor.extract(frame) {
            Ok(sample) => Some(sample),
            Err(e) => {
                debug!("Skipping frame: {e}");
                self.stats.frames_dropped += 1;
                None
            }
        }
    }

    fn track_face(&mut self, face: bool, timestamp_s: f64) {
        if face {
            self.no_face_since = None;
            if self.paused == Some(PauseReason::NoFace) && self.safety.auto_resume {
                info!("Face found again, resuming");
                self.paused = None;
            }
            return;
        }

        self.stats.no_face_frames += 1;
        if !timestamp_s.is_finite() {
            return;
        }
        let since = *self.no_face_since.get_or_insert(timestamp_s);
        if self.paused.is_none() && timestamp_s - since >= self.safety.no_face_timeout {
            warn!("No face for {:.1}s, pausing", timestamp_s - since);
            self.paused = Some(PauseReason::NoFace);
            self.blink.reset();
        }
    }

    fn feed_calibration(&mut self, sample: Option<&FeatureSample>) {
        let step = self.calibration.step();
        match self.calibration.feed(sample) {
            Ok(Some(profile)) => {
                if let Err(e) = self.update_profile(profile) {
                    warn!("Calibrated profile rejected: {e}");
                }
            }
            Ok(None) => {
                if self.calibration.step() != step {
                    info!("{}", self.calibration.instruction());
                }
            }
            Err(e) => warn!("Calibration failed, keeping previous profile: {e}"),
        }
    }

    /// Stop emitting output; filter state is kept as is
    pub fn pause(&mut self) {
        if self.paused != Some(PauseReason::User) {
            info!("Paused");
        }
        self.paused = Some(PauseReason::User);
        self.blink.reset();
    }

    /// Continue after a pause of either kind
    pub fn resume(&mut self) {
        if self.paused.take().is_some() {
            info!("Resumed");
        }
        self.no_face_since = None;
    }

    /// Begin a calibration run from the active profile
    pub fn start_calibration(&mut self) {
        info!("Starting calibration");
        self.blink.reset();
        self.calibration.start(*self.chain.profile());
    }

    /// Cancel the calibration run; the active profile is untouched
    ///
    /// # Errors
    ///
    /// Returns `Error::CalibrationAborted` when a run was in progress
    pub fn abort_calibration(&mut self) -> Result<()> {
        self.calibration.abort()
    }

    /// Replace the active profile
    ///
    /// The filter chain is rebuilt and its state reset; on error the previous
    /// profile stays active.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the profile is invalid
    pub fn update_profile(&mut self, profile: CalibrationProfile) -> Result<()> {
        let chain = CursorFilterChain::new(profile, self.chain.config().clone(), self.chain.screen())?;
        self.filter_state = chain.new_state();
        self.chain = chain;
        self.blink.set_threshold(profile.ear_threshold, profile.ear_consecutive_frames);
        self.blink.reset();
        info!("Profile updated, EAR threshold {:.3}", profile.ear_threshold);
        Ok(())
    }

    /// Replace the click mapping
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the timings are invalid
    pub fn update_click_mapping(&mut self, mapping: ClickMapping) -> Result<()> {
        mapping.validate()?;
        self.blink.set_mapping(mapping);
        info!("Click mapping updated");
        Ok(())
    }

    /// Switch the target screen without resetting the filters
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for an invalid rectangle
    pub fn set_screen(&mut self, screen: ScreenRect) -> Result<()> {
        self.chain.set_screen(screen, &mut self.filter_state)?;
        info!("Screen set to {}x{}+{}+{}", screen.width, screen.height, screen.x, screen.y);
        Ok(())
    }

    /// Forget filter history so the cursor re-acquires from the next frame
    pub fn recenter(&mut self) {
        self.filter_state.reset();
        info!("Cursor filters reset");
    }

    /// Progress of the calibration run
    #[must_use]
    pub fn calibration_progress(&self) -> CalibrationProgress {
        self.calibration.progress()
    }

    /// Whether a calibration run is in progress
    #[must_use]
    pub const fn is_calibrating(&self) -> bool {
        self.calibration.is_running()
    }

    /// Active profile
    #[must_use]
    pub const fn profile(&self) -> &CalibrationProfile {
        self.chain.profile()
    }

    /// Active click mapping
    #[must_use]
    pub const fn click_mapping(&self) -> &ClickMapping {
        self.blink.mapping()
    }

    /// Target screen
    #[must_use]
    pub const fn screen(&self) -> ScreenRect {
        self.chain.screen()
    }

    /// Whether output is suspended
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused.is_some()
    }

    /// Why output is suspended
    #[must_use]
    pub const fn pause_reason(&self) -> Option<PauseReason> {
        self.paused
    }

    /// Frame counters
    #[must_use]
    pub const fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Filter state, for inspection
    #[must_use]
    pub const fn filter_state(&self) -> &FilterState {
        &self.filter_state
    }
}
