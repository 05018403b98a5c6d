//! Hands-free pointer control from facial landmarks.
//!
//! This library turns a stream of per-frame facial landmarks into a stable
//! screen cursor position and discrete click events:
//! - the nose tip position drives the cursor through an outlier gate, a
//!   Kalman filter, speed-adaptive smoothing, a pixel deadzone and a
//!   calibrated affine mapping onto the screen
//! - eye closure, measured as the Eye Aspect Ratio (EAR), drives a blink
//!   classifier producing left, double and right clicks
//!
//! Camera capture, landmark detection and OS cursor injection are left to the
//! caller: the [`pipeline::Pipeline`] consumes landmark frames and returns
//! positions and clicks.
//!
//! # Examples
//!
//! ```no_run
//! use head_pointer::{config::Config, features::LandmarkFrame, pipeline::Pipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pipeline = Pipeline::new(&Config::default())?;
//!
//! # let detections: Vec<(Option<LandmarkFrame>, f64)> = Vec::new();
//! for (frame, timestamp_s) in detections {
//!     if let Some(output) = pipeline.process_frame(frame.as_ref(), timestamp_s) {
//!         println!("cursor at {}", output.position);
//!         if let Some(click) = output.click {
//!             println!("{:?} click", click.kind);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Calibration
//!
//! ```no_run
//! use head_pointer::{config::Config, pipeline::Pipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pipeline = Pipeline::new(&Config::default())?;
//! pipeline.start_calibration();
//!
//! // Keep feeding frames; show the instruction to the user meanwhile
//! let progress = pipeline.calibration_progress();
//! println!("{} ({}/{})", progress.instruction, progress.collected, progress.needed);
//!
//! // Once finished, persist the profile
//! if !pipeline.is_calibrating() {
//!     pipeline.profile().to_file("calibration.yaml")?;
//! }
//! # Ok(())
//! # }
//! ```

/// Landmark to feature reduction (nose position, eye aspect ratio)
pub mod features;

/// Guided calibration state machine
pub mod calibration;

/// Cursor filter chain
pub mod filters;

/// Blink debouncing and click classification
pub mod blink;

/// Normalized position to screen pixel mapping
pub mod mapping;

/// Calibration profile and click mapping records
pub mod profile;

/// Per-frame orchestration and control surface
pub mod pipeline;

/// Bounded drop-oldest frame hand-off between threads
pub mod frame_queue;

/// Recorded landmark traces
pub mod trace;

/// Numeric helpers
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
