//! Constants used throughout the library

/// Nose tip index in the MediaPipe Face Mesh scheme
pub const NOSE_TIP: usize = 1;

/// Left eye EAR points `p1..p6` (outer corner, two upper lids, inner corner, two lower lids)
pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// Right eye EAR points `p1..p6`
pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// Default camera frame size the landmarks were normalized against
pub const DEFAULT_FRAME_WIDTH: f64 = 640.0;
pub const DEFAULT_FRAME_HEIGHT: f64 = 480.0;

/// Default frames per second assumption
pub const DEFAULT_FPS: f64 = 30.0;

/// Default screen size when none is supplied
pub const DEFAULT_SCREEN_WIDTH: u32 = 1920;
pub const DEFAULT_SCREEN_HEIGHT: u32 = 1080;

/// Profile defaults
pub const DEFAULT_EAR_THRESHOLD: f64 = 0.21;
pub const DEFAULT_EAR_CONSECUTIVE_FRAMES: u32 = 2;
pub const DEFAULT_DEADZONE_PX: f64 = 8.0;
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.25;

/// Click mapping defaults, in seconds
pub const DEFAULT_DOUBLE_BLINK_WINDOW: f64 = 0.5;
pub const DEFAULT_LONG_BLINK_THRESHOLD: f64 = 0.3;
pub const DEFAULT_CLICK_COOLDOWN: f64 = 0.5;

/// Kalman defaults (normalized units)
pub const DEFAULT_KALMAN_PROCESS_NOISE: f64 = 1.0;
pub const DEFAULT_KALMAN_MEASUREMENT_NOISE: f64 = 1e-5;
pub const KALMAN_INITIAL_COVARIANCE: f64 = 1.0;

/// Bounds on the time step between frames, in seconds
pub const DEFAULT_MIN_DT: f64 = 1.0 / 240.0;
pub const DEFAULT_MAX_DT: f64 = 0.1;

/// Adaptive smoothing defaults (speeds in normalized units per second)
pub const DEFAULT_STILL_SPEED: f64 = 0.05;
pub const DEFAULT_FAST_SPEED: f64 = 0.5;
pub const DEFAULT_STILL_FACTOR: f64 = 0.5;
pub const DEFAULT_MAX_ALPHA: f64 = 0.8;

/// Outlier gate defaults
pub const DEFAULT_OUTLIER_FACTOR: f64 = 3.0;
pub const DEFAULT_OUTLIER_WINDOW: usize = 10;
pub const DEFAULT_OUTLIER_MIN_BOUND: f64 = 0.03;
pub const DEFAULT_OUTLIER_MIN_HISTORY: usize = 3;
pub const DEFAULT_MAX_CONSECUTIVE_REJECTS: u32 = 5;

/// Calibration defaults
pub const DEFAULT_CAPTURE_FRAMES: usize = 30;
pub const DEFAULT_SETTLE_FRAMES: usize = 10;
pub const DEFAULT_BLINK_CAPTURE_FRAMES: usize = 90;
pub const DEFAULT_TRIM_FRACTION: f64 = 0.1;
pub const EAR_THRESHOLD_MIN: f64 = 0.1;
pub const EAR_THRESHOLD_MAX: f64 = 0.35;
pub const MIN_EAR_SEPARATION: f64 = 0.05;

/// Eye widths below this (in pixel-proportional units) are degenerate
pub const MIN_EYE_WIDTH: f64 = 1e-6;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;

/// Seconds without a face before the pipeline pauses itself
pub const DEFAULT_NO_FACE_TIMEOUT: f64 = 5.0;

/// Frames buffered between capture and processing
pub const DEFAULT_QUEUE_CAPACITY: usize = 2;
