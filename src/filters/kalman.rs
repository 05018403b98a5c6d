use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};

use crate::constants::KALMAN_INITIAL_COVARIANCE;

/// Constant-velocity Kalman filter over the normalized nose position
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    // State: [x, y, vx, vy]
    state: Vector4<f64>,
    // State covariance
    covariance: Matrix4<f64>,
    // Acceleration variance driving the process noise
    process_noise: f64,
    // Measurement noise
    measurement_noise: Matrix2<f64>,
    // Measurement matrix
    measurement: Matrix2x4<f64>,
    initialized: bool,
}

impl KalmanFilter {
    /// Create a filter from the process (acceleration) and measurement variances
    #[must_use]
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        // Measurement matrix (we only measure position)
        let measurement = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        );

        Self {
            state: Vector4::zeros(),
            covariance: Matrix4::identity() * KALMAN_INITIAL_COVARIANCE,
            process_noise,
            measurement_noise: Matrix2::identity() * measurement_noise,
            measurement,
            initialized: false,
        }
    }

    fn transition(dt: f64) -> Matrix4<f64> {
        Matrix4::new(
            1.0, 0.0, dt, 0.0,
            0.0, 1.0, 0.0, dt,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn process_covariance(&self, dt: f64) -> Matrix4<f64> {
        let q = self.process_noise;
        Matrix4::new(
            q * dt.powi(4) / 4.0, 0.0, q * dt.powi(3) / 2.0, 0.0,
            0.0, q * dt.powi(4) / 4.0, 0.0, q * dt.powi(3) / 2.0,
            q * dt.powi(3) / 2.0, 0.0, q * dt.powi(2), 0.0,
            0.0, q * dt.powi(3) / 2.0, 0.0, q * dt.powi(2),
        )
    }

    /// Advance the state by `dt` seconds without a measurement
    pub fn predict(&mut self, dt: f64) {
        if !self.initialized {
            return;
        }
        let transition = Self::transition(dt);
        self.state = transition * self.state;
        self.covariance = transition * self.covariance * transition.transpose() + self.process_covariance(dt);
    }

    /// Fold a position measurement into the state
    ///
    /// Returns `false` when the innovation covariance is singular and the
    /// measurement was skipped.
    pub fn update(&mut self, x: f64, y: f64) -> bool {
        if !self.initialized {
            self.initialize(x, y);
            return true;
        }

        // Innovation
        let innovation = Vector2::new(x, y) - self.measurement * self.state;

        // Innovation covariance
        let innovation_cov = self.measurement * self.covariance * self.measurement.transpose() + self.measurement_noise;

        let Some(inverse) = innovation_cov.try_inverse() else {
            log::debug!("Singular innovation covariance, skipping Kalman update");
            return false;
        };

        // Kalman gain
        let gain = self.covariance * self.measurement.transpose() * inverse;

        // Update state
        self.state += gain * innovation;

        // Update covariance
        let identity = Matrix4::identity();
        self.covariance = (identity - gain * self.measurement) * self.covariance;
        true
    }

    /// Predict by `dt` then update with the measurement; returns the filtered position
    pub fn step(&mut self, x: f64, y: f64, dt: f64) -> (f64, f64) {
        self.predict(dt);
        self.update(x, y);
        self.position()
    }

    fn initialize(&mut self, x: f64, y: f64) {
        self.state = Vector4::new(x, y, 0.0, 0.0);
        let r = self.measurement_noise[(0, 0)];
        self.covariance = Matrix4::from_diagonal(&Vector4::new(
            r,
            r,
            KALMAN_INITIAL_COVARIANCE,
            KALMAN_INITIAL_COVARIANCE,
        ));
        self.initialized = true;
    }

    /// Estimated position
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        (self.state[0], self.state[1])
    }

    /// Estimated velocity in normalized units per second
    #[must_use]
    pub fn velocity(&self) -> (f64, f64) {
        (self.state[2], self.state[3])
    }

    /// Whether a measurement has been seen since creation or the last reset
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.state = Vector4::zeros();
        self.covariance = Matrix4::identity() * KALMAN_INITIAL_COVARIANCE;
        self.initialized = false;
    }
}
