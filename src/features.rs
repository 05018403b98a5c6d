//! Landmark to feature reduction.
//!
//! A [`LandmarkFrame`] from the upstream face mesh detector is reduced to a
//! [`FeatureSample`]: the nose tip position that drives the cursor and the
//! per-eye Eye Aspect Ratio (EAR) that drives blink detection.

use crate::{
    constants::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH, LEFT_EYE, MIN_EYE_WIDTH, NOSE_TIP, RIGHT_EYE},
    Error, Result,
};
use nalgebra::{distance, Point2, Point3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One detector output: landmarks normalized to `[0, 1]` image space
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: Vec<Point3<f64>>,
}

impl LandmarkFrame {
    /// Build a frame from the detector's ordered point list
    #[must_use]
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Build a frame from `(index, point)` pairs; gaps count as absent landmarks
    #[must_use]
    pub fn from_sparse(points: &BTreeMap<usize, [f64; 3]>) -> Self {
        let len = points.keys().next_back().map_or(0, |last| last + 1);
        let mut dense = vec![Point3::new(f64::NAN, f64::NAN, f64::NAN); len];
        for (&index, &[x, y, z]) in points {
            dense[index] = Point3::new(x, y, z);
        }
        Self { points: dense }
    }

    /// Landmark at `index`, if present and finite
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Point3<f64>> {
        self.points
            .get(index)
            .filter(|p| p.x.is_finite() && p.y.is_finite())
    }

    /// Number of points carried by the frame
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the frame carries no points
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Features derived from one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSample {
    /// Normalized nose tip x in `[0, 1]`
    pub nose_x: f64,
    /// Normalized nose tip y in `[0, 1]`
    pub nose_y: f64,
    /// Left eye aspect ratio
    pub ear_left: f64,
    /// Right eye aspect ratio
    pub ear_right: f64,
}

impl FeatureSample {
    /// Both eyes combined by their mean, which tolerates one noisy eye better than the minimum
    #[must_use]
    pub fn ear(&self) -> f64 {
        (self.ear_left + self.ear_right) / 2.0
    }
}

/// Landmark indices used by the extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkScheme {
    /// Nose tip index
    pub nose_tip: usize,
    /// Left eye `p1..p6`
    pub left_eye: [usize; 6],
    /// Right eye `p1..p6`
    pub right_eye: [usize; 6],
}

impl Default for LandmarkScheme {
    fn default() -> Self {
        Self {
            nose_tip: NOSE_TIP,
            left_eye: LEFT_EYE,
            right_eye: RIGHT_EYE,
        }
    }
}

impl LandmarkScheme {
    /// Highest index the scheme reads
    #[must_use]
    pub fn max_index(&self) -> usize {
        self.left_eye
            .iter()
            .chain(self.right_eye.iter())
            .copied()
            .fold(self.nose_tip, usize::max)
    }
}

/// Feature extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Landmark indices
    pub scheme: LandmarkScheme,
    /// Width of the camera frame the landmarks were normalized against
    pub frame_width: f64,
    /// Height of the camera frame the landmarks were normalized against
    pub frame_height: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            scheme: LandmarkScheme::default(),
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

impl FeatureConfig {
    /// Validate frame dimensions
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if either dimension is not positive
    pub fn validate(&self) -> Result<()> {
        if !(self.frame_width.is_finite() && self.frame_width > 0.0)
            || !(self.frame_height.is_finite() && self.frame_height > 0.0)
        {
            return Err(Error::Configuration(
                "Camera frame dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reduces landmark frames to feature samples
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    scheme: LandmarkScheme,
    aspect_ratio: f64,
}

impl FeatureExtractor {
    /// Create an extractor
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for invalid frame dimensions
    pub fn new(config: &FeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scheme: config.scheme.clone(),
            aspect_ratio: config.frame_width / config.frame_height,
        })
    }

    /// Extract the features of one frame
    ///
    /// # Errors
    ///
    /// - `Error::MissingLandmark` if a required index is absent
    /// - `Error::DegenerateGeometry` if an eye has (near) zero width
    pub fn extract(&self, frame: &LandmarkFrame) -> Result<FeatureSample> {
        let nose = Self::landmark(frame, self.scheme.nose_tip)?;
        let ear_left = self.eye_aspect_ratio(frame, &self.scheme.left_eye)?;
        let ear_right = self.eye_aspect_ratio(frame, &self.scheme.right_eye)?;

        Ok(FeatureSample {
            nose_x: nose.x.clamp(0.0, 1.0),
            nose_y: nose.y.clamp(0.0, 1.0),
            ear_left,
            ear_right,
        })
    }

    /// `(|p2-p6| + |p3-p5|) / (2 |p1-p4|)` in the image plane
    ///
    /// # Errors
    ///
    /// See [`FeatureExtractor::extract`]
    pub fn eye_aspect_ratio(&self, frame: &LandmarkFrame, indices: &[usize; 6]) -> Result<f64> {
        let mut pts = [Point2::origin(); 6];
        for (slot, &index) in pts.iter_mut().zip(indices) {
            *slot = self.to_image_plane(Self::landmark(frame, index)?);
        }
        let [p1, p2, p3, p4, p5, p6] = pts;

        let vertical = distance(&p2, &p6) + distance(&p3, &p5);
        let horizontal = distance(&p1, &p4);

        if horizontal < MIN_EYE_WIDTH {
            return Err(Error::DegenerateGeometry(format!(
                "eye width {horizontal:e} at landmarks {}..{}",
                indices[0], indices[3]
            )));
        }

        let ear = vertical / (2.0 * horizontal);
        if ear.is_finite() {
            Ok(ear)
        } else {
            Err(Error::DegenerateGeometry(format!("non-finite EAR {ear}")))
        }
    }

    fn landmark(frame: &LandmarkFrame, index: usize) -> Result<&Point3<f64>> {
        frame.get(index).ok_or(Error::MissingLandmark {
            index,
            available: frame.len(),
        })
    }

    /// Drop z and scale x so distances are proportional to camera pixels
    fn to_image_plane(&self, p: &Point3<f64>) -> Point2<f64> {
        Point2::new(p.x * self.aspect_ratio, p.y)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        let config = FeatureConfig::default();
        Self {
            aspect_ratio: config.frame_width / config.frame_height,
            scheme: config.scheme,
        }
    }
}
