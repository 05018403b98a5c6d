//! Recorded landmark traces.
//!
//! A trace is a YAML (or JSON) list of frames:
//!
//! ```yaml
//! - t: 0.0
//!   landmarks: [[0.5, 0.5, 0.0], [0.51, 0.49, 0.0]]   # dense, by index
//! - t: 0.033
//!   landmarks: {1: [0.5, 0.5, 0.0], 33: [0.4, 0.4, 0.0]}   # sparse
//! - t: 0.066
//!   landmarks: null   # no face
//! ```

use crate::{features::LandmarkFrame, frame_queue::FrameInput, Error, Result};
use nalgebra::Point3;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TraceLandmarks {
    Dense(Vec<[f64; 3]>),
    Sparse(BTreeMap<usize, [f64; 3]>),
}

#[derive(Debug, Deserialize)]
struct TraceRecord {
    t: f64,
    #[serde(default)]
    landmarks: Option<TraceLandmarks>,
}

impl From<TraceRecord> for FrameInput {
    fn from(record: TraceRecord) -> Self {
        let frame = record.landmarks.map(|landmarks| match landmarks {
            TraceLandmarks::Dense(points) => {
                LandmarkFrame::new(points.into_iter().map(|[x, y, z]| Point3::new(x, y, z)).collect())
            }
            TraceLandmarks::Sparse(points) => LandmarkFrame::from_sparse(&points),
        });
        Self {
            frame,
            timestamp_s: record.t,
        }
    }
}

/// Parse a trace from YAML text
///
/// # Errors
///
/// Returns `Error::Serialization` for malformed input and
/// `Error::InvalidInput` for timestamps that are not finite or go backwards
pub fn parse_trace(content: &str) -> Result<Vec<FrameInput>> {
    let records: Vec<TraceRecord> =
        serde_yaml::from_str(content).map_err(|e| Error::Serialization(format!("Failed to parse trace: {e}")))?;

    let mut last = f64::NEG_INFINITY;
    for (i, record) in records.iter().enumerate() {
        if !record.t.is_finite() || record.t < last {
            return Err(Error::InvalidInput(format!(
                "Trace frame {i} has timestamp {} after {last}",
                record.t
            )));
        }
        last = record.t;
    }

    Ok(records.into_iter().map(FrameInput::from).collect())
}

/// Load a trace file
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read, otherwise as [`parse_trace`]
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Vec<FrameInput>> {
    let content = std::fs::read_to_string(path)?;
    parse_trace(&content)
}
