use crate::mapping::ScreenPoint;

/// Holds the cursor still until the target moves at least `radius` pixels
#[derive(Debug, Clone, Default)]
pub struct Deadzone {
    anchor: Option<ScreenPoint>,
}

impl Deadzone {
    /// Create a deadzone with no anchor
    #[must_use]
    pub const fn new() -> Self {
        Self { anchor: None }
    }

    /// Position to emit for `candidate`
    pub fn apply(&mut self, candidate: ScreenPoint, radius_px: f64) -> ScreenPoint {
        match self.anchor {
            Some(anchor) if anchor.distance_to(&candidate) < radius_px => anchor,
            _ => {
                self.anchor = Some(candidate);
                candidate
            }
        }
    }

    /// Last emitted position
    #[must_use]
    pub const fn anchor(&self) -> Option<ScreenPoint> {
        self.anchor
    }

    /// Drop the anchor so the next candidate is emitted as-is
    pub fn reset(&mut self) {
        self.anchor = None;
    }
}
