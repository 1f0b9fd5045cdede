//! Drag endpoint pair for the automatic drag loop.
//!
//! Both endpoints start unset.  Each capture overwrites one of them; nothing
//! ever clears them again.

use serde::{Deserialize, Serialize};

use super::geometry::Point;

/// Which endpoint a capture request fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapturePurpose {
    #[serde(rename = "SRC")]
    Source,
    #[serde(rename = "DES")]
    Destination,
}

impl std::fmt::Display for CapturePurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Destination => "destination",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DragEndpoints {
    pub source: Option<Point>,
    pub destination: Option<Point>,
}

impl DragEndpoints {
    /// Stores `point` as the endpoint named by `purpose`.
    pub fn set(&mut self, purpose: CapturePurpose, point: Point) {
        match purpose {
            CapturePurpose::Source => self.source = Some(point),
            CapturePurpose::Destination => self.destination = Some(point),
        }
    }

    /// Returns `(source, destination)` when both are set.
    pub fn complete(&self) -> Option<(Point, Point)> {
        Some((self.source?, self.destination?))
    }
}
