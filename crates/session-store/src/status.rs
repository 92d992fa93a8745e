//! Renderer status documents.

use serde::{Deserialize, Serialize};

/// Latest progress report written by a renderer.
///
/// Step-based renderers report the frame they are on within the current
/// step; the project-XML renderer reports a single fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawStatus {
    Stepped {
        step: u32,
        frame: i64,
        length: i64,
        elapsed: f64,
    },
    Fractional {
        fraction: f64,
        elapsed: f64,
    },
}

impl RawStatus {
    /// Seconds the renderer has been running, as it reports.
    pub fn elapsed(&self) -> f64 {
        match self {
            RawStatus::Stepped { elapsed, .. } | RawStatus::Fractional { elapsed, .. } => *elapsed,
        }
    }

    pub fn step(&self) -> Option<u32> {
        match self {
            RawStatus::Stepped { step, .. } => Some(*step),
            RawStatus::Fractional { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_stepped_status() {
        let status: RawStatus =
            serde_json::from_str(r#"{"step":2,"frame":40,"length":200,"elapsed":3.5}"#).unwrap();
        assert_eq!(
            status,
            RawStatus::Stepped {
                step: 2,
                frame: 40,
                length: 200,
                elapsed: 3.5
            }
        );
        assert_eq!(status.step(), Some(2));
    }

    #[test]
    fn test_parses_fractional_status() {
        let status: RawStatus = serde_json::from_str(r#"{"fraction":0.25,"elapsed":1.0}"#).unwrap();
        assert_eq!(status.step(), None);
        assert!((status.elapsed() - 1.0).abs() < 1e-9);
    }
}
