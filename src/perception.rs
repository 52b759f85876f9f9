//! Perception boundary types and the object-detector seam.
//!
//! The engine never runs image recognition itself. It consumes labeled,
//! scored bounding boxes produced by an external perception service and
//! treats that service as a single blocking dependency per decision cycle.

use serde::{Deserialize, Serialize};

/// Normalized bounding box in [0,1] image-fraction coordinates,
/// origin at the top-left corner of the frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Horizontal center of the box in image fractions.
    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    /// Apparent size: the larger of width and height. The larger side is
    /// used because a partially occluded object shrinks on one axis only.
    #[inline]
    pub fn apparent_size(&self) -> f32 {
        self.w.max(self.h)
    }
}

/// One perceived object: label, confidence and box. Produced fresh each
/// decision cycle, never mutated, discarded after the cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    /// Object label, e.g. "red_ball" or "home_base"
    pub label: String,
    /// Confidence score in [0,1]
    pub score: f32,
    /// Normalized bounding box
    pub bbox: BoundingBox,
}

/// One inbound telemetry snapshot from the car.
///
/// Fields are optional at the wire level; the ingestion gate and the engine
/// each check the fields they require and reject snapshots missing them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SensorObservation {
    /// Car identifier
    pub car_id: Option<String>,

    /// Capture timestamp in milliseconds since epoch. Must be strictly
    /// increasing across admitted observations.
    pub timestamp: Option<u64>,

    /// Balls delivered to the home zone so far
    pub ball_count: Option<u32>,

    /// Color of the ball currently being hunted, e.g. "red"
    pub target_color: Option<String>,

    /// Set when the car's proximity sensor reports something ahead
    #[serde(default)]
    pub obstacle: Option<bool>,

    /// Reference to the captured camera frame (storage key)
    #[serde(default)]
    pub image: Option<String>,

    /// Detection results attached by the upstream perception service.
    /// `None` means the perception call did not run or failed; an empty
    /// list means it ran and found nothing.
    #[serde(default)]
    pub detections: Option<Vec<Detection>>,
}

/// Perception failure. Kept separate from "no objects found", which is a
/// normal outcome handled by the search strategy.
#[derive(Debug, thiserror::Error)]
pub enum PerceptionError {
    /// The detection backend could not produce a result
    #[error("object detection unavailable: {0}")]
    Unavailable(String),
}

/// Seam to the external object-detection service.
pub trait ObjectDetector {
    /// Return the detections for this observation, or fail if the
    /// perception backend is unavailable. The decision cannot proceed
    /// without this result.
    fn detect(&mut self, observation: &SensorObservation)
        -> Result<Vec<Detection>, PerceptionError>;
}

/// Detector that reads the detection list already embedded in the
/// observation by the upstream perception service. An absent list is
/// reported as a perception failure, not as "nothing found".
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedDetections;

impl ObjectDetector for EmbeddedDetections {
    fn detect(
        &mut self,
        observation: &SensorObservation,
    ) -> Result<Vec<Detection>, PerceptionError> {
        observation.detections.clone().ok_or_else(|| {
            PerceptionError::Unavailable("no detection result attached to observation".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation_with(detections: Option<Vec<Detection>>) -> SensorObservation {
        SensorObservation {
            car_id: Some("car-1".to_string()),
            timestamp: Some(1),
            ball_count: Some(0),
            target_color: Some("red".to_string()),
            detections,
            ..Default::default()
        }
    }

    #[test]
    fn embedded_detector_returns_attached_list() {
        let det = Detection {
            label: "red_ball".to_string(),
            score: 0.9,
            bbox: BoundingBox::new(0.4, 0.4, 0.2, 0.2),
        };
        let obs = observation_with(Some(vec![det]));
        let result = EmbeddedDetections.detect(&obs).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].label, "red_ball");
    }

    #[test]
    fn embedded_detector_fails_without_list() {
        let obs = observation_with(None);
        assert!(EmbeddedDetections.detect(&obs).is_err());
    }

    #[test]
    fn empty_list_is_not_a_failure() {
        let obs = observation_with(Some(Vec::new()));
        assert!(EmbeddedDetections.detect(&obs).unwrap().is_empty());
    }

    #[test]
    fn apparent_size_takes_larger_side() {
        let bbox = BoundingBox::new(0.1, 0.1, 0.3, 0.1);
        assert_eq!(bbox.apparent_size(), 0.3);
    }
}
