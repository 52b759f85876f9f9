//! Camera-model geometry: bounding box to approach angle and distance.
//!
//! Pure functions, total over valid boxes. The distance estimate applies an
//! empirical near-field correction on top of the pinhole model; the band
//! thresholds are measured values for the reference camera/object pairing.

use crate::perception::BoundingBox;

/// Below this raw estimate (mm) the pinhole model is unusable; the target
/// is effectively at the gripper.
const NEAR_BAND_LIMIT_MM: f32 = 95.0;

/// Distance reported for everything inside the near band (mm).
const NEAR_BAND_DISTANCE_MM: f32 = 20.0;

/// Upper edge (mm) of the mid band where the model overestimates.
const MID_BAND_LIMIT_MM: f32 = 325.0;

/// Fixed overestimate subtracted inside the mid band (mm).
const MID_BAND_OFFSET_MM: f32 = 35.0;

/// Horizontal angle from the camera axis to the box center, in whole
/// degrees. Positive = turn right, negative = turn left, 0 when centered.
pub fn angle_to_target(bbox: &BoundingBox, horizontal_fov_deg: f32, calibration: f32) -> i32 {
    let offset = bbox.center_x() - 0.5;
    (offset * horizontal_fov_deg * calibration).round() as i32
}

/// Estimated distance (mm) to an object of known real size.
///
/// Pinhole relation on the apparent size, minus the camera-to-gripper
/// offset, then corrected in two bands: near estimates collapse to a fixed
/// close-range value, mid-range estimates get a fixed offset subtracted,
/// far estimates pass through unmodified.
pub fn distance_to_target(
    bbox: &BoundingBox,
    real_size_mm: f32,
    focal_length_mm: f32,
    sensor_height_mm: f32,
    min_camera_distance_mm: f32,
) -> f32 {
    let relative_size = bbox.apparent_size();
    let raw = focal_length_mm * real_size_mm / (relative_size * sensor_height_mm)
        - min_camera_distance_mm;

    if raw < NEAR_BAND_LIMIT_MM {
        NEAR_BAND_DISTANCE_MM
    } else if raw < MID_BAND_LIMIT_MM {
        raw - MID_BAND_OFFSET_MM
    } else {
        raw
    }
}
