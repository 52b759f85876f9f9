//! Configuration loading for LakshyaNav

use serde::Deserialize;
use std::path::Path;

use crate::command::Mode;
use crate::error::{LakshyaError, Result};
use crate::search::SearchConfig;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LakshyaConfig {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub ball: BallConfig,
    #[serde(default)]
    pub home: HomeConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Run-level settings
#[derive(Clone, Debug, Deserialize)]
pub struct GameConfig {
    /// Balls to deliver before the run ends
    #[serde(default = "default_balls_required")]
    pub balls_required: u32,

    /// Operating mode at startup
    #[serde(default = "default_mode")]
    pub mode: Mode,

    /// Seed for the search relocation sampler (0 = entropy)
    #[serde(default)]
    pub random_seed: u64,
}

/// Camera model parameters
#[derive(Clone, Debug, Deserialize)]
pub struct CameraConfig {
    /// Horizontal field of view (degrees)
    #[serde(default = "default_horizontal_fov_deg")]
    pub horizontal_fov_deg: f32,

    /// Empirical multiplier applied to the FOV projection
    #[serde(default = "default_calibration_multiplier")]
    pub calibration_multiplier: f32,

    /// Lens focal length (mm)
    #[serde(default = "default_focal_length_mm")]
    pub focal_length_mm: f32,

    /// Physical sensor height (mm)
    #[serde(default = "default_sensor_height_mm")]
    pub sensor_height_mm: f32,

    /// Distance from the lens to the gripper front (mm), subtracted from
    /// every pinhole estimate
    #[serde(default = "default_min_camera_distance_mm")]
    pub min_camera_distance_mm: f32,
}

/// Ball capture parameters
#[derive(Clone, Debug, Deserialize)]
pub struct BallConfig {
    /// Real ball diameter (mm)
    #[serde(default = "default_ball_real_size_mm")]
    pub real_size_mm: f32,

    /// Suffix composed with the target color into a detection label
    #[serde(default = "default_label_suffix")]
    pub label_suffix: String,

    /// Maximum off-axis angle at which the gripper may close (degrees)
    #[serde(default = "default_capture_angle_deg")]
    pub capture_angle_deg: i32,

    /// Maximum distance at which the gripper may close (mm)
    #[serde(default = "default_capture_distance_mm")]
    pub capture_distance_mm: f32,

    /// Distance below which the approach slows to creep speed (mm)
    #[serde(default = "default_slow_zone_mm")]
    pub slow_zone_mm: f32,

    /// Extra distance driven past the estimate in the slow zone (mm)
    #[serde(default = "default_overshoot_mm")]
    pub overshoot_mm: f32,

    /// Reverse drive after closing the gripper, to verify retention (mm)
    #[serde(default = "default_pullback_mm")]
    pub pullback_mm: f32,

    /// Detections below this score in the frame-top band are dropped
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Frame-top band (fraction of image height) where balls cannot
    /// physically appear; low-score detections there are false positives
    #[serde(default = "default_top_exclusion_band")]
    pub top_exclusion_band: f32,

    /// Speed for the post-capture pull-back (percent of max)
    #[serde(default = "default_capture_speed_percent")]
    pub capture_speed_percent: u8,

    /// Creep speed inside the slow zone (percent of max)
    #[serde(default = "default_approach_speed_percent")]
    pub approach_speed_percent: u8,
}

/// Home-zone delivery parameters
#[derive(Clone, Debug, Deserialize)]
pub struct HomeConfig {
    /// Detection label of the home-zone marker
    #[serde(default = "default_home_label")]
    pub label: String,

    /// Real marker size (mm)
    #[serde(default = "default_home_real_size_mm")]
    pub real_size_mm: f32,

    /// Distance at which the ball is released (mm)
    #[serde(default = "default_release_distance_mm")]
    pub release_distance_mm: f32,

    /// First back-away leg after releasing (mm)
    #[serde(default = "default_backaway_first_mm")]
    pub backaway_first_mm: f32,

    /// Speed for the first back-away leg (percent of max)
    #[serde(default = "default_backaway_first_speed")]
    pub backaway_first_speed: u8,

    /// Second back-away leg (mm)
    #[serde(default = "default_backaway_second_mm")]
    pub backaway_second_mm: f32,

    /// Speed for the second back-away leg (percent of max)
    #[serde(default = "default_backaway_second_speed")]
    pub backaway_second_speed: u8,

    /// Turn after departing the zone (degrees, positive = right)
    #[serde(default = "default_depart_turn_deg")]
    pub depart_turn_deg: i32,
}

/// Network settings for the observation/command session
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// TCP port number
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Observation admission settings
#[derive(Clone, Debug, Deserialize)]
pub struct IngestConfig {
    /// Observations older than this are rejected (seconds)
    #[serde(default = "default_freshness_window_s")]
    pub freshness_window_s: u64,
}

// Default value functions
fn default_balls_required() -> u32 {
    3
}
fn default_mode() -> Mode {
    Mode::Automatic
}
fn default_horizontal_fov_deg() -> f32 {
    62.2
}
fn default_calibration_multiplier() -> f32 {
    0.75
}
fn default_focal_length_mm() -> f32 {
    3.04
}
fn default_sensor_height_mm() -> f32 {
    2.76
}
fn default_min_camera_distance_mm() -> f32 {
    110.0
}
fn default_ball_real_size_mm() -> f32 {
    40.0
}
fn default_label_suffix() -> String {
    "_ball".to_string()
}
fn default_capture_angle_deg() -> i32 {
    10
}
fn default_capture_distance_mm() -> f32 {
    70.0
}
fn default_slow_zone_mm() -> f32 {
    250.0
}
fn default_overshoot_mm() -> f32 {
    30.0
}
fn default_pullback_mm() -> f32 {
    250.0
}
fn default_min_score() -> f32 {
    0.5
}
fn default_top_exclusion_band() -> f32 {
    0.2
}
fn default_capture_speed_percent() -> u8 {
    50
}
fn default_approach_speed_percent() -> u8 {
    5
}
fn default_home_label() -> String {
    "home_base".to_string()
}
fn default_home_real_size_mm() -> f32 {
    300.0
}
fn default_release_distance_mm() -> f32 {
    850.0
}
fn default_backaway_first_mm() -> f32 {
    100.0
}
fn default_backaway_first_speed() -> u8 {
    50
}
fn default_backaway_second_mm() -> f32 {
    1000.0
}
fn default_backaway_second_speed() -> u8 {
    100
}
fn default_depart_turn_deg() -> i32 {
    90
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    7878
}
fn default_freshness_window_s() -> u64 {
    60
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            balls_required: default_balls_required(),
            mode: default_mode(),
            random_seed: 0,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            horizontal_fov_deg: default_horizontal_fov_deg(),
            calibration_multiplier: default_calibration_multiplier(),
            focal_length_mm: default_focal_length_mm(),
            sensor_height_mm: default_sensor_height_mm(),
            min_camera_distance_mm: default_min_camera_distance_mm(),
        }
    }
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            real_size_mm: default_ball_real_size_mm(),
            label_suffix: default_label_suffix(),
            capture_angle_deg: default_capture_angle_deg(),
            capture_distance_mm: default_capture_distance_mm(),
            slow_zone_mm: default_slow_zone_mm(),
            overshoot_mm: default_overshoot_mm(),
            pullback_mm: default_pullback_mm(),
            min_score: default_min_score(),
            top_exclusion_band: default_top_exclusion_band(),
            capture_speed_percent: default_capture_speed_percent(),
            approach_speed_percent: default_approach_speed_percent(),
        }
    }
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            label: default_home_label(),
            real_size_mm: default_home_real_size_mm(),
            release_distance_mm: default_release_distance_mm(),
            backaway_first_mm: default_backaway_first_mm(),
            backaway_first_speed: default_backaway_first_speed(),
            backaway_second_mm: default_backaway_second_mm(),
            backaway_second_speed: default_backaway_second_speed(),
            depart_turn_deg: default_depart_turn_deg(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            freshness_window_s: default_freshness_window_s(),
        }
    }
}

impl LakshyaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LakshyaError::Config(format!("Failed to read config file: {}", e)))?;
        let config: LakshyaConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the full bind address string
    pub fn address(&self) -> String {
        format!("{}:{}", self.connection.bind_address, self.connection.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = LakshyaConfig::default();
        assert_eq!(config.game.balls_required, 3);
        assert_eq!(config.game.mode, Mode::Automatic);
        assert_eq!(config.ball.capture_distance_mm, 70.0);
        assert_eq!(config.home.release_distance_mm, 850.0);
        assert_eq!(config.search.sweep_limit, 5);
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config: LakshyaConfig = toml::from_str(
            r#"
            [game]
            balls_required = 5
            mode = "debug"

            [search]
            ball_turn_deg = 45
            "#,
        )
        .unwrap();

        assert_eq!(config.game.balls_required, 5);
        assert_eq!(config.game.mode, Mode::Debug);
        assert_eq!(config.search.ball_turn_deg, 45);
        // Untouched sections keep their defaults
        assert_eq!(config.search.sweep_limit, 5);
        assert_eq!(config.camera.calibration_multiplier, 0.75);
    }
}
