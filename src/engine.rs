//! Navigation decision engine.
//!
//! One sensor observation in, one drive command out. The engine keeps no
//! session state of its own: the caller's command history is its only
//! cross-cycle memory, queried by goal tag from the newest entry backward.
//! Each cycle derives an explicit objective, finds the best matching
//! detection (if any) and composes geometry, search and capture/release
//! logic into a single bounded command.

use tracing::debug;

use crate::command::{Action, CommandHistory, DriveCommand, Goal, Mode};
use crate::config::{BallConfig, CameraConfig, HomeConfig};
use crate::error::{LakshyaError, Result};
use crate::geometry;
use crate::perception::{Detection, ObjectDetector, SensorObservation};
use crate::search::{SearchStrategy, SearchTarget};

/// Engine tuning, assembled from the config file sections.
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    /// Balls to deliver before the run ends
    pub balls_required: u32,
    /// Camera model
    pub camera: CameraConfig,
    /// Ball capture parameters
    pub ball: BallConfig,
    /// Home-zone delivery parameters
    pub home: HomeConfig,
}

/// Car state extracted from an observation after field validation.
struct CarState<'a> {
    timestamp: u64,
    ball_count: u32,
    target_color: &'a str,
    obstacle: bool,
}

/// The objective selected for one decision cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Objective {
    /// Hunt and capture the current target ball
    CollectBall,
    /// Carry the captured ball to the home zone
    ReturnToBase,
    /// All required balls delivered
    Complete,
}

/// The navigation decision engine.
///
/// Call [`decide`](Self::decide) once per admitted observation. Decisions
/// are synchronous and non-preemptible; the only blocking dependency is
/// the object detector.
pub struct NavigationEngine<D> {
    config: EngineConfig,
    mode: Mode,
    detector: D,
    search: SearchStrategy,
}

impl<D: ObjectDetector> NavigationEngine<D> {
    pub fn new(config: EngineConfig, mode: Mode, detector: D, search: SearchStrategy) -> Self {
        Self {
            config,
            mode,
            detector,
            search,
        }
    }

    /// Produce the drive command for one observation.
    ///
    /// Fails with [`LakshyaError::MalformedObservation`] if a required
    /// car-state field is absent and with
    /// [`LakshyaError::PerceptionUnavailable`] if the detector cannot
    /// produce a result; no command is emitted in either case. A target
    /// that is simply not visible is not an error, it routes into the
    /// search strategy.
    pub fn decide(
        &mut self,
        observation: &SensorObservation,
        history: &CommandHistory,
    ) -> Result<DriveCommand> {
        let state = validate(observation)?;
        let objective = self.select_objective(&state, history);
        debug!(
            ?objective,
            ball_count = state.ball_count,
            target_color = state.target_color,
            "decision cycle"
        );

        let mut command = match objective {
            Objective::Complete => DriveCommand::new(self.mode, Goal::GameEnd),
            Objective::CollectBall => {
                let detections = self.detector.detect(observation)?;
                self.collect_ball(&state, &detections, history)
            }
            Objective::ReturnToBase => {
                let detections = self.detector.detect(observation)?;
                self.return_to_base(&state, &detections, history)
            }
        };

        command.correlation_id = state.timestamp;
        if command.goal != Goal::GameEnd {
            command.push(Action::RequestSensor);
        }
        Ok(command)
    }

    /// Top-level objective, first match wins. Home-seeking is a commitment:
    /// once the newest history entry carries a return goal, the engine
    /// stays on the return objective until the delivery command (tagged
    /// [`Goal::ReleaseBall`]) breaks the streak.
    fn select_objective(&self, state: &CarState, history: &CommandHistory) -> Objective {
        let returning = history.count_consecutive(Goal::GoToBase)
            + history.count_consecutive(Goal::SeekHomeTurn)
            + history.count_consecutive(Goal::SeekHomeMove);

        if returning > 0 {
            Objective::ReturnToBase
        } else if state.ball_count < self.config.balls_required {
            Objective::CollectBall
        } else {
            Objective::Complete
        }
    }

    fn collect_ball(
        &mut self,
        state: &CarState,
        detections: &[Detection],
        history: &CommandHistory,
    ) -> DriveCommand {
        let wanted = format!("{}{}", state.target_color, self.config.ball.label_suffix);
        let Some(detection) = self.select_detection(detections, &wanted) else {
            debug!(label = %wanted, "no candidate, searching");
            return self.fall_back_to_search(SearchTarget::Ball, history);
        };

        let camera = &self.config.camera;
        let ball = &self.config.ball;
        let angle = geometry::angle_to_target(
            &detection.bbox,
            camera.horizontal_fov_deg,
            camera.calibration_multiplier,
        );
        let distance = geometry::distance_to_target(
            &detection.bbox,
            ball.real_size_mm,
            camera.focal_length_mm,
            camera.sensor_height_mm,
            camera.min_camera_distance_mm,
        );
        debug!(angle, distance, score = detection.score, "ball candidate");

        if angle.abs() <= ball.capture_angle_deg && distance <= ball.capture_distance_mm {
            if history.last_goal() == Some(Goal::CheckGrip) {
                // The pull-back confirmed the ball is retained; hand over
                // to the return objective without moving.
                DriveCommand::new(Mode::Automatic, Goal::GoToBase)
            } else {
                let mut command = DriveCommand::new(Mode::Automatic, Goal::CheckGrip);
                command.push(Action::GripperClose);
                command.push(Action::SetSpeed {
                    percent: ball.capture_speed_percent,
                });
                command.push(Action::Move {
                    distance_mm: -(ball.pullback_mm.round() as i32),
                });
                command
            }
        } else if distance < ball.slow_zone_mm {
            let mut command = DriveCommand::new(Mode::Automatic, Goal::GoToBall);
            command.push(Action::Turn { angle_deg: angle });
            command.push(Action::GripperOpen);
            command.push(Action::SetSpeed {
                percent: ball.approach_speed_percent,
            });
            command.push(Action::Move {
                distance_mm: (distance + ball.overshoot_mm).round() as i32,
            });
            command
        } else if state.obstacle {
            debug!("obstacle ahead, abandoning approach");
            self.fall_back_to_search(SearchTarget::Ball, history)
        } else {
            // Partial advance: leave the slow zone's worth of distance for
            // re-evaluation on the next cycle.
            let mut command = DriveCommand::new(Mode::Automatic, Goal::GoToBall);
            command.push(Action::SetSpeed { percent: 100 });
            command.push(Action::Turn { angle_deg: angle });
            command.push(Action::Move {
                distance_mm: (distance - ball.slow_zone_mm / 2.0).round() as i32,
            });
            command
        }
    }

    fn return_to_base(
        &mut self,
        state: &CarState,
        detections: &[Detection],
        history: &CommandHistory,
    ) -> DriveCommand {
        let home = &self.config.home;
        let Some(detection) = self.select_detection(detections, &home.label) else {
            debug!(label = %home.label, "home zone not visible, searching");
            return self.fall_back_to_search(SearchTarget::Home, history);
        };

        let camera = &self.config.camera;
        let angle = geometry::angle_to_target(
            &detection.bbox,
            camera.horizontal_fov_deg,
            camera.calibration_multiplier,
        );
        let distance = geometry::distance_to_target(
            &detection.bbox,
            home.real_size_mm,
            camera.focal_length_mm,
            camera.sensor_height_mm,
            camera.min_camera_distance_mm,
        );
        debug!(angle, distance, "home zone candidate");

        if angle.abs() <= self.config.ball.capture_angle_deg
            && distance <= home.release_distance_mm
        {
            // Drop the ball, back out of the zone and re-close the gripper
            // so no stray balls are scooped while traveling.
            let mut command = DriveCommand::new(Mode::Automatic, Goal::ReleaseBall);
            command.add_ball_count(1);
            command.push(Action::GripperOpen);
            command.push(Action::SetSpeed {
                percent: home.backaway_first_speed,
            });
            command.push(Action::Move {
                distance_mm: -(home.backaway_first_mm.round() as i32),
            });
            command.push(Action::SetSpeed {
                percent: home.backaway_second_speed,
            });
            command.push(Action::Move {
                distance_mm: -(home.backaway_second_mm.round() as i32),
            });
            command.push(Action::Turn {
                angle_deg: home.depart_turn_deg,
            });
            command.push(Action::GripperClose);
            command
        } else if state.obstacle {
            debug!("obstacle ahead, abandoning approach");
            self.fall_back_to_search(SearchTarget::Home, history)
        } else {
            let mut command = DriveCommand::new(Mode::Automatic, Goal::GoToBase);
            command.push(Action::SetSpeed { percent: 100 });
            command.push(Action::Turn { angle_deg: angle });
            command.push(Action::Move {
                distance_mm: (distance - home.release_distance_mm / 2.0).round() as i32,
            });
            command
        }
    }

    /// Shared fallback edge: both objectives route here when the target is
    /// not visible or an obstacle blocks the approach.
    fn fall_back_to_search(
        &mut self,
        target: SearchTarget,
        history: &CommandHistory,
    ) -> DriveCommand {
        let seek_goal = match target {
            SearchTarget::Ball => Goal::SeekBallTurn,
            SearchTarget::Home => Goal::SeekHomeTurn,
        };
        self.search
            .next_command(target, history.count_consecutive(seek_goal))
    }

    /// Best matching detection for a label: drop frame-top low-score ball
    /// detections as false positives, then maximize apparent size weighted
    /// by confidence. Strict comparison keeps the earliest on ties.
    fn select_detection<'a>(
        &self,
        detections: &'a [Detection],
        wanted: &str,
    ) -> Option<&'a Detection> {
        let ball = &self.config.ball;
        let mut best: Option<(&Detection, f32)> = None;

        for detection in detections {
            if detection.label.ends_with(&ball.label_suffix)
                && detection.score < ball.min_score
                && detection.bbox.y < ball.top_exclusion_band
            {
                debug!(
                    label = %detection.label,
                    score = detection.score,
                    y = detection.bbox.y,
                    "dropping frame-top false positive"
                );
                continue;
            }
            if detection.label != wanted {
                continue;
            }

            let weight = detection.bbox.apparent_size() * detection.score;
            if best.map_or(true, |(_, best_weight)| weight > best_weight) {
                best = Some((detection, weight));
            }
        }

        best.map(|(detection, _)| detection)
    }
}

/// Check the required car-state fields. The engine refuses to guess:
/// a missing field fails the cycle without a command.
fn validate(observation: &SensorObservation) -> Result<CarState<'_>> {
    observation
        .car_id
        .as_deref()
        .ok_or(LakshyaError::MalformedObservation("car_id"))?;
    let timestamp = observation
        .timestamp
        .ok_or(LakshyaError::MalformedObservation("timestamp"))?;
    let ball_count = observation
        .ball_count
        .ok_or(LakshyaError::MalformedObservation("ball_count"))?;
    let target_color = observation
        .target_color
        .as_deref()
        .ok_or(LakshyaError::MalformedObservation("target_color"))?;

    Ok(CarState {
        timestamp,
        ball_count,
        target_color,
        obstacle: observation.obstacle.unwrap_or(false),
    })
}
