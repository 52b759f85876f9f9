//! LakshyaNav: navigation decision engine for a camera-guided,
//! ball-collecting robot.
//!
//! The robot locates colored balls with a single forward-facing camera,
//! captures them with a gripper and carries them to a home zone. This
//! crate is the decision core: it turns one sensor observation plus a
//! rolling log of the robot's own past commands into one bounded drive
//! command (turn, move, set speed, open/close gripper).
//!
//! ## Decision cycle
//!
//! 1. The transport layer admits an observation through the
//!    [`ingest::ObservationGate`] (required fields, strictly increasing
//!    timestamps, freshness window).
//! 2. [`engine::NavigationEngine::decide`] selects the objective
//!    (collect, return, or done), asks the [`perception::ObjectDetector`]
//!    for detections, and composes geometry, search and capture/release
//!    logic into a [`command::DriveCommand`].
//! 3. The [`dispatch::Dispatcher`] publishes the command and appends it
//!    to the [`command::CommandHistory`], the engine's only cross-cycle
//!    memory.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod perception;
pub mod search;

pub use command::{Action, CommandHistory, DriveCommand, Goal, Mode};
pub use config::LakshyaConfig;
pub use engine::{EngineConfig, NavigationEngine};
pub use error::{LakshyaError, Result};
pub use perception::{
    BoundingBox, Detection, EmbeddedDetections, ObjectDetector, PerceptionError, SensorObservation,
};
pub use search::{SearchConfig, SearchStrategy, SearchTarget};
