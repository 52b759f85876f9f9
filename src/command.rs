//! Drive command model and the append-only command history.
//!
//! A [`DriveCommand`] is one decision cycle's output: a mode flag, a goal
//! tag, a correlation identifier and an ordered list of primitive actions.
//! Actions are executed by the vehicle strictly in emission order.
//!
//! The [`CommandHistory`] is the engine's only persistent memory: a
//! time-ordered log of finalized commands, queried by goal tag counted from
//! the newest entry backward.

use serde::{Deserialize, Serialize};

/// Operating mode carried on every command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Web-form control; the decision engine is not invoked
    Manual,
    /// Decisions run and commands are published
    Automatic,
    /// Decisions run, publishing is deferred
    Debug,
}

/// Sub-objective that produced a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// In-place camera sweep while hunting a ball
    SeekBallTurn,
    /// Blind relocation after repeated failed sweeps
    SeekBallMove,
    /// Direct approach toward a visible ball
    GoToBall,
    /// Gripper closed; pull back to verify the ball is retained
    CheckGrip,
    /// Approach toward the home zone
    GoToBase,
    /// In-place camera sweep while hunting the home zone
    SeekHomeTurn,
    /// Blind relocation while hunting the home zone
    SeekHomeMove,
    /// Arrived at the home zone; drop the ball and depart
    ReleaseBall,
    /// All required balls delivered; terminal
    GameEnd,
}

/// One primitive actuator instruction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Rotate in place. Positive = right, negative = left.
    Turn { angle_deg: i32 },
    /// Drive straight. Negative = reverse.
    Move { distance_mm: i32 },
    /// Set drive speed as a percentage of maximum.
    SetSpeed { percent: u8 },
    /// Open the gripper
    GripperOpen,
    /// Close the gripper
    GripperClose,
    /// Ask the car for the next sensor reading
    RequestSensor,
}

impl Action {
    /// Whether the action physically moves the vehicle or gripper.
    pub fn is_physical(&self) -> bool {
        !matches!(self, Action::RequestSensor)
    }
}

/// One decision cycle's output. Built incrementally by the engine and
/// finalized before dispatch; never mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriveCommand {
    /// Operating mode
    pub mode: Mode,
    /// Sub-objective tag
    pub goal: Goal,
    /// Timestamp of the observation that triggered this command
    pub correlation_id: u64,
    /// Balls delivered by executing this command (set on release)
    #[serde(default)]
    pub ball_count_delta: u32,
    /// Primitive actions, executed in emission order
    pub actions: Vec<Action>,
}

impl DriveCommand {
    /// New command with no actions yet.
    pub fn new(mode: Mode, goal: Goal) -> Self {
        Self {
            mode,
            goal,
            correlation_id: 0,
            ball_count_delta: 0,
            actions: Vec::new(),
        }
    }

    /// Append an action. Emission order is actuation order.
    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Record balls delivered by this command. Legitimate only during
    /// construction, before the command is finalized.
    pub fn add_ball_count(&mut self, delta: u32) {
        self.ball_count_delta += delta;
    }

    /// Whether any action physically moves the vehicle or gripper.
    pub fn has_physical_action(&self) -> bool {
        self.actions.iter().any(Action::is_physical)
    }
}

/// Append-only, time-ordered log of dispatched commands.
///
/// The engine reads it, the dispatcher writes it; retention is the
/// transport layer's concern.
#[derive(Debug, Default)]
pub struct CommandHistory {
    entries: Vec<DriveCommand>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finalized command. Called after successful dispatch.
    pub fn append(&mut self, command: DriveCommand) {
        self.entries.push(command);
    }

    /// Count entries with the given goal, scanning from the newest entry
    /// backward and stopping at the first mismatch.
    pub fn count_consecutive(&self, goal: Goal) -> usize {
        self.entries
            .iter()
            .rev()
            .take_while(|command| command.goal == goal)
            .count()
    }

    /// Goal of the most recent entry, if any.
    pub fn last_goal(&self) -> Option<Goal> {
        self.entries.last().map(|command| command.goal)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
