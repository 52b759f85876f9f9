//! Command dispatch: publish, then record.
//!
//! The dispatcher owns the command history. A command is appended only
//! after it was actually handed to the transport, so the history never
//! contains commands the vehicle did not receive. In debug mode decisions
//! still run and are recorded, but nothing is published.

use std::io::Write;

use tracing::{debug, warn};

use crate::command::{CommandHistory, DriveCommand, Mode};
use crate::error::Result;

/// Transport seam for finalized command frames.
pub trait CommandSink {
    fn publish(&mut self, frame: &str) -> std::io::Result<()>;
}

/// Sink writing newline-delimited JSON frames to any writer.
pub struct JsonLineSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> CommandSink for JsonLineSink<W> {
    fn publish(&mut self, frame: &str) -> std::io::Result<()> {
        self.writer.write_all(frame.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Publishes commands and maintains the append-only history.
pub struct Dispatcher<S> {
    sink: S,
    history: CommandHistory,
    max_attempts: u32,
    publish_failures: u64,
}

impl<S: CommandSink> Dispatcher<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            history: CommandHistory::new(),
            max_attempts: 3,
            publish_failures: 0,
        }
    }

    /// Read access for the engine's consecutive-count queries.
    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Publish a finalized command, appending it to the history on
    /// success. Retries a bounded number of times; the final failure is
    /// returned to the caller.
    pub fn dispatch(&mut self, command: DriveCommand, mode: Mode) -> Result<()> {
        if mode == Mode::Debug {
            debug!(goal = ?command.goal, "debug mode, publish deferred");
            self.history.append(command);
            return Ok(());
        }

        let frame = serde_json::to_string(&command)?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.sink.publish(&frame) {
                Ok(()) => {
                    self.history.append(command);
                    return Ok(());
                }
                Err(e) if attempt < self.max_attempts => {
                    self.publish_failures += 1;
                    warn!("publish attempt {} failed: {}", attempt, e);
                }
                Err(e) => {
                    self.publish_failures += 1;
                    return Err(e.into());
                }
            }
        }
    }

    pub fn publish_failures(&self) -> u64 {
        self.publish_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Goal;

    /// Sink that fails the first `failures` publishes, then succeeds.
    struct FlakySink {
        failures: u32,
        published: Vec<String>,
    }

    impl FlakySink {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                published: Vec::new(),
            }
        }
    }

    impl CommandSink for FlakySink {
        fn publish(&mut self, frame: &str) -> std::io::Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "link down",
                ));
            }
            self.published.push(frame.to_string());
            Ok(())
        }
    }

    fn command(goal: Goal) -> DriveCommand {
        DriveCommand::new(Mode::Automatic, goal)
    }

    #[test]
    fn appends_history_after_publish() {
        let mut dispatcher = Dispatcher::new(FlakySink::new(0));
        dispatcher
            .dispatch(command(Goal::SeekBallTurn), Mode::Automatic)
            .unwrap();
        assert_eq!(dispatcher.history().len(), 1);
        assert_eq!(dispatcher.sink.published.len(), 1);
    }

    #[test]
    fn retries_transient_failures() {
        let mut dispatcher = Dispatcher::new(FlakySink::new(2));
        dispatcher
            .dispatch(command(Goal::GoToBall), Mode::Automatic)
            .unwrap();
        assert_eq!(dispatcher.history().len(), 1);
        assert_eq!(dispatcher.publish_failures(), 2);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut dispatcher = Dispatcher::new(FlakySink::new(10));
        let result = dispatcher.dispatch(command(Goal::GoToBall), Mode::Automatic);
        assert!(result.is_err());
        // Nothing published, nothing recorded
        assert_eq!(dispatcher.history().len(), 0);
        assert!(dispatcher.sink.published.is_empty());
    }

    #[test]
    fn debug_mode_records_without_publishing() {
        let mut dispatcher = Dispatcher::new(FlakySink::new(0));
        dispatcher
            .dispatch(command(Goal::SeekBallTurn), Mode::Debug)
            .unwrap();
        assert_eq!(dispatcher.history().len(), 1);
        assert!(dispatcher.sink.published.is_empty());
    }
}
