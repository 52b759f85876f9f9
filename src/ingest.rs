//! Observation admission gate.
//!
//! Applied by the transport layer before an observation reaches the
//! engine: structural validation, strictly increasing timestamps, and a
//! freshness window. Each violation increments its own counter and is
//! reported with a transport-level reason that never mixes with engine
//! error kinds.

use thiserror::Error;

use crate::perception::SensorObservation;

/// Why an observation was refused admission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RejectReason {
    /// Unparseable frame or missing required field
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Timestamp not strictly greater than the maximum seen so far
    #[error("out of order: timestamp {timestamp} not after {max_seen}")]
    OutOfOrder { timestamp: u64, max_seen: u64 },

    /// Observation older than the freshness window
    #[error("stale: observation is {age_ms}ms old (window {window_ms}ms)")]
    Expired { age_ms: u64, window_ms: u64 },
}

/// Admission gate with per-kind rejection counters.
#[derive(Debug)]
pub struct ObservationGate {
    freshness_window_ms: u64,
    max_seen: u64,
    admitted: u64,
    rejected_format: u64,
    rejected_stale: u64,
}

impl ObservationGate {
    pub fn new(freshness_window_s: u64) -> Self {
        Self {
            freshness_window_ms: freshness_window_s * 1000,
            max_seen: 0,
            admitted: 0,
            rejected_format: 0,
            rejected_stale: 0,
        }
    }

    /// Parse one JSON frame and admit it. `now_ms` is the receiver's
    /// wall clock, passed in so the window check is testable.
    pub fn admit_json(
        &mut self,
        frame: &str,
        now_ms: u64,
    ) -> Result<SensorObservation, RejectReason> {
        let observation: SensorObservation = serde_json::from_str(frame).map_err(|e| {
            self.rejected_format += 1;
            RejectReason::InvalidFormat(e.to_string())
        })?;
        self.admit(observation, now_ms)
    }

    /// Admit an already-parsed observation.
    pub fn admit(
        &mut self,
        observation: SensorObservation,
        now_ms: u64,
    ) -> Result<SensorObservation, RejectReason> {
        if observation.car_id.is_none()
            || observation.ball_count.is_none()
            || observation.target_color.is_none()
        {
            self.rejected_format += 1;
            return Err(RejectReason::InvalidFormat(
                "missing required car-state field".to_string(),
            ));
        }
        let Some(timestamp) = observation.timestamp else {
            self.rejected_format += 1;
            return Err(RejectReason::InvalidFormat(
                "missing timestamp".to_string(),
            ));
        };

        if timestamp <= self.max_seen {
            self.rejected_stale += 1;
            return Err(RejectReason::OutOfOrder {
                timestamp,
                max_seen: self.max_seen,
            });
        }

        let age_ms = now_ms.saturating_sub(timestamp);
        if age_ms > self.freshness_window_ms {
            self.rejected_stale += 1;
            return Err(RejectReason::Expired {
                age_ms,
                window_ms: self.freshness_window_ms,
            });
        }

        self.max_seen = timestamp;
        self.admitted += 1;
        Ok(observation)
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    pub fn rejected_format(&self) -> u64 {
        self.rejected_format
    }

    pub fn rejected_stale(&self) -> u64 {
        self.rejected_stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(timestamp: u64) -> SensorObservation {
        SensorObservation {
            car_id: Some("car-1".to_string()),
            timestamp: Some(timestamp),
            ball_count: Some(0),
            target_color: Some("red".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn admits_fresh_in_order_observation() {
        let mut gate = ObservationGate::new(60);
        assert!(gate.admit(observation(1_000), 1_500).is_ok());
        assert_eq!(gate.admitted(), 1);
    }

    #[test]
    fn rejects_equal_and_older_timestamps() {
        let mut gate = ObservationGate::new(60);
        gate.admit(observation(1_000), 1_500).unwrap();

        let replay = gate.admit(observation(1_000), 1_600);
        assert!(matches!(replay, Err(RejectReason::OutOfOrder { .. })));
        let older = gate.admit(observation(900), 1_600);
        assert!(matches!(older, Err(RejectReason::OutOfOrder { .. })));
        assert_eq!(gate.rejected_stale(), 2);
        assert_eq!(gate.rejected_format(), 0);
    }

    #[test]
    fn rejects_expired_observation() {
        let mut gate = ObservationGate::new(60);
        let result = gate.admit(observation(1_000), 1_000 + 61_000);
        assert!(matches!(result, Err(RejectReason::Expired { .. })));
        assert_eq!(gate.rejected_stale(), 1);
        // An expired observation does not advance the high-water mark
        assert!(gate.admit(observation(1_000), 2_000).is_ok());
    }

    #[test]
    fn rejects_missing_fields_as_format() {
        let mut gate = ObservationGate::new(60);
        let mut incomplete = observation(1_000);
        incomplete.target_color = None;
        let result = gate.admit(incomplete, 1_500);
        assert!(matches!(result, Err(RejectReason::InvalidFormat(_))));
        assert_eq!(gate.rejected_format(), 1);
        assert_eq!(gate.rejected_stale(), 0);
    }

    #[test]
    fn rejects_garbage_json_as_format() {
        let mut gate = ObservationGate::new(60);
        assert!(matches!(
            gate.admit_json("not json", 1_000),
            Err(RejectReason::InvalidFormat(_))
        ));
        assert_eq!(gate.rejected_format(), 1);
    }
}
