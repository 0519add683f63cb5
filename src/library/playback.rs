//! Playback progress save gating.
//!
//! Players emit position ticks far more often than progress is worth
//! persisting. The gate accepts a save when enough playback time has passed
//! since the last accepted one, or on a backward seek; completion writes
//! bypass it entirely. The decision is based on media position, so it is
//! deterministic regardless of frame timing.

/// Throttle for progress writes during playback
#[derive(Debug, Clone)]
pub struct SaveGate {
    min_gap_seconds: f64,
    last_saved_position: Option<f64>,
}

impl SaveGate {
    /// Gate that accepts at most one save per `min_gap_seconds` of forward
    /// playback
    pub fn new(min_gap_seconds: f64) -> Self {
        Self {
            min_gap_seconds,
            last_saved_position: None,
        }
    }

    /// Decide whether the position at `position_seconds` should be
    /// persisted; accepting records the position.
    pub fn should_save(&mut self, position_seconds: f64) -> bool {
        let accept = match self.last_saved_position {
            None => true,
            // A backward jump is a seek and is always worth saving
            Some(prev) => {
                position_seconds < prev || position_seconds - prev >= self.min_gap_seconds
            }
        };

        if accept {
            self.last_saved_position = Some(position_seconds);
        }
        accept
    }

    /// Forget the last accepted position (e.g. when switching videos)
    pub fn reset(&mut self) {
        self.last_saved_position = None;
    }
}

impl Default for SaveGate {
    fn default() -> Self {
        Self::new(5.0)
    }
}
