//! Bounded polling shared by every wait in the engine.

use std::time::Duration;

/// Fixed-interval poll with a hard attempt cap. Sleeps only between attempts,
/// so an exhausted poll never takes longer than
/// `(max_attempts - 1) * interval` plus the time spent probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poll {
    pub interval: Duration,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready { value: T, attempt: u32 },
    Exhausted { attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn value(self) -> Option<T> {
        match self {
            PollOutcome::Ready { value, .. } => Some(value),
            PollOutcome::Exhausted { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }
}

impl Poll {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Run `check` with the 1-based attempt number until it yields a value,
    /// the attempts run out, or it returns an error.
    pub fn until<T, E>(
        &self,
        mut check: impl FnMut(u32) -> Result<Option<T>, E>,
    ) -> Result<PollOutcome<T>, E> {
        for attempt in 1..=self.max_attempts {
            if let Some(value) = check(attempt)? {
                return Ok(PollOutcome::Ready { value, attempt });
            }
            if attempt < self.max_attempts && !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        }
        Ok(PollOutcome::Exhausted {
            attempts: self.max_attempts,
        })
    }
}
