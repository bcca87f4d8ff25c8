//! Resilient form-interaction engine.
//!
//! Login → navigate → fill → confirm → submit against a dynamically rendered
//! portal form, built from small pieces that each own one kind of retry:
//! [`resolve`] locates controls, [`filler`] writes and verifies text,
//! [`gating`] satisfies prerequisite controls, [`submit`] waits for and
//! confirms the submit transition, and [`flow`] sequences the stages.

pub mod diagnostics;
pub mod filler;
pub mod flow;
pub mod gating;
pub mod poll;
pub mod portal;
pub mod resolve;
pub mod submit;

#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use poll::Poll;

/// Every bounded wait the engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub poll_interval: Duration,
    pub login_attempts: u32,
    pub login_field_wait: Duration,
    pub dialog_attempts: u32,
    pub today_cell_wait: Duration,
    pub field_wait: Duration,
    pub submit_attempts: u32,
    pub recovery_attempts: u32,
    pub confirm_attempts: u32,
    pub option_wait: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            login_attempts: 20,
            login_field_wait: Duration::from_secs(15),
            dialog_attempts: 5,
            today_cell_wait: Duration::from_secs(10),
            field_wait: Duration::from_secs(10),
            submit_attempts: 10,
            recovery_attempts: 3,
            confirm_attempts: 10,
            option_wait: Duration::from_secs(2),
        }
    }
}

impl Timings {
    /// Zero-interval timings for driving simulated pages.
    pub fn instant() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            login_field_wait: Duration::ZERO,
            today_cell_wait: Duration::ZERO,
            field_wait: Duration::ZERO,
            option_wait: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn poll(&self, attempts: u32) -> Poll {
        Poll::new(self.poll_interval, attempts)
    }
}
