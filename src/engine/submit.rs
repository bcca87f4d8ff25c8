//! Submit coordination: `Locked -> Enabled -> Clicked -> Confirmed | Stuck`.

use anyhow::anyhow;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, warn};

use super::Timings;
use super::gating::GatingSatisfier;
use super::poll::PollOutcome;
use super::resolve::Resolver;
use crate::dom;
use crate::error::StageError;
use crate::page::Page;
use crate::selectors::SelectorTable;
use crate::types::{GatingControl, SubmitCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Locked,
    Enabled,
    Clicked,
    Confirmed,
    Stuck,
}

impl fmt::Display for SubmitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmitState::Locked => "locked",
            SubmitState::Enabled => "enabled",
            SubmitState::Clicked => "clicked",
            SubmitState::Confirmed => "confirmed",
            SubmitState::Stuck => "stuck",
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ClickOutcome {
    #[serde(default)]
    clicked: bool,
}

pub struct SubmitCoordinator<'a, P: Page> {
    resolver: Resolver<'a, P>,
    gating: GatingSatisfier<'a, P>,
    timings: &'a Timings,
    state: SubmitState,
}

fn summarize(candidates: &[SubmitCandidate]) -> String {
    candidates
        .iter()
        .map(|c| format!("{:?}{}", c.text, if c.disabled { " (disabled)" } else { "" }))
        .collect::<Vec<_>>()
        .join(", ")
}

impl<'a, P: Page> SubmitCoordinator<'a, P> {
    pub fn new(page: &'a P, selectors: &'a SelectorTable, timings: &'a Timings) -> Self {
        Self {
            resolver: Resolver::new(page, selectors),
            gating: GatingSatisfier::new(page, selectors, timings),
            timings,
            state: SubmitState::Locked,
        }
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    fn advance(&mut self, next: SubmitState) {
        debug!(from = %self.state, to = %next, "submit state");
        self.state = next;
    }

    /// Click submit and wait for the report dialog to go away.
    pub fn submit(&mut self) -> Result<(), StageError> {
        let checkbox = self.resolver.checkbox();
        if checkbox.found && !checkbox.satisfied {
            warn!("confirmation checkbox unchecked before submit");
            let state = self.gating.confirm_checkbox();
            if !state.satisfied {
                return Err(StageError::GatingUnsatisfied {
                    control: GatingControl::ConfirmCheckbox,
                    state,
                });
            }
        }

        let index = match self.wait_enabled(self.timings.submit_attempts)? {
            Some(index) => index,
            None => {
                warn!("submit still locked, re-running gating controls");
                self.gating.confirm_checkbox();
                self.gating.attendance();
                match self.wait_enabled(self.timings.recovery_attempts)? {
                    Some(index) => index,
                    None => {
                        self.advance(SubmitState::Stuck);
                        return Err(StageError::SubmitLocked {
                            feedback: Box::new(self.resolver.feedback()),
                        });
                    }
                }
            }
        };
        self.advance(SubmitState::Enabled);

        self.click(index)?;
        self.advance(SubmitState::Clicked);
        if self.wait_closed()? {
            self.advance(SubmitState::Confirmed);
            return Ok(());
        }

        let retry = self
            .resolver
            .submit_candidates()
            .iter()
            .position(|c| !c.disabled);
        if let Some(index) = retry {
            warn!(index, "dialog still open with submit enabled, clicking again");
            self.click(index)?;
            if self.wait_closed()? {
                self.advance(SubmitState::Confirmed);
                return Ok(());
            }
        }

        self.advance(SubmitState::Stuck);
        Err(StageError::SubmitNotConfirmed {
            feedback: Box::new(self.resolver.feedback()),
        })
    }

    /// Index of the first enabled candidate within `attempts` polls.
    fn wait_enabled(&self, attempts: u32) -> Result<Option<usize>, StageError> {
        let outcome = self.timings.poll(attempts).until(|attempt| {
            let candidates = self.resolver.submit_candidates();
            if let Some(index) = candidates.iter().position(|c| !c.disabled) {
                info!(attempt, text = %candidates[index].text, "submit enabled");
                return Ok::<_, StageError>(Some(index));
            }
            info!(
                attempt,
                attempts,
                candidates = %summarize(&candidates),
                "submit not enabled yet"
            );
            Ok(None)
        })?;
        Ok(outcome.value())
    }

    /// Native click on the tagged candidate, falling back to a script click.
    fn click(&self, index: usize) -> Result<(), StageError> {
        let page = self.resolver.page();
        match page.click(&dom::submit_marker(index)) {
            Ok(()) => {
                info!(index, "submit clicked");
                Ok(())
            }
            Err(e) => {
                warn!(index, error = %e, "native submit click failed, using script click");
                let raw = page.evaluate(&dom::submit_click(index))?;
                let outcome: ClickOutcome =
                    serde_json::from_value(raw).map_err(anyhow::Error::from)?;
                if !outcome.clicked {
                    return Err(anyhow!("submit control {index} vanished before the click").into());
                }
                Ok(())
            }
        }
    }

    /// True once no visible container looks like the report dialog.
    fn wait_closed(&self) -> Result<bool, StageError> {
        let outcome = self.timings.poll(self.timings.confirm_attempts).until(|attempt| {
            let open = self.resolver.report_dialog_open().unwrap_or_else(|e| {
                debug!(error = %e, "dialog check failed");
                true
            });
            debug!(attempt, open, "waiting for report dialog to close");
            Ok::<_, StageError>((!open).then_some(()))
        })?;
        if let PollOutcome::Ready { attempt, .. } = outcome {
            info!(attempt, "report dialog closed");
            return Ok(true);
        }
        warn!(attempts = self.timings.confirm_attempts, "report dialog still open");
        Ok(false)
    }
}
