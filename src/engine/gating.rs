//! Prerequisite controls that keep the submit button locked.
//!
//! Both satisfiers follow "reach the required state, then verify with a
//! fresh read" and return the verified [`ElementState`]. They are no-ops when
//! the control is already satisfied, so recovery can call them again freely.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::Timings;
use super::resolve::{CHECKBOX_STRATEGIES, Resolver};
use crate::dom;
use crate::error::StageError;
use crate::page::Page;
use crate::selectors::SelectorTable;
use crate::types::{ElementState, GatingControl, LocatorSource};

pub struct GatingSatisfier<'a, P: Page> {
    resolver: Resolver<'a, P>,
    timings: &'a Timings,
}

impl<'a, P: Page> GatingSatisfier<'a, P> {
    pub fn new(page: &'a P, selectors: &'a SelectorTable, timings: &'a Timings) -> Self {
        Self {
            resolver: Resolver::new(page, selectors),
            timings,
        }
    }

    /// Get the confirmation checkbox checked.
    pub fn confirm_checkbox(&self) -> ElementState {
        let current = self.resolver.checkbox();
        if current.satisfied {
            debug!(source = %current.source, "confirmation checkbox already checked");
            return current;
        }

        let selectors = self.resolver.selectors();
        for strategy in CHECKBOX_STRATEGIES {
            let clicked: ElementState = self
                .resolver
                .inspect(&dom::checkbox_click(selectors, strategy));
            if !clicked.found {
                continue;
            }
            if !clicked.satisfied {
                debug!(%strategy, "click did not register, forcing checked state");
                let _: ElementState = self
                    .resolver
                    .inspect(&dom::checkbox_force(selectors, strategy));
            }
            let verified: ElementState = self
                .resolver
                .inspect(&dom::checkbox_inspect(selectors, strategy));
            if verified.satisfied {
                info!(%strategy, "confirmation checkbox checked");
                return verified;
            }
            warn!(%strategy, "checkbox located but did not stay checked");
        }

        let page = self.resolver.page();
        for locator in &selectors.confirm_label_locators {
            if let Err(e) = page.click(locator) {
                debug!(%locator, error = %e, "label locator click failed");
                continue;
            }
            let verified = self.resolver.checkbox();
            if verified.satisfied {
                info!(%locator, "confirmation checkbox checked via label locator");
                return ElementState {
                    source: LocatorSource::LabelLocator,
                    ..verified
                };
            }
        }

        let last = self.resolver.checkbox();
        warn!(found = last.found, source = %last.source, "confirmation checkbox still unchecked");
        last
    }

    /// Get the attendance selector showing the configured option.
    pub fn attendance(&self) -> ElementState {
        let current = self.resolver.attendance();
        if current.satisfied {
            debug!(value = %current.raw_value, "attendance already selected");
            return current;
        }

        let selectors = self.resolver.selectors();
        let native: ElementState = self.resolver.inspect(&dom::attendance_native(selectors));
        if native.found {
            let verified = self.resolver.attendance();
            if verified.satisfied {
                info!(value = %verified.raw_value, "attendance set on native select");
            } else {
                warn!(value = %verified.raw_value, "native select has no matching option");
            }
            return verified;
        }

        let page = self.resolver.page();
        for locator in &selectors.attendance_option_locators {
            let opened: ElementState = self.resolver.inspect(&dom::attendance_open(selectors));
            if !opened.found {
                debug!("no attendance dropdown in the dialog");
                break;
            }
            page.pause(Duration::from_millis(300));
            if page.wait_visible(locator, self.timings.option_wait).is_err() {
                debug!(%locator, "option not visible");
                continue;
            }
            if let Err(e) = page.click(locator) {
                debug!(%locator, error = %e, "option click failed");
                continue;
            }
            let verified = self.resolver.attendance();
            if verified.satisfied {
                info!(%locator, value = %verified.raw_value, "attendance selected from dropdown");
                return verified;
            }
        }

        let last = self.resolver.attendance();
        warn!(found = last.found, value = %last.raw_value, "attendance option not selected");
        last
    }
}

/// Gating step of the fill stage. The checkbox is mandatory; attendance is
/// only attempted while every submit candidate is still disabled, and its
/// failure is left for the submit recovery pass.
pub fn prepare_submit<P: Page>(
    page: &P,
    selectors: &SelectorTable,
    timings: &Timings,
) -> Result<(), StageError> {
    let gating = GatingSatisfier::new(page, selectors, timings);
    let checkbox = gating.confirm_checkbox();
    if !checkbox.satisfied {
        return Err(StageError::GatingUnsatisfied {
            control: GatingControl::ConfirmCheckbox,
            state: checkbox,
        });
    }

    let candidates = Resolver::new(page, selectors).submit_candidates();
    if !candidates.is_empty() && candidates.iter().all(|c| c.disabled) {
        info!(candidates = candidates.len(), "submit still locked, selecting attendance");
        let attendance = gating.attendance();
        if !attendance.satisfied {
            warn!(source = %attendance.source, "attendance not satisfied, continuing to submit");
        }
    }
    Ok(())
}
