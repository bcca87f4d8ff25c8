//! Forward-only orchestration of one report submission.

use std::fmt;
use tracing::{error, info, warn};

use super::Timings;
use super::diagnostics::{CaptureReport, Diagnostics};
use super::filler::fill_fields;
use super::gating::prepare_submit;
use super::portal;
use super::submit::SubmitCoordinator;
use crate::error::StageError;
use crate::hands::{Launcher, Session};
use crate::selectors::SelectorTable;
use crate::types::{Report, Stage, Thresholds};

#[derive(Debug)]
pub struct FlowFailure {
    pub stage: Stage,
    pub reason: StageError,
    pub artifacts: Option<CaptureReport>,
}

impl fmt::Display for FlowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.reason)
    }
}

/// Terminal outcome of one run. Either the dialog was seen closing after the
/// click, or the report counts as not submitted.
#[derive(Debug)]
pub enum FlowResult {
    Success,
    Failure(FlowFailure),
}

impl FlowResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FlowResult::Success)
    }

    pub fn failure(&self) -> Option<&FlowFailure> {
        match self {
            FlowResult::Success => None,
            FlowResult::Failure(failure) => Some(failure),
        }
    }
}

/// Drives one browser session through login, navigation, fill and submit.
///
/// The stage methods are public for lower-level use but expect to be called
/// in order; [`ReportEngine::run`] does that and always tears the session down.
pub struct ReportEngine<L: Launcher> {
    session: Session<L>,
    selectors: SelectorTable,
    thresholds: Thresholds,
    timings: Timings,
    diagnostics: Diagnostics,
}

impl<L: Launcher> ReportEngine<L> {
    pub fn new(launcher: L, prefer_stealth: bool, selectors: SelectorTable) -> Self {
        Self {
            session: Session::new(launcher, prefer_stealth),
            selectors,
            thresholds: Thresholds::default(),
            timings: Timings::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn session(&self) -> &Session<L> {
        &self.session
    }

    fn page(&self) -> Result<&L::Page, StageError> {
        self.session.page().ok_or(StageError::NoSession)
    }

    pub fn open(&mut self) -> Result<(), StageError> {
        if self.session.open() {
            Ok(())
        } else {
            Err(StageError::SessionStart)
        }
    }

    /// Sign in, opening the session first when needed.
    pub fn login(&mut self, identifier: &str, secret: &str) -> Result<(), StageError> {
        if !self.session.is_open() {
            self.open()?;
        }
        portal::login(self.page()?, &self.selectors, &self.timings, identifier, secret)
    }

    pub fn navigate_to_form(&self) -> Result<(), StageError> {
        portal::open_report_dialog(self.page()?, &self.selectors, &self.timings)
    }

    /// Write the report and satisfy the gating controls.
    pub fn fill_form(&self, report: &Report) -> Result<(), StageError> {
        let page = self.page()?;
        if !report.validate(self.thresholds.min_field_length) {
            warn!(
                lengths = ?report.lengths(),
                min = self.thresholds.min_field_length,
                "report shorter than the generation minimum"
            );
        }
        fill_fields(
            page,
            &self.selectors,
            &self.timings,
            self.thresholds.in_form_floor,
            report,
        )?;
        prepare_submit(page, &self.selectors, &self.timings)
    }

    pub fn submit(&self) -> Result<(), StageError> {
        SubmitCoordinator::new(self.page()?, &self.selectors, &self.timings).submit()
    }

    pub fn close(&mut self) {
        self.session.close();
    }

    /// Run every stage in order, capture diagnostics on the first failure and
    /// close the session on every path.
    pub fn run(&mut self, identifier: &str, secret: &str, report: &Report) -> FlowResult {
        let result = match self.run_stages(identifier, secret, report) {
            Ok(()) => {
                info!("daily report submitted");
                FlowResult::Success
            }
            Err((stage, reason)) => {
                error!(%stage, error = %reason, "report flow failed");
                let label = format!("{stage}_{}", reason.label());
                let artifacts = self
                    .session
                    .page()
                    .map(|page| self.diagnostics.capture(page, &self.selectors, &label));
                FlowResult::Failure(FlowFailure {
                    stage,
                    reason,
                    artifacts,
                })
            }
        };
        self.close();
        result
    }

    pub fn run_full_flow(&mut self, identifier: &str, secret: &str, report: &Report) -> bool {
        self.run(identifier, secret, report).is_success()
    }

    fn run_stages(
        &mut self,
        identifier: &str,
        secret: &str,
        report: &Report,
    ) -> Result<(), (Stage, StageError)> {
        self.open().map_err(|e| (Stage::Session, e))?;
        info!("logging in");
        self.login(identifier, secret)
            .map_err(|e| (Stage::Login, e))?;
        info!("opening today's report");
        self.navigate_to_form()
            .map_err(|e| (Stage::Navigate, e))?;
        info!("filling report");
        self.fill_form(report).map_err(|e| (Stage::Fill, e))?;
        info!("submitting report");
        self.submit().map_err(|e| (Stage::Submit, e))
    }
}
