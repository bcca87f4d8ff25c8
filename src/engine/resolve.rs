//! Element resolution strategies.
//!
//! Every lookup goes through a fresh page script scoped to the active dialog.
//! Ranked strategies are tried in order and the first hit wins; a failing
//! strategy (including a script error) falls through to the next one, and
//! exhausting the list yields an empty [`ElementState`] rather than an error.

use serde::Deserialize;
use tracing::debug;

use crate::dom;
use crate::page::{Page, Script};
use crate::selectors::SelectorTable;
use crate::types::{ElementState, LocatorSource, SubmitCandidate, SubmitFeedback};

/// Semantic checkbox strategies, best first.
pub const CHECKBOX_STRATEGIES: [LocatorSource; 3] = [
    LocatorSource::LabelFor,
    LocatorSource::LabelParent,
    LocatorSource::SingleControl,
];

pub struct Resolver<'a, P: Page> {
    page: &'a P,
    selectors: &'a SelectorTable,
}

#[derive(Debug, Default, Deserialize)]
struct DialogState {
    #[serde(default)]
    open: bool,
}

#[derive(Debug, Default, Deserialize)]
struct FieldCount {
    #[serde(default)]
    count: usize,
}

#[derive(Debug, Default, Deserialize)]
struct FieldReading {
    #[serde(default)]
    found: bool,
    #[serde(default)]
    length: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackReading {
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    invalid_hints: Vec<String>,
}

impl<'a, P: Page> Resolver<'a, P> {
    pub fn new(page: &'a P, selectors: &'a SelectorTable) -> Self {
        Self { page, selectors }
    }

    pub fn page(&self) -> &'a P {
        self.page
    }

    pub fn selectors(&self) -> &'a SelectorTable {
        self.selectors
    }

    /// Evaluate `script` and decode its result, logging and defaulting on failure.
    pub fn inspect<T: for<'de> Deserialize<'de> + Default>(&self, script: &Script) -> T {
        match self.page.evaluate(script) {
            Ok(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                debug!(op = script.op, error = %e, "script returned an unexpected shape");
                T::default()
            }),
            Err(e) => {
                debug!(op = script.op, error = %e, "script failed");
                T::default()
            }
        }
    }

    /// First strategy in `ranked` whose script finds the control.
    pub fn first_found(
        &self,
        ranked: &[LocatorSource],
        script: impl Fn(LocatorSource) -> Script,
    ) -> ElementState {
        for &strategy in ranked {
            let state: ElementState = self.inspect(&script(strategy));
            if state.found {
                return state;
            }
            debug!(strategy = %strategy, "strategy did not resolve");
        }
        ElementState::missing()
    }

    /// Whether a visible container still looks like the report dialog.
    pub fn report_dialog_open(&self) -> anyhow::Result<bool> {
        let value = self.page.evaluate(&dom::report_dialog_open(self.selectors))?;
        let reading: DialogState = serde_json::from_value(value)?;
        Ok(reading.open)
    }

    /// Count and tag the visible report text fields.
    pub fn report_fields(&self) -> usize {
        let count: FieldCount = self.inspect(&dom::resolve_fields(self.selectors));
        count.count
    }

    /// Trimmed length of field `index`, resolved fresh. `None` when it is gone.
    pub fn field_length(&self, index: usize) -> Option<usize> {
        let reading: FieldReading = self.inspect(&dom::field_length(self.selectors, index));
        reading.found.then_some(reading.length)
    }

    pub fn checkbox(&self) -> ElementState {
        self.first_found(&CHECKBOX_STRATEGIES, |strategy| {
            dom::checkbox_inspect(self.selectors, strategy)
        })
    }

    pub fn attendance(&self) -> ElementState {
        self.inspect(&dom::attendance_read(self.selectors))
    }

    /// Submit candidates in the active dialog, tagged for a native click.
    pub fn submit_candidates(&self) -> Vec<SubmitCandidate> {
        self.inspect(&dom::submit_candidates(self.selectors))
    }

    /// Snapshot of everything that explains a blocked or failed submit.
    pub fn feedback(&self) -> SubmitFeedback {
        let reading: FeedbackReading = self.inspect(&dom::collect_feedback(self.selectors));
        SubmitFeedback {
            errors: reading.errors,
            invalid_hints: reading.invalid_hints,
            candidates: self.submit_candidates(),
            checkbox: self.checkbox(),
            attendance: self.attendance(),
        }
    }
}
