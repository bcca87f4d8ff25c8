//! Error types for the report engine and its collaborators.

use thiserror::Error;

use crate::types::{ElementState, GatingControl, ReportField, Stage, SubmitFeedback};

/// Stage-local failure surfaced to the flow orchestrator.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("browser session could not be started in any launch mode")]
    SessionStart,

    #[error("login timed out after {attempts} polls without a success or error signal")]
    LoginTimeout { attempts: u32 },

    #[error("login rejected by the portal: {0}")]
    LoginRejected(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("{field} field verified at {length} chars, below the in-form floor of {floor}")]
    FieldFill {
        field: ReportField,
        length: usize,
        floor: usize,
    },

    #[error("only {found} visible report fields in the dialog, expected {expected}")]
    FieldsMissing { found: usize, expected: usize },

    #[error("{control} never reached its required state (source={})", .state.source)]
    GatingUnsatisfied {
        control: GatingControl,
        state: ElementState,
    },

    #[error("no submit control became enabled: {feedback}")]
    SubmitLocked { feedback: Box<SubmitFeedback> },

    #[error("report dialog still open after submit: {feedback}")]
    SubmitNotConfirmed { feedback: Box<SubmitFeedback> },

    #[error("no browser session is open")]
    NoSession,

    #[error(transparent)]
    Browser(#[from] anyhow::Error),
}

impl StageError {
    /// Stage this error belongs to when raised outside the orchestrator.
    pub fn stage(&self) -> Stage {
        match self {
            StageError::SessionStart | StageError::NoSession => Stage::Session,
            StageError::LoginTimeout { .. } | StageError::LoginRejected(_) => Stage::Login,
            StageError::Navigation(_) => Stage::Navigate,
            StageError::FieldFill { .. }
            | StageError::FieldsMissing { .. }
            | StageError::GatingUnsatisfied { .. } => Stage::Fill,
            StageError::SubmitLocked { .. } | StageError::SubmitNotConfirmed { .. } => {
                Stage::Submit
            }
            // Driver errors carry no stage of their own; the orchestrator tags them.
            StageError::Browser(_) => Stage::Session,
        }
    }

    pub fn feedback(&self) -> Option<&SubmitFeedback> {
        match self {
            StageError::SubmitLocked { feedback } | StageError::SubmitNotConfirmed { feedback } => {
                Some(feedback)
            }
            _ => None,
        }
    }

    /// Short label used in diagnostic artifact names.
    pub fn label(&self) -> &'static str {
        match self {
            StageError::SessionStart => "session_start",
            StageError::LoginTimeout { .. } => "login_timeout",
            StageError::LoginRejected(_) => "login_rejected",
            StageError::Navigation(_) => "navigate_failed",
            StageError::FieldFill { .. } => "fill_length_invalid",
            StageError::FieldsMissing { .. } => "textareas_not_enough",
            StageError::GatingUnsatisfied { .. } => "gating_unsatisfied",
            StageError::SubmitLocked { .. } => "submit_locked",
            StageError::SubmitNotConfirmed { .. } => "submit_not_closed",
            StageError::NoSession => "no_session",
            StageError::Browser(_) => "exception",
        }
    }
}

/// Failure of the external AI content generator.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unparseable report content: {0}")]
    Parse(String),
}

/// Failure of the external attendance run.
#[derive(Debug, Error)]
pub enum PresensiError {
    #[error("failed to initialize browser session")]
    SessionStart,

    #[error("auth redirect detected (Google sign-in required); endpoint is not CI-accessible")]
    AuthRedirect,

    #[error("unit option {0:?} not found in the unit list")]
    UnitMissing(String),

    #[error("{0}")]
    Rejected(String),

    #[error("automation exception: {0}")]
    Browser(#[from] anyhow::Error),
}

impl PresensiError {
    /// Short label used in diagnostic artifact names.
    pub fn label(&self) -> &'static str {
        match self {
            PresensiError::SessionStart => "session_start",
            PresensiError::AuthRedirect => "auth_redirect",
            PresensiError::UnitMissing(_) => "unit_missing",
            PresensiError::Rejected(_) => "submission_failed",
            PresensiError::Browser(_) => "exception",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("selector table {path}: {reason}")]
    Selectors { path: String, reason: String },
}
