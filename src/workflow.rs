//! Interactive draft-and-confirm conversation in front of the engine.
//!
//! `WaitingForInput -> WaitingConfirm -> Done`. Any text while waiting for
//! input produces a draft; while a draft is pending, `YES` hands it over for
//! submission, `CANCEL` stops, and anything else is treated as new input.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::brain::ContentGenerator;
use crate::types::{Report, Thresholds};

/// Wall-clock budget for the whole interaction.
pub const INTERACTION_BUDGET: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    WaitingForInput,
    WaitingConfirm,
    Done,
}

/// What the conversation did with one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    Draft(Report),
    TooShort([usize; 3]),
    GenerationFailed(String),
    /// Submit this report; the conversation is over.
    Confirmed(Report),
    Cancelled,
    Finished,
}

impl Turn {
    /// User-facing reply.
    pub fn message(&self) -> String {
        match self {
            Turn::Draft(report) => format!(
                "Draft report generated\n\nActivity:\n{}\n\nLearning:\n{}\n\nObstacles:\n{}\n\n\
                 Reply YES to submit this report, CANCEL to stop, or anything else to regenerate.",
                report.activity, report.learning, report.obstacles
            ),
            Turn::TooShort(lengths) => format!(
                "Generated report was too short ({lengths:?} chars). Please try again with more details."
            ),
            Turn::GenerationFailed(reason) => {
                format!("Error generating report ({reason}). Try again.")
            }
            Turn::Confirmed(_) => "Submitting report...".to_string(),
            Turn::Cancelled => "Operation cancelled.".to_string(),
            Turn::Finished => "This session is finished.".to_string(),
        }
    }
}

/// How a message is read while a draft waits for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    Cancel,
    Other,
}

impl Answer {
    fn of(text: &str) -> Self {
        match text.trim().to_uppercase().as_str() {
            "YES" => Answer::Yes,
            "CANCEL" => Answer::Cancel,
            _ => Answer::Other,
        }
    }
}

pub struct Conversation<G: ContentGenerator> {
    generator: G,
    context: String,
    thresholds: Thresholds,
    state: WorkflowState,
    draft: Option<Report>,
}

impl<G: ContentGenerator> Conversation<G> {
    pub fn new(generator: G, context: impl Into<String>, thresholds: Thresholds) -> Self {
        Self {
            generator,
            context: context.into(),
            thresholds,
            state: WorkflowState::WaitingForInput,
            draft: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == WorkflowState::Done
    }

    /// Status shown while `text` is being handled in the current state.
    pub fn pending_message(&self, text: &str) -> &'static str {
        match (self.state, Answer::of(text)) {
            (WorkflowState::Done, _) => "This session is finished.",
            (WorkflowState::WaitingConfirm, Answer::Yes) => "🚀 Submitting report...",
            (WorkflowState::WaitingConfirm, Answer::Cancel) => "Cancelling...",
            _ => "⏳ Generating draft report... please wait.",
        }
    }

    pub async fn handle(&mut self, text: &str) -> Turn {
        match self.state {
            WorkflowState::Done => Turn::Finished,
            WorkflowState::WaitingForInput => self.draft_from(text).await,
            WorkflowState::WaitingConfirm => match Answer::of(text) {
                Answer::Yes => {
                    self.state = WorkflowState::Done;
                    match self.draft.take() {
                        Some(report) => {
                            info!("draft confirmed");
                            Turn::Confirmed(report)
                        }
                        None => Turn::Finished,
                    }
                }
                Answer::Cancel => {
                    info!("interaction cancelled");
                    self.state = WorkflowState::Done;
                    self.draft = None;
                    Turn::Cancelled
                }
                Answer::Other => {
                    info!("regenerating draft from new input");
                    self.state = WorkflowState::WaitingForInput;
                    self.draft = None;
                    self.draft_from(text).await
                }
            },
        }
    }

    async fn draft_from(&mut self, text: &str) -> Turn {
        match self.generator.generate(&self.context, text).await {
            Ok(report) if report.validate(self.thresholds.min_field_length) => {
                self.draft = Some(report.clone());
                self.state = WorkflowState::WaitingConfirm;
                Turn::Draft(report)
            }
            Ok(report) => {
                warn!(lengths = ?report.lengths(), "draft rejected as too short");
                Turn::TooShort(report.lengths())
            }
            Err(e) => {
                error!(error = %e, "draft generation failed");
                Turn::GenerationFailed(e.to_string())
            }
        }
    }
}
