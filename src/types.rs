use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum trimmed length every generated report field must reach.
pub const MIN_FIELD_LENGTH: usize = 150;
/// Soft upper target handed to the content generator.
pub const MAX_FIELD_LENGTH: usize = 300;
/// Lowest length accepted after a value has been written into the portal form.
pub const IN_FORM_FLOOR: usize = 100;
/// Generated fields shorter than this get one extension round trip.
pub const EXTEND_FLOOR: usize = 100;

pub const DOM_OUTLINE_MAX_CHARS: usize = 4000;

/// The three free-text sections of a daily report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub activity: String,
    pub learning: String,
    pub obstacles: String,
}

impl Report {
    pub fn new(
        activity: impl Into<String>,
        learning: impl Into<String>,
        obstacles: impl Into<String>,
    ) -> Self {
        Self {
            activity: activity.into(),
            learning: learning.into(),
            obstacles: obstacles.into(),
        }
    }

    /// Fields in the order the portal form lays them out.
    pub fn fields(&self) -> [(ReportField, &str); 3] {
        [
            (ReportField::Activity, self.activity.as_str()),
            (ReportField::Learning, self.learning.as_str()),
            (ReportField::Obstacles, self.obstacles.as_str()),
        ]
    }

    pub fn validate(&self, min_length: usize) -> bool {
        self.fields()
            .iter()
            .all(|(_, value)| trimmed_len(value) >= min_length)
    }

    pub fn lengths(&self) -> [usize; 3] {
        let [a, l, o] = self.fields();
        [trimmed_len(a.1), trimmed_len(l.1), trimmed_len(o.1)]
    }
}

/// Character count of `value` with surrounding whitespace removed.
pub fn trimmed_len(value: &str) -> usize {
    value.trim().chars().count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportField {
    Activity,
    Learning,
    Obstacles,
}

impl fmt::Display for ReportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportField::Activity => "activity",
            ReportField::Learning => "learning",
            ReportField::Obstacles => "obstacles",
        })
    }
}

/// Length thresholds applied at generation time and after filling the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub min_field_length: usize,
    pub max_field_length: usize,
    pub in_form_floor: usize,
    pub extend_floor: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_field_length: MIN_FIELD_LENGTH,
            max_field_length: MAX_FIELD_LENGTH,
            in_form_floor: IN_FORM_FLOOR,
            extend_floor: EXTEND_FLOOR,
        }
    }
}

/// Which resolution strategy located (or failed to locate) a control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorSource {
    #[default]
    NotFound,
    LabelFor,
    LabelParent,
    SingleControl,
    LabelLocator,
    NativeSelect,
    CustomDropdown,
    Keyword,
    StyleMarker,
}

impl LocatorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorSource::NotFound => "not-found",
            LocatorSource::LabelFor => "label-for",
            LocatorSource::LabelParent => "label-parent",
            LocatorSource::SingleControl => "single-control",
            LocatorSource::LabelLocator => "label-locator",
            LocatorSource::NativeSelect => "native-select",
            LocatorSource::CustomDropdown => "custom-dropdown",
            LocatorSource::Keyword => "keyword",
            LocatorSource::StyleMarker => "style-marker",
        }
    }
}

impl fmt::Display for LocatorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one resolution or verification pass. Recomputed on every
/// check; the dialog may have re-rendered since the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementState {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub satisfied: bool,
    #[serde(default)]
    pub source: LocatorSource,
    #[serde(default)]
    pub raw_value: String,
}

impl ElementState {
    pub fn missing() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitCandidate {
    pub text: String,
    pub disabled: bool,
    #[serde(default)]
    pub class: String,
}

/// What the form looked like when a submit attempt went wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedback {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub invalid_hints: Vec<String>,
    #[serde(default)]
    pub candidates: Vec<SubmitCandidate>,
    #[serde(default)]
    pub checkbox: ElementState,
    #[serde(default)]
    pub attendance: ElementState,
}

impl fmt::Display for SubmitFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "errors={:?} invalid={:?} candidates=[",
            self.errors, self.invalid_hints
        )?;
        for (i, c) in self.candidates.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?} disabled={}", c.text, c.disabled)?;
        }
        write!(
            f,
            "] checkbox={}/{} attendance={}/{:?}",
            self.checkbox.source,
            self.checkbox.satisfied,
            self.attendance.source,
            self.attendance.raw_value
        )
    }
}

/// Controls whose state must be satisfied before submit unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingControl {
    ConfirmCheckbox,
    Attendance,
}

impl fmt::Display for GatingControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GatingControl::ConfirmCheckbox => "confirmation checkbox",
            GatingControl::Attendance => "attendance selector",
        })
    }
}

/// Phases of the forward-only flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Session,
    Login,
    Navigate,
    Fill,
    Submit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Session => "session",
            Stage::Login => "login",
            Stage::Navigate => "navigate",
            Stage::Fill => "fill",
            Stage::Submit => "submit",
        })
    }
}
