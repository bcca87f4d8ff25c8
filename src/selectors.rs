//! Target-site locator table.
//!
//! Every CSS/XPath locator and keyword set the engine relies on lives here,
//! so a portal markup change is a configuration update. Defaults target the
//! MagangHub monitoring portal (Vuetify 3 front end). A JSON file can
//! override any subset of fields.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorTable {
    pub base_url: String,
    pub login_url: String,

    pub username_input: String,
    pub password_input: String,
    pub login_button: String,
    pub dashboard_markers: String,
    pub login_error: String,

    pub calendar_today_cell: String,

    /// Any report dialog container, used for visibility checks.
    pub dialog_container: String,
    /// Currently active overlay; scopes every in-dialog search.
    pub active_dialog: String,
    /// Phrases that identify a container as the report dialog.
    pub report_dialog_phrases: Vec<String>,

    pub text_field: String,

    pub confirm_keywords: Vec<String>,
    pub confirm_label_locators: Vec<String>,
    pub checkbox_wrappers: String,

    pub attendance_keywords: Vec<String>,
    pub attendance_option: String,
    pub attendance_blocks: String,
    pub attendance_trigger: String,
    pub attendance_display: String,
    pub attendance_option_locators: Vec<String>,

    pub submit_keywords: Vec<String>,
    pub submit_style_marker: String,
    pub disabled_class: String,

    pub validation_errors: String,
    pub invalid_inputs: String,
}

impl Default for SelectorTable {
    fn default() -> Self {
        let base_url = "https://monev.maganghub.kemnaker.go.id".to_string();
        Self {
            login_url: format!("{base_url}/login"),
            base_url,

            username_input: "#username".into(),
            password_input: "#password".into(),
            login_button: "button[type='submit']".into(),
            dashboard_markers: ".v-calendar, .v-navigation-drawer, td.today-highlight".into(),
            login_error: ".v-alert--type-error, .v-alert.text-error".into(),

            calendar_today_cell:
                "td.clickable-day.today-highlight, td.today-highlight, .v-date-picker-month__day--selected"
                    .into(),

            dialog_container: ".v-dialog, .v-overlay-container .v-overlay__content".into(),
            active_dialog: ".v-dialog--active, .v-overlay--active, [role=\"dialog\"]".into(),
            report_dialog_phrases: strings(&["kehadiran", "meninjau"]),

            text_field: "textarea".into(),

            confirm_keywords: strings(&[
                "meninjau",
                "isian laporan ini sudah benar",
                "laporan ini sudah benar",
            ]),
            confirm_label_locators: vec![
                "//label[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'meninjau')]".into(),
                "//label[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'laporan')]".into(),
            ],
            checkbox_wrappers: ".v-selection-control__wrapper".into(),

            attendance_keywords: strings(&["kehadiran"]),
            attendance_option: "Hadir".into(),
            attendance_blocks: ".v-input, .v-select, [role=\"combobox\"], .v-field".into(),
            attendance_trigger: "[role=\"combobox\"], .v-field__input, .v-input__control, .v-field"
                .into(),
            attendance_display: ".v-select__selection-text, .v-select__selection, .v-field__input"
                .into(),
            attendance_option_locators: vec![
                "//div[contains(@class,'v-overlay--active')]//div[contains(@class,'v-list-item-title') and normalize-space()='Hadir']".into(),
                "//div[contains(@class,'v-overlay--active')]//*[@role='option'][contains(normalize-space(.), 'Hadir')]".into(),
                "//div[contains(@class,'v-list-item')][contains(normalize-space(.), 'Hadir')]".into(),
            ],

            submit_keywords: strings(&["simpan", "kirim", "submit"]),
            submit_style_marker: "bg-black".into(),
            disabled_class: "v-btn--disabled".into(),

            validation_errors: ".v-messages__message, .v-input--error .v-messages, [role=\"alert\"]"
                .into(),
            invalid_inputs: "[aria-invalid=\"true\"], .v-input--error".into(),
        }
    }
}

impl SelectorTable {
    /// Overlay the defaults with whatever fields the JSON file at `path` sets.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Selectors {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Selectors {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Host the login redirect has to land on.
    pub fn portal_host(&self) -> Option<String> {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_lowercase))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// XPath expressions start with `/` or `(`; everything else is CSS.
pub fn is_xpath(selector: &str) -> bool {
    let trimmed = selector.trim_start();
    trimmed.starts_with('/') || trimmed.starts_with('(')
}
