//! External attendance ("presensi") check-in/check-out runner.
//!
//! A separate, much smaller flow than the report engine: a public form with
//! a name input, a unit `<select>` and one button per action. It reuses the
//! session manager, the `Page` trait, bounded polling and diagnostics.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::flag;
use crate::dom;
use crate::engine::diagnostics::{CaptureReport, Diagnostics};
use crate::engine::poll::Poll;
use crate::error::{ConfigError, PresensiError};
use crate::hands::{Launcher, Session};
use crate::page::Page;
use crate::selectors::SelectorTable;
use crate::types::ElementState;

pub const DEFAULT_URL: &str = "https://script.google.com/macros/s/AKfycbz5M9sws7DUOiTWCt3vyCgUiMsXkTN-M72sjC4hdyyMGGyHVKm99d-gmwemYQVA7Q0f/exec";
pub const DEFAULT_UNIT: &str = "Pengembangan Aplikasi";

const SUCCESS_KEYWORDS: [&str; 3] = ["berhasil", "sukses", "success"];
const FAILURE_KEYWORDS: [&str; 3] = ["gagal", "failed", "error"];
const NO_CONFIRMATION: &str = "Button clicked, no explicit confirmation text found.";

/// WITA, UTC+8.
const WITA_OFFSET_SECS: i32 = 8 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresensiAction {
    Masuk,
    Keluar,
}

impl fmt::Display for PresensiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PresensiAction::Masuk => "MASUK",
            PresensiAction::Keluar => "KELUAR",
        })
    }
}

impl FromStr for PresensiAction {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MASUK" => Ok(PresensiAction::Masuk),
            "KELUAR" => Ok(PresensiAction::Keluar),
            other => Err(format!("unsupported action {other:?}, expected MASUK or KELUAR")),
        }
    }
}

/// Locators for the attendance form.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresensiSelectors {
    pub name_input: String,
    pub unit_select: String,
    pub masuk_button: String,
    pub keluar_button: String,
}

impl Default for PresensiSelectors {
    fn default() -> Self {
        Self {
            name_input: "#nama".into(),
            unit_select: "#unit".into(),
            masuk_button: r#"button.btn-masuk[onclick*="presensi('MASUK')"]"#.into(),
            keluar_button: r#"button.btn-keluar[onclick*="presensi('KELUAR')"]"#.into(),
        }
    }
}

impl PresensiSelectors {
    pub fn button(&self, action: PresensiAction) -> &str {
        match action {
            PresensiAction::Masuk => &self.masuk_button,
            PresensiAction::Keluar => &self.keluar_button,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PresensiConfig {
    pub enabled: bool,
    pub url: String,
    pub full_name: Option<String>,
    pub unit: String,
    pub action: Option<PresensiAction>,
    pub show_browser: bool,
}

/// Everything one run needs, resolved from [`PresensiConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresensiRequest {
    pub url: String,
    pub full_name: String,
    pub unit: String,
    pub action: PresensiAction,
}

impl PresensiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let action = get("PRESENSI_ACTION")
            .map(|raw| raw.parse::<PresensiAction>())
            .transpose()
            .map_err(|reason| ConfigError::Invalid {
                name: "PRESENSI_ACTION",
                reason,
            })?;

        Ok(Self {
            enabled: flag(&lookup, "PRESENSI_ENABLED", true)?,
            url: get("PRESENSI_URL").unwrap_or_else(|| DEFAULT_URL.to_string()),
            full_name: get("PRESENSI_FULL_NAME"),
            unit: get("PRESENSI_UNIT").unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            action,
            show_browser: flag(&lookup, "PRESENSI_SHOW_BROWSER", false)?,
        })
    }

    /// `None` when the runner is disabled.
    pub fn request(&self) -> Result<Option<PresensiRequest>, ConfigError> {
        if !self.enabled {
            return Ok(None);
        }
        let action = self.action.ok_or(ConfigError::Missing("PRESENSI_ACTION"))?;
        let full_name = self
            .full_name
            .clone()
            .ok_or(ConfigError::Missing("PRESENSI_FULL_NAME"))?;
        Ok(Some(PresensiRequest {
            url: self.url.clone(),
            full_name,
            unit: self.unit.clone(),
            action,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresensiTimings {
    pub settle: Duration,
    pub form_wait: Duration,
    pub button_wait: Duration,
    pub feedback_interval: Duration,
    pub feedback_attempts: u32,
}

impl Default for PresensiTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            form_wait: Duration::from_secs(20),
            button_wait: Duration::from_secs(20),
            feedback_interval: Duration::from_secs(1),
            feedback_attempts: 10,
        }
    }
}

impl PresensiTimings {
    pub fn instant() -> Self {
        Self {
            settle: Duration::ZERO,
            form_wait: Duration::ZERO,
            button_wait: Duration::ZERO,
            feedback_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub success: bool,
    pub detail: String,
}

impl Verdict {
    fn new(success: bool, detail: impl Into<String>) -> Self {
        Self {
            success,
            detail: detail.into(),
        }
    }
}

/// Judge one feedback poll. Alerts win over page text; an alert matching
/// neither keyword set counts as success.
pub fn classify_feedback(alert: &str, body: &str) -> Option<Verdict> {
    let alert = alert.trim();
    if !alert.is_empty() {
        let lowered = alert.to_lowercase();
        let failed = FAILURE_KEYWORDS.iter().any(|k| lowered.contains(k));
        return Some(Verdict::new(!failed, format!("Alert: {alert}")));
    }
    let body = body.to_lowercase();
    if FAILURE_KEYWORDS.iter().any(|k| body.contains(k)) {
        return Some(Verdict::new(false, "Failure message detected on page."));
    }
    if SUCCESS_KEYWORDS.iter().any(|k| body.contains(k)) {
        return Some(Verdict::new(true, "Success message detected on page."));
    }
    None
}

/// Google sign-in host, or any URL mentioning a sign-in step.
pub fn is_google_redirect(url: &str) -> bool {
    let google = reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| {
            host == "accounts.google.com" || host.ends_with(".accounts.google.com")
        });
    google || url.to_lowercase().contains("signin")
}

#[derive(Debug)]
pub struct PresensiOutcome {
    pub action: PresensiAction,
    pub success: bool,
    pub detail: String,
    pub artifacts: Option<CaptureReport>,
}

pub struct PresensiRunner<L: Launcher> {
    session: Session<L>,
    selectors: PresensiSelectors,
    timings: PresensiTimings,
    diagnostics: Diagnostics,
}

impl<L: Launcher> PresensiRunner<L> {
    pub fn new(launcher: L, prefer_stealth: bool) -> Self {
        Self {
            session: Session::new(launcher, prefer_stealth),
            selectors: PresensiSelectors::default(),
            timings: PresensiTimings::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_selectors(mut self, selectors: PresensiSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_timings(mut self, timings: PresensiTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Fill the form and press the action button. Captures diagnostics on
    /// failure and closes the session on every path.
    pub fn submit(&mut self, request: &PresensiRequest) -> PresensiOutcome {
        let outcome = match self.attempt(request) {
            Ok(detail) => {
                info!(action = %request.action, %detail, "presensi succeeded");
                PresensiOutcome {
                    action: request.action,
                    success: true,
                    detail,
                    artifacts: None,
                }
            }
            Err(err) => {
                let err = match err {
                    PresensiError::Browser(e) if self.redirected() => {
                        debug!(error = %e, "driver error after sign-in redirect");
                        PresensiError::AuthRedirect
                    }
                    other => other,
                };
                error!(action = %request.action, error = %err, "presensi failed");
                let label = format!("presensi_{}", err.label());
                let artifacts = self
                    .session
                    .page()
                    .map(|page| self.diagnostics.capture(page, &SelectorTable::default(), &label));
                PresensiOutcome {
                    action: request.action,
                    success: false,
                    detail: err.to_string(),
                    artifacts,
                }
            }
        };
        self.session.close();
        outcome
    }

    fn redirected(&self) -> bool {
        self.session
            .page()
            .and_then(|page| page.current_url().ok())
            .is_some_and(|url| is_google_redirect(&url))
    }

    fn attempt(&mut self, request: &PresensiRequest) -> Result<String, PresensiError> {
        if !self.session.open() {
            return Err(PresensiError::SessionStart);
        }
        let page = self.session.page().ok_or(PresensiError::SessionStart)?;
        let selectors = &self.selectors;

        info!(url = %request.url, "opening presensi page");
        page.navigate(&request.url)?;
        page.pause(self.timings.settle);
        if is_google_redirect(&page.current_url()?) {
            return Err(PresensiError::AuthRedirect);
        }

        page.wait_visible(&selectors.name_input, self.timings.form_wait)?;
        page.wait_visible(&selectors.unit_select, self.timings.form_wait)?;

        info!("filling name and unit");
        page.type_into(&selectors.name_input, &request.full_name)?;
        let unit: ElementState = serde_json::from_value(
            page.evaluate(&dom::select_option_by_text(&selectors.unit_select, &request.unit))?,
        )
        .map_err(anyhow::Error::from)?;
        if !unit.satisfied {
            return Err(PresensiError::UnitMissing(request.unit.clone()));
        }

        page.evaluate(&dom::install_alert_recorder())?;
        let button = selectors.button(request.action);
        page.wait_visible(button, self.timings.button_wait)?;
        info!(action = %request.action, "clicking presensi button");
        page.click(button)?;

        let outcome = Poll::new(self.timings.feedback_interval, self.timings.feedback_attempts)
            .until(|attempt| {
                let alert = page.evaluate(&dom::take_alerts())?;
                let body = page.text_of("body").unwrap_or_else(|e| {
                    debug!(attempt, error = %e, "page text unavailable");
                    String::new()
                });
                Ok::<_, PresensiError>(classify_feedback(
                    alert.as_str().unwrap_or_default(),
                    &body,
                ))
            })?;

        match outcome.value() {
            Some(Verdict {
                success: true,
                detail,
            }) => Ok(detail),
            Some(Verdict { detail, .. }) => Err(PresensiError::Rejected(detail)),
            None => {
                warn!("no confirmation after clicking, assuming success");
                Ok(NO_CONFIRMATION.to_string())
            }
        }
    }
}

pub fn wita_now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(WITA_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&offset)
}

pub fn notification_message(
    request: &PresensiRequest,
    outcome: &PresensiOutcome,
    at: DateTime<FixedOffset>,
) -> String {
    let (icon, status) = if outcome.success {
        ("✅", "BERHASIL")
    } else {
        ("❌", "GAGAL")
    };
    format!(
        "{icon} Presensi {} {status}\nWaktu: {} WITA\nNama: {}\nUnit: {}\nDetail: {}",
        outcome.action,
        at.format("%Y-%m-%d %H:%M:%S"),
        request.full_name,
        request.unit,
        outcome.detail,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use chrono::TimeZone;
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use crate::hands::LaunchMode;
    use crate::page::Script;

    #[derive(Default)]
    struct FormState {
        redirect: Option<String>,
        url: String,
        form_visible: bool,
        units: Vec<String>,
        selected_unit: String,
        typed: Vec<(String, String)>,
        clicks: Vec<String>,
        recorder: bool,
        alert_on_click: Option<String>,
        pending_alert: String,
        body: String,
        closes: u32,
    }

    /// In-memory attendance form.
    #[derive(Clone, Default)]
    struct FormPage(Rc<RefCell<FormState>>);

    impl FormPage {
        fn ready() -> Self {
            let page = Self::default();
            {
                let mut st = page.0.borrow_mut();
                st.form_visible = true;
                st.units = vec!["Pengembangan Aplikasi".into(), "Infrastruktur".into()];
            }
            page
        }
    }

    impl Page for FormPage {
        fn navigate(&self, url: &str) -> Result<()> {
            let mut st = self.0.borrow_mut();
            st.url = st.redirect.clone().unwrap_or_else(|| url.to_string());
            Ok(())
        }

        fn current_url(&self) -> Result<String> {
            Ok(self.0.borrow().url.clone())
        }

        fn title(&self) -> Result<String> {
            Ok("Presensi".into())
        }

        fn is_visible(&self, _selector: &str) -> Result<bool> {
            Ok(self.0.borrow().form_visible)
        }

        fn text_of(&self, _selector: &str) -> Result<String> {
            Ok(self.0.borrow().body.clone())
        }

        fn type_into(&self, selector: &str, text: &str) -> Result<()> {
            self.0.borrow_mut().typed.push((selector.into(), text.into()));
            Ok(())
        }

        fn click(&self, selector: &str) -> Result<()> {
            let mut st = self.0.borrow_mut();
            st.clicks.push(selector.into());
            if st.recorder {
                st.pending_alert = st.alert_on_click.clone().unwrap_or_default();
            }
            Ok(())
        }

        fn type_str(&self, _text: &str) -> Result<()> {
            Ok(())
        }

        fn press_key(&self, _key: &str) -> Result<()> {
            Ok(())
        }

        fn evaluate(&self, script: &Script) -> Result<Value> {
            let mut st = self.0.borrow_mut();
            match script.op {
                "select.by_text" => {
                    let wanted = script.arg_str("text").to_string();
                    let found = st.units.contains(&wanted);
                    if found {
                        st.selected_unit = wanted.clone();
                    }
                    Ok(json!({
                        "found": true,
                        "satisfied": found,
                        "source": "native-select",
                        "rawValue": wanted,
                    }))
                }
                "alerts.install" => {
                    st.recorder = true;
                    Ok(json!(true))
                }
                "alerts.take" => Ok(json!(std::mem::take(&mut st.pending_alert))),
                "dom.outline" => Ok(json!("(no active dialog)")),
                other => Err(anyhow!("unexpected script {other}")),
            }
        }

        fn screenshot_png(&self) -> Result<Vec<u8>> {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }

        fn page_source(&self) -> Result<String> {
            Ok("<html></html>".into())
        }

        fn pause(&self, _duration: Duration) {}
    }

    struct FormLauncher {
        page: FormPage,
        fails: bool,
    }

    impl Launcher for FormLauncher {
        type Page = FormPage;

        fn launch(&self, mode: LaunchMode) -> Result<FormPage> {
            if self.fails {
                return Err(anyhow!("{mode} launch refused"));
            }
            Ok(self.page.clone())
        }

        fn shutdown(&self, page: FormPage) {
            page.0.borrow_mut().closes += 1;
        }
    }

    fn runner(page: &FormPage, debug: &std::path::Path) -> PresensiRunner<FormLauncher> {
        let launcher = FormLauncher {
            page: page.clone(),
            fails: false,
        };
        PresensiRunner::new(launcher, true)
            .with_timings(PresensiTimings::instant())
            .with_diagnostics(Diagnostics::new(debug))
    }

    fn request(action: PresensiAction) -> PresensiRequest {
        PresensiRequest {
            url: "https://script.google.com/macros/s/abc/exec".into(),
            full_name: "Putu Ayu".into(),
            unit: "Pengembangan Aplikasi".into(),
            action,
        }
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn alerts_are_classified_before_page_text() {
        assert_eq!(
            classify_feedback("Presensi GAGAL: sudah absen", "berhasil"),
            Some(Verdict::new(false, "Alert: Presensi GAGAL: sudah absen"))
        );
        assert_eq!(
            classify_feedback("Presensi berhasil", ""),
            Some(Verdict::new(true, "Alert: Presensi berhasil"))
        );
        // unrecognised alert text counts as success
        assert_eq!(
            classify_feedback("Terima kasih", "error"),
            Some(Verdict::new(true, "Alert: Terima kasih"))
        );
    }

    #[test]
    fn page_text_is_classified_when_no_alert() {
        assert_eq!(
            classify_feedback("", "Data gagal disimpan"),
            Some(Verdict::new(false, "Failure message detected on page."))
        );
        assert_eq!(
            classify_feedback("  ", "Presensi SUKSES"),
            Some(Verdict::new(true, "Success message detected on page."))
        );
        assert_eq!(classify_feedback("", "Silakan isi nama"), None);
    }

    #[test]
    fn google_sign_in_is_detected() {
        assert!(is_google_redirect(
            "https://accounts.google.com/v3/signin/identifier?continue=x"
        ));
        assert!(is_google_redirect("https://script.google.com/ServiceLogin?signin=1"));
        assert!(!is_google_redirect("https://script.google.com/macros/s/abc/exec"));
    }

    #[test]
    fn redirect_check_reads_the_parsed_host() {
        assert!(is_google_redirect("https://user@ACCOUNTS.google.com:443/o/oauth2/auth"));
        assert!(!is_google_redirect("https://accounts.google.com.example.net/exec"));
        assert!(!is_google_redirect("https://script.google.com/exec?next=accounts.google.com"));
        assert!(!is_google_redirect("not a url"));
    }

    #[test]
    fn action_parsing_is_case_insensitive() {
        assert_eq!(" keluar ".parse::<PresensiAction>(), Ok(PresensiAction::Keluar));
        assert!("PULANG".parse::<PresensiAction>().is_err());
        assert_eq!(PresensiAction::Masuk.to_string(), "MASUK");
    }

    #[test]
    fn config_defaults_and_required_values() {
        let config = PresensiConfig::from_lookup(env(&[])).unwrap();
        assert!(config.enabled);
        assert!(!config.show_browser);
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.unit, DEFAULT_UNIT);
        assert!(matches!(
            config.request(),
            Err(ConfigError::Missing("PRESENSI_ACTION"))
        ));

        let config = PresensiConfig::from_lookup(env(&[
            ("PRESENSI_ACTION", "masuk"),
            ("PRESENSI_FULL_NAME", "Putu Ayu"),
        ]))
        .unwrap();
        let request = config.request().unwrap().unwrap();
        assert_eq!(request.action, PresensiAction::Masuk);
        assert_eq!(request.full_name, "Putu Ayu");
    }

    #[test]
    fn disabled_config_needs_nothing_else() {
        let config = PresensiConfig::from_lookup(env(&[("PRESENSI_ENABLED", "false")])).unwrap();
        assert_eq!(config.request().unwrap(), None);
    }

    #[test]
    fn invalid_action_is_a_config_error() {
        let err = PresensiConfig::from_lookup(env(&[("PRESENSI_ACTION", "pulang")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PRESENSI_ACTION", .. }));
    }

    #[test]
    fn successful_alert_completes_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let page = FormPage::ready();
        page.0.borrow_mut().alert_on_click = Some("Presensi MASUK berhasil".into());

        let outcome = runner(&page, dir.path()).submit(&request(PresensiAction::Masuk));

        assert!(outcome.success);
        assert_eq!(outcome.detail, "Alert: Presensi MASUK berhasil");
        assert!(outcome.artifacts.is_none());
        let st = page.0.borrow();
        assert_eq!(st.typed, vec![("#nama".to_string(), "Putu Ayu".to_string())]);
        assert_eq!(st.selected_unit, "Pengembangan Aplikasi");
        assert_eq!(st.clicks.len(), 1);
        assert!(st.clicks[0].contains("presensi('MASUK')"));
        assert_eq!(st.closes, 1);
    }

    #[test]
    fn no_signal_within_the_window_counts_as_success() {
        let dir = tempfile::tempdir().unwrap();
        let page = FormPage::ready();

        let outcome = runner(&page, dir.path()).submit(&request(PresensiAction::Keluar));

        assert!(outcome.success);
        assert_eq!(outcome.detail, NO_CONFIRMATION);
        assert!(page.0.borrow().clicks[0].contains("presensi('KELUAR')"));
    }

    #[test]
    fn failure_alert_fails_and_captures_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let page = FormPage::ready();
        page.0.borrow_mut().alert_on_click = Some("Gagal: nama tidak terdaftar".into());

        let outcome = runner(&page, dir.path()).submit(&request(PresensiAction::Masuk));

        assert!(!outcome.success);
        assert_eq!(outcome.detail, "Alert: Gagal: nama tidak terdaftar");
        let artifacts = outcome.artifacts.unwrap();
        assert!(
            artifacts
                .screenshot
                .unwrap()
                .to_string_lossy()
                .ends_with("_presensi_submission_failed.png")
        );
        assert_eq!(page.0.borrow().closes, 1);
    }

    #[test]
    fn sign_in_redirect_stops_before_the_form() {
        let dir = tempfile::tempdir().unwrap();
        let page = FormPage::ready();
        page.0.borrow_mut().redirect =
            Some("https://accounts.google.com/v3/signin/identifier".into());

        let outcome = runner(&page, dir.path()).submit(&request(PresensiAction::Masuk));

        assert!(!outcome.success);
        assert!(outcome.detail.contains("Google sign-in required"));
        assert!(outcome.artifacts.is_some());
        let st = page.0.borrow();
        assert!(st.typed.is_empty());
        assert!(st.clicks.is_empty());
        assert_eq!(st.closes, 1);
    }

    #[test]
    fn unknown_unit_is_reported_without_clicking() {
        let dir = tempfile::tempdir().unwrap();
        let page = FormPage::ready();
        let mut req = request(PresensiAction::Masuk);
        req.unit = "Keuangan".into();

        let outcome = runner(&page, dir.path()).submit(&req);

        assert!(!outcome.success);
        assert!(outcome.detail.contains("Keuangan"));
        assert!(page.0.borrow().clicks.is_empty());
    }

    #[test]
    fn hidden_form_is_a_driver_failure() {
        let dir = tempfile::tempdir().unwrap();
        let page = FormPage::ready();
        page.0.borrow_mut().form_visible = false;

        let outcome = runner(&page, dir.path()).submit(&request(PresensiAction::Masuk));

        assert!(!outcome.success);
        assert!(outcome.detail.starts_with("automation exception: #nama not visible"));
        assert_eq!(page.0.borrow().closes, 1);
    }

    #[test]
    fn launch_failure_skips_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = FormLauncher {
            page: FormPage::ready(),
            fails: true,
        };
        let outcome = PresensiRunner::new(launcher, true)
            .with_timings(PresensiTimings::instant())
            .with_diagnostics(Diagnostics::new(dir.path()))
            .submit(&request(PresensiAction::Masuk));

        assert!(!outcome.success);
        assert!(outcome.artifacts.is_none());
        assert_eq!(outcome.detail, "failed to initialize browser session");
    }

    #[test]
    fn notification_carries_wita_time_and_identity() {
        let wita = FixedOffset::east_opt(WITA_OFFSET_SECS).unwrap();
        let at = wita.with_ymd_and_hms(2026, 3, 2, 8, 1, 5).unwrap();
        let outcome = PresensiOutcome {
            action: PresensiAction::Masuk,
            success: false,
            detail: "Alert: Gagal".into(),
            artifacts: None,
        };

        let message = notification_message(&request(PresensiAction::Masuk), &outcome, at);
        assert_eq!(
            message,
            "❌ Presensi MASUK GAGAL\nWaktu: 2026-03-02 08:01:05 WITA\nNama: Putu Ayu\n\
             Unit: Pengembangan Aplikasi\nDetail: Alert: Gagal"
        );
        assert_eq!(wita_now().offset().local_minus_utc(), WITA_OFFSET_SECS);
    }
}
