//! In-memory simulation of the portal's dynamic report form.
//!
//! Answers [`Page`] calls and tagged scripts by `op`, with knobs for every
//! failure mode the engine has to survive. Clones share state, so a test can
//! keep a handle after the session has shut its copy down.

use anyhow::{Result, anyhow, bail};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::rc::Rc;

use crate::hands::{LaunchMode, Launcher};
use crate::page::{Page, Script};
use crate::selectors::SelectorTable;
use crate::types::{LocatorSource, trimmed_len};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginBehavior {
    /// Dashboard markers appear on the n-th check; the URL stays on /login.
    DashboardAfter(u32),
    /// URL leaves /login on the n-th check.
    RedirectAfter(u32),
    /// Error text appears on the n-th check.
    RejectAfter(u32, String),
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceKind {
    Absent,
    Native,
    Custom,
}

#[derive(Debug, Clone)]
pub struct PortalSetup {
    pub login: LoginBehavior,
    pub today_cell: bool,
    pub dialog_opens: bool,
    pub field_count: usize,
    /// Length cap after script assignment; `None` keeps the whole value.
    pub assign_cap: Option<usize>,
    pub keystroke_cap: Option<usize>,
    pub checkbox_strategies: Vec<LocatorSource>,
    pub checkbox_click_registers: bool,
    pub checkbox_force_works: bool,
    pub label_locator_checks: bool,
    pub attendance: AttendanceKind,
    pub attendance_required: bool,
    pub option_clickable: bool,
    /// Submit enables on the n-th candidate poll once gating is satisfied.
    pub submit_enabled_after: Option<u32>,
    pub native_submit_fails: bool,
    /// Clicks the portal ignores before one registers.
    pub ignored_clicks: u32,
    /// Dialog closes on the n-th open check after a registered click.
    pub dialog_closes_after: Option<u32>,
    pub errors: Vec<String>,
    pub invalid_hints: Vec<String>,
    pub screenshot_fails: bool,
    pub failing_ops: Vec<&'static str>,
}

impl PortalSetup {
    pub fn happy() -> Self {
        Self {
            login: LoginBehavior::DashboardAfter(1),
            today_cell: true,
            dialog_opens: true,
            field_count: 3,
            assign_cap: None,
            keystroke_cap: None,
            checkbox_strategies: vec![LocatorSource::LabelFor],
            checkbox_click_registers: true,
            checkbox_force_works: true,
            label_locator_checks: false,
            attendance: AttendanceKind::Custom,
            attendance_required: false,
            option_clickable: true,
            submit_enabled_after: Some(1),
            native_submit_fails: false,
            ignored_clicks: 0,
            dialog_closes_after: Some(1),
            errors: Vec::new(),
            invalid_hints: Vec::new(),
            screenshot_fails: false,
            failing_ops: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct PortalState {
    url: String,
    login_clicked: bool,
    login_checks: u32,
    dashboard: bool,
    rejected: bool,
    dialog_open: bool,
    fields: Vec<usize>,
    focused: Option<usize>,
    checked: bool,
    attendance_value: String,
    dropdown_open: bool,
    submit_polls: u32,
    submit_enabled: bool,
    clicks: u32,
    registered: bool,
    close_checks: u32,
    closes: u32,
    calls: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct FakePortal {
    setup: Rc<PortalSetup>,
    selectors: Rc<SelectorTable>,
    state: Rc<RefCell<PortalState>>,
}

impl FakePortal {
    pub fn new(setup: PortalSetup) -> Self {
        Self {
            setup: Rc::new(setup),
            selectors: Rc::new(SelectorTable::default()),
            state: Rc::new(RefCell::new(PortalState {
                url: "about:blank".into(),
                ..Default::default()
            })),
        }
    }

    /// Logged in with the report dialog already open.
    pub fn in_dialog(setup: PortalSetup) -> Self {
        let portal = Self::new(setup);
        {
            let mut st = portal.state.borrow_mut();
            st.url = format!("{}/dashboard", portal.selectors.base_url);
            st.dashboard = true;
            st.dialog_open = true;
            st.fields = vec![0; portal.setup.field_count];
        }
        portal
    }

    /// Details recorded for every call of `op`, in order.
    pub fn ops(&self, op: &str) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|(name, _)| name == op)
            .map(|(_, detail)| detail.clone())
            .collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.ops(op).len()
    }

    pub fn field_lengths(&self) -> Vec<usize> {
        self.state.borrow().fields.clone()
    }

    pub fn checked(&self) -> bool {
        self.state.borrow().checked
    }

    pub fn attendance_value(&self) -> String {
        self.state.borrow().attendance_value.clone()
    }

    pub fn dialog_open(&self) -> bool {
        self.state.borrow().dialog_open
    }

    pub fn clicks(&self) -> u32 {
        self.state.borrow().clicks
    }

    pub fn closes(&self) -> u32 {
        self.state.borrow().closes
    }

    pub fn set_checked(&self, checked: bool) {
        self.state.borrow_mut().checked = checked;
    }

    pub fn set_attendance(&self, value: &str) {
        self.state.borrow_mut().attendance_value = value.into();
    }

    fn record(&self, op: &str, detail: impl Into<String>) {
        self.state
            .borrow_mut()
            .calls
            .push((op.to_string(), detail.into()));
    }

    fn attendance_ok(st: &PortalState) -> bool {
        st.attendance_value.contains("hadir")
    }

    fn checkbox_found(&self, strategy: LocatorSource) -> bool {
        self.state.borrow().dialog_open && self.setup.checkbox_strategies.contains(&strategy)
    }

    fn checkbox_state(&self, strategy: LocatorSource) -> Value {
        if !self.checkbox_found(strategy) {
            return not_found();
        }
        json!({
            "found": true,
            "satisfied": self.state.borrow().checked,
            "source": strategy.as_str(),
            "rawValue": "confirm",
        })
    }

    fn attendance_state(&self) -> Value {
        let st = self.state.borrow();
        let source = match self.setup.attendance {
            AttendanceKind::Absent => return not_found(),
            AttendanceKind::Native => "native-select",
            AttendanceKind::Custom => "custom-dropdown",
        };
        json!({
            "found": true,
            "satisfied": Self::attendance_ok(&st),
            "source": source,
            "rawValue": st.attendance_value,
        })
    }

    fn register_click(&self) {
        let mut st = self.state.borrow_mut();
        if !st.submit_enabled {
            return;
        }
        st.clicks += 1;
        if st.clicks > self.setup.ignored_clicks {
            st.registered = true;
        }
    }

    fn advance_login(&self) {
        let mut st = self.state.borrow_mut();
        if !st.login_clicked {
            return;
        }
        st.login_checks += 1;
        let checks = st.login_checks;
        match &self.setup.login {
            LoginBehavior::DashboardAfter(n) if checks >= *n => st.dashboard = true,
            LoginBehavior::RedirectAfter(n) if checks >= *n => {
                st.url = format!("{}/dashboard", self.selectors.base_url);
                st.dashboard = true;
            }
            LoginBehavior::RejectAfter(n, _) if checks >= *n => st.rejected = true,
            _ => {}
        }
    }

    fn submit_candidates(&self) -> Value {
        let mut st = self.state.borrow_mut();
        if !st.dialog_open {
            return json!([]);
        }
        let gated = st.checked && (!self.setup.attendance_required || Self::attendance_ok(&st));
        if gated {
            st.submit_polls += 1;
        }
        st.submit_enabled = gated
            && self
                .setup
                .submit_enabled_after
                .is_some_and(|n| st.submit_polls >= n);
        let class = if st.submit_enabled {
            "v-btn bg-black"
        } else {
            "v-btn bg-black v-btn--disabled"
        };
        json!([{ "text": "simpan", "disabled": !st.submit_enabled, "class": class }])
    }

    fn dialog_state(&self) -> Value {
        let mut st = self.state.borrow_mut();
        if st.dialog_open && st.registered {
            st.close_checks += 1;
            if self
                .setup
                .dialog_closes_after
                .is_some_and(|n| st.close_checks >= n)
            {
                st.dialog_open = false;
            }
        }
        json!({ "open": st.dialog_open, "count": u32::from(st.dialog_open) })
    }
}

fn not_found() -> Value {
    json!({ "found": false, "satisfied": false, "source": "not-found", "rawValue": "" })
}

fn strategy_of(script: &Script) -> LocatorSource {
    serde_json::from_value(json!(script.arg_str("strategy"))).unwrap_or_default()
}

impl Page for FakePortal {
    fn navigate(&self, url: &str) -> Result<()> {
        self.record("navigate", url);
        self.state.borrow_mut().url = url.to_string();
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        self.record("current_url", "");
        self.advance_login();
        Ok(self.state.borrow().url.clone())
    }

    fn title(&self) -> Result<String> {
        Ok("MagangHub".into())
    }

    fn is_visible(&self, selector: &str) -> Result<bool> {
        let s = &self.selectors;
        let st = self.state.borrow();
        let on_login = st.url.contains("/login") && !st.dashboard;
        Ok(if selector == s.username_input
            || selector == s.password_input
            || selector == s.login_button
        {
            on_login
        } else if selector == s.dashboard_markers {
            st.dashboard
        } else if selector == s.login_error {
            st.rejected
        } else if selector == s.calendar_today_cell {
            st.dashboard && self.setup.today_cell
        } else if selector == s.text_field {
            st.dialog_open && self.setup.field_count > 0
        } else if s.attendance_option_locators.iter().any(|l| l == selector) {
            st.dropdown_open
        } else {
            false
        })
    }

    fn text_of(&self, selector: &str) -> Result<String> {
        match &self.setup.login {
            LoginBehavior::RejectAfter(_, message)
                if selector == self.selectors.login_error && self.state.borrow().rejected =>
            {
                Ok(message.clone())
            }
            _ => Ok(String::new()),
        }
    }

    fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        self.record("type_into", format!("{selector}={}", text.len()));
        Ok(())
    }

    fn click(&self, selector: &str) -> Result<()> {
        self.record("click", selector);
        let s = Rc::clone(&self.selectors);
        if selector == s.login_button {
            self.state.borrow_mut().login_clicked = true;
        } else if selector == s.calendar_today_cell {
            if !self.is_visible(selector)? {
                bail!("today cell not rendered");
            }
            if self.setup.dialog_opens {
                let mut st = self.state.borrow_mut();
                st.dialog_open = true;
                st.fields = vec![0; self.setup.field_count];
            }
        } else if let Some(index) = selector
            .strip_prefix("[data-autoabsen=\"field-")
            .and_then(|rest| rest.strip_suffix("\"]"))
        {
            self.state.borrow_mut().focused = index.parse().ok();
        } else if selector.starts_with("[data-autoabsen=\"submit-") {
            if self.setup.native_submit_fails {
                bail!("element not interactable");
            }
            self.register_click();
        } else if s.confirm_label_locators.iter().any(|l| l == selector) {
            if !self.setup.label_locator_checks {
                bail!("no label matches {selector}");
            }
            self.state.borrow_mut().checked = true;
        } else if s.attendance_option_locators.iter().any(|l| l == selector) {
            let mut st = self.state.borrow_mut();
            if !st.dropdown_open || !self.setup.option_clickable {
                bail!("option not interactable");
            }
            st.attendance_value = "hadir".into();
            st.dropdown_open = false;
        } else {
            bail!("no element matches {selector}");
        }
        Ok(())
    }

    fn type_str(&self, text: &str) -> Result<()> {
        let mut st = self.state.borrow_mut();
        let Some(index) = st.focused else {
            bail!("nothing focused");
        };
        let length = trimmed_len(text).min(self.setup.keystroke_cap.unwrap_or(usize::MAX));
        if let Some(slot) = st.fields.get_mut(index) {
            *slot = length;
        }
        Ok(())
    }

    fn press_key(&self, key: &str) -> Result<()> {
        self.record("press_key", key);
        let mut st = self.state.borrow_mut();
        if key == "Delete" {
            if let Some(index) = st.focused {
                if let Some(slot) = st.fields.get_mut(index) {
                    *slot = 0;
                }
            }
        } else if key == "Tab" {
            st.focused = None;
        }
        Ok(())
    }

    fn evaluate(&self, script: &Script) -> Result<Value> {
        let detail = match script.op {
            "checkbox.inspect" | "checkbox.click" | "checkbox.force" => {
                script.arg_str("strategy").to_string()
            }
            _ => script
                .arg_usize("index")
                .map(|i| i.to_string())
                .unwrap_or_default(),
        };
        self.record(script.op, detail);
        if self.setup.failing_ops.contains(&script.op) {
            return Err(anyhow!("script {} threw", script.op));
        }

        let index = script.arg_usize("index").unwrap_or(usize::MAX);
        Ok(match script.op {
            "dialog.open" => self.dialog_state(),
            "fields.resolve" => {
                let st = self.state.borrow();
                json!({ "count": if st.dialog_open { st.fields.len() } else { 0 } })
            }
            "field.assign" => {
                let mut st = self.state.borrow_mut();
                let cap = self.setup.assign_cap.unwrap_or(usize::MAX);
                match st.fields.get_mut(index) {
                    Some(slot) => {
                        *slot = trimmed_len(script.arg_str("value")).min(cap);
                        json!({ "found": true })
                    }
                    None => json!({ "found": false }),
                }
            }
            "field.select" => {
                let mut st = self.state.borrow_mut();
                let found = index < st.fields.len();
                if found {
                    st.focused = Some(index);
                }
                json!({ "found": found })
            }
            "field.length" => match self.state.borrow().fields.get(index) {
                Some(length) => json!({ "found": true, "length": length }),
                None => json!({ "found": false, "length": 0 }),
            },
            "checkbox.inspect" => self.checkbox_state(strategy_of(script)),
            "checkbox.click" => {
                let strategy = strategy_of(script);
                if self.checkbox_found(strategy) && self.setup.checkbox_click_registers {
                    self.state.borrow_mut().checked = true;
                }
                self.checkbox_state(strategy)
            }
            "checkbox.force" => {
                let strategy = strategy_of(script);
                if self.checkbox_found(strategy) && self.setup.checkbox_force_works {
                    self.state.borrow_mut().checked = true;
                }
                self.checkbox_state(strategy)
            }
            "attendance.native" => {
                if self.setup.attendance != AttendanceKind::Native {
                    return Ok(not_found());
                }
                self.state.borrow_mut().attendance_value = "hadir".into();
                self.attendance_state()
            }
            "attendance.open" => {
                if self.setup.attendance != AttendanceKind::Custom {
                    return Ok(not_found());
                }
                self.state.borrow_mut().dropdown_open = true;
                json!({
                    "found": true,
                    "satisfied": false,
                    "source": "custom-dropdown",
                    "rawValue": "",
                })
            }
            "attendance.read" => self.attendance_state(),
            "submit.candidates" => self.submit_candidates(),
            "submit.click" => {
                self.register_click();
                json!({ "clicked": true })
            }
            "feedback.collect" => json!({
                "errors": self.setup.errors,
                "invalidHints": self.setup.invalid_hints,
            }),
            "dom.outline" => json!(
                "dialog v-dialog\ntextarea type=textarea len=0\nbutton \"simpan\" disabled"
            ),
            "alerts.install" => json!(true),
            "alerts.take" => json!(""),
            other => bail!("unexpected script {other}"),
        })
    }

    fn screenshot_png(&self) -> Result<Vec<u8>> {
        if self.setup.screenshot_fails {
            bail!("screenshot timed out");
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    fn page_source(&self) -> Result<String> {
        Ok("<html><body><div class=\"v-dialog\"></div></body></html>".into())
    }

    fn pause(&self, _duration: std::time::Duration) {}
}

/// Hands out clones of one shared portal, failing the listed modes.
pub struct FakeLauncher {
    portal: FakePortal,
    fail_modes: Vec<LaunchMode>,
    attempts: RefCell<Vec<LaunchMode>>,
}

impl FakeLauncher {
    pub fn new(setup: PortalSetup) -> Self {
        Self {
            portal: FakePortal::new(setup),
            fail_modes: Vec::new(),
            attempts: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(mut self, modes: &[LaunchMode]) -> Self {
        self.fail_modes = modes.to_vec();
        self
    }

    pub fn portal(&self) -> FakePortal {
        self.portal.clone()
    }

    pub fn attempts(&self) -> Vec<LaunchMode> {
        self.attempts.borrow().clone()
    }
}

impl Launcher for FakeLauncher {
    type Page = FakePortal;

    fn launch(&self, mode: LaunchMode) -> Result<FakePortal> {
        self.attempts.borrow_mut().push(mode);
        if self.fail_modes.contains(&mode) {
            bail!("chrome exited during {mode} launch");
        }
        Ok(self.portal.clone())
    }

    fn shutdown(&self, page: FakePortal) {
        page.state.borrow_mut().closes += 1;
    }
}
