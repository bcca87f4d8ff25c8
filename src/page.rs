//! The browser surface the engine drives.
//!
//! Engine components only see the [`Page`] trait. [`ChromePage`] implements
//! it over a live `headless_chrome` tab; tests plug in a simulated portal.

use anyhow::{Result, anyhow};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, Element, Tab};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::poll::Poll;
use crate::selectors::is_xpath;

/// An injected page script tagged with the operation it performs.
///
/// `body` runs inside a function with `args` bound to the JSON arguments and
/// must `return` a JSON-serialisable value.
#[derive(Debug, Clone)]
pub struct Script {
    pub op: &'static str,
    pub args: Value,
    pub body: String,
}

impl Script {
    pub fn new(op: &'static str, args: Value, body: impl Into<String>) -> Self {
        Self {
            op,
            args,
            body: body.into(),
        }
    }

    /// Expression evaluated in the page: the result is stringified so it
    /// survives the CDP round trip by value.
    pub fn expression(&self) -> String {
        format!(
            "JSON.stringify((function() {{ const args = {}; {} }})())",
            self.args, self.body
        )
    }

    pub fn arg_str(&self, key: &str) -> &str {
        self.args.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn arg_usize(&self, key: &str) -> Option<usize> {
        self.args
            .get(key)
            .and_then(Value::as_u64)
            .map(|n| n as usize)
    }
}

pub trait Page {
    fn navigate(&self, url: &str) -> Result<()>;
    fn current_url(&self) -> Result<String>;
    fn title(&self) -> Result<String>;

    /// True when at least one element matching `selector` is rendered visibly.
    fn is_visible(&self, selector: &str) -> Result<bool>;
    /// Trimmed text of the first visible match, empty when nothing matches.
    fn text_of(&self, selector: &str) -> Result<String>;

    /// Clear the matched input and type `text` into it.
    fn type_into(&self, selector: &str, text: &str) -> Result<()>;
    /// Native click on the first match; fails when the element is not interactable.
    fn click(&self, selector: &str) -> Result<()>;
    /// Type into whatever currently has focus.
    fn type_str(&self, text: &str) -> Result<()>;
    fn press_key(&self, key: &str) -> Result<()>;

    fn evaluate(&self, script: &Script) -> Result<Value>;

    fn screenshot_png(&self) -> Result<Vec<u8>>;
    fn page_source(&self) -> Result<String>;

    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Wait until `selector` is visible, checking every 250 ms.
    fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let step = Duration::from_millis(250);
        let attempts = (timeout.as_millis() / step.as_millis()).max(1) as u32;
        let outcome = Poll::new(step, attempts).until(|_| {
            Ok::<_, anyhow::Error>(self.is_visible(selector)?.then_some(()))
        })?;
        outcome
            .value()
            .ok_or_else(|| anyhow!("{selector} not visible after {timeout:?}"))
    }
}

/// Shared lookup helper: resolves CSS or XPath and filters to visible nodes.
pub const QUERY_HELPERS: &str = r#"
const __isXPath = (sel) => /^\s*[\/(]/.test(sel);
const __all = (sel, root) => {
  root = root || document;
  if (!__isXPath(sel)) return Array.from(root.querySelectorAll(sel));
  const snap = document.evaluate(sel, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
  const out = [];
  for (let i = 0; i < snap.snapshotLength; i++) out.push(snap.snapshotItem(i));
  return out;
};
const __visible = (el) => {
  if (!el || !el.getBoundingClientRect) return false;
  const rect = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  return rect.width > 0 && rect.height > 0 && style.display !== 'none' && style.visibility !== 'hidden';
};
"#;

/// Live Chrome tab plus the browser that owns it. Dropping it shuts Chrome down.
pub struct ChromePage {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(browser: Browser, tab: Arc<Tab>) -> Self {
        Self {
            _browser: browser,
            tab,
        }
    }

    fn find(&self, selector: &str) -> Result<Element<'_>> {
        if is_xpath(selector) {
            self.tab.find_element_by_xpath(selector)
        } else {
            self.tab.find_element(selector)
        }
    }

    fn eval_helper(&self, op: &'static str, selector: &str, body: &str) -> Result<Value> {
        let script = Script::new(
            op,
            json!({ "selector": selector }),
            format!("{}\n{}", QUERY_HELPERS, body),
        );
        self.evaluate(&script)
    }
}

impl Page for ChromePage {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab.navigate_to(url)?;
        self.tab.wait_until_navigated()?;
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        let result = self.tab.evaluate("window.location.href", false)?;
        Ok(result
            .value
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| self.tab.get_url()))
    }

    fn title(&self) -> Result<String> {
        self.tab.get_title()
    }

    fn is_visible(&self, selector: &str) -> Result<bool> {
        let value = self.eval_helper(
            "selector.visible",
            selector,
            "return __all(args.selector).some(__visible);",
        )?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn text_of(&self, selector: &str) -> Result<String> {
        let value = self.eval_helper(
            "selector.text",
            selector,
            "const el = __all(args.selector).find(__visible); return el ? (el.innerText || el.textContent || '').trim() : '';",
        )?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn type_into(&self, selector: &str, text: &str) -> Result<()> {
        let element = self.find(selector)?;
        element.click()?;
        element.call_js_fn(
            "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }",
            vec![],
            false,
        )?;
        self.tab.type_str(text)?;
        Ok(())
    }

    fn click(&self, selector: &str) -> Result<()> {
        self.find(selector)?.click()?;
        Ok(())
    }

    fn type_str(&self, text: &str) -> Result<()> {
        self.tab.type_str(text)?;
        Ok(())
    }

    fn press_key(&self, key: &str) -> Result<()> {
        self.tab.press_key(key)?;
        Ok(())
    }

    fn evaluate(&self, script: &Script) -> Result<Value> {
        let result = self.tab.evaluate(&script.expression(), false)?;
        let raw = result
            .value
            .and_then(|v| v.as_str().map(String::from))
            .ok_or_else(|| anyhow!("script {} returned no value", script.op))?;
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("script {} returned bad JSON: {e}", script.op))
    }

    fn screenshot_png(&self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
    }

    fn page_source(&self) -> Result<String> {
        self.tab.get_content()
    }
}
