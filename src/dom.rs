//! Scripts injected into the portal page.
//!
//! Each builder returns a tagged [`Script`]. Every in-dialog script first
//! scopes itself to the active overlay (falling back to the document) and
//! filters candidates to rendered, unobscured elements, because the portal
//! keeps hidden copies of its controls around.
//!
//! Controls picked for a later native click are tagged with a
//! `data-autoabsen` attribute, re-assigned on every resolution.

use anyhow::Result;
use serde_json::{Value, json};

use crate::page::{Page, Script};
use crate::selectors::SelectorTable;
use crate::types::{DOM_OUTLINE_MAX_CHARS, LocatorSource};

const PRELUDE: &str = r#"
const norm = (text) => (text || '').toLowerCase().replace(/\s+/g, ' ').trim();
const visible = (el) => {
  if (!el || !el.getBoundingClientRect) return false;
  const rect = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  return rect.width > 0 && rect.height > 0 && style.display !== 'none' && style.visibility !== 'hidden';
};
const unobscured = (el) => {
  const rect = el.getBoundingClientRect();
  const x = rect.left + rect.width / 2;
  const y = rect.top + rect.height / 2;
  if (x < 0 || y < 0 || x > window.innerWidth || y > window.innerHeight) return true;
  const hit = document.elementFromPoint(x, y);
  if (!hit || hit === el || el.contains(hit) || hit.contains(el)) return true;
  const owner = el.closest('label, button, .v-input, .v-field, .v-selection-control');
  return !!owner && owner.contains(hit);
};
const usable = (el) => visible(el) && unobscured(el);
const activeDialog = () => {
  const open = Array.from(document.querySelectorAll(args.activeDialog)).filter(visible);
  const withFields = open.filter((el) => Array.from(el.querySelectorAll(args.textField)).some(visible));
  const pool = withFields.length ? withFields : open;
  return pool.length ? pool[pool.length - 1] : null;
};
const scope = () => activeDialog() || document;
const mark = (el, name) => { el.setAttribute('data-autoabsen', name); return el; };
const clearMarks = (prefix) => {
  document.querySelectorAll('[data-autoabsen^="' + prefix + '"]').forEach((el) => el.removeAttribute('data-autoabsen'));
};
const fire = (el, names) => names.forEach((name) => el.dispatchEvent(new Event(name, { bubbles: true })));
const notFound = () => ({ found: false, satisfied: false, source: 'not-found', rawValue: '' });
const hasKeyword = (el, keywords) => keywords.some((key) => norm(el.textContent).includes(key));
"#;

const FIELDS: &str = r#"
const visibleFields = () => Array.from(scope().querySelectorAll(args.textField)).filter(usable);
const fieldAt = (index) => {
  const tagged = document.querySelector('[data-autoabsen="field-' + index + '"]');
  if (tagged && tagged.isConnected && visible(tagged)) return tagged;
  return Array.from(scope().querySelectorAll(args.textField)).filter(visible)[index] || null;
};
const setValue = (el, value) => {
  const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
  const setter = Object.getOwnPropertyDescriptor(proto, 'value');
  if (setter && setter.set) setter.set.call(el, value); else el.value = value;
};
"#;

const CHECKBOX: &str = r#"
const findCheckbox = (strategy) => {
  const root = scope();
  const labels = Array.from(root.querySelectorAll('label'))
    .filter((label) => visible(label) && hasKeyword(label, args.keywords));
  if (strategy === 'label-for') {
    for (const label of labels) {
      const forId = label.getAttribute('for');
      if (!forId) continue;
      let input = null;
      try { input = root.querySelector('#' + CSS.escape(forId)); } catch (e) {}
      if (!input) {
        const byDoc = document.getElementById(forId);
        if (byDoc && (root === document || root.contains(byDoc))) input = byDoc;
      }
      if (input && input.type === 'checkbox') return { input, label };
    }
    return null;
  }
  if (strategy === 'label-parent') {
    for (const label of labels) {
      const input = (label.parentElement || root).querySelector('input[type="checkbox"]');
      if (input) return { input, label };
    }
    return null;
  }
  if (strategy === 'single-control') {
    const all = Array.from(root.querySelectorAll('input[type="checkbox"]'))
      .filter((el) => visible(el) || visible(el.closest(args.wrappers + ', .v-input')));
    return all.length === 1 ? { input: all[0], label: null } : null;
  }
  return null;
};
const stateOf = (hit) => hit
  ? { found: true, satisfied: !!hit.input.checked, source: args.strategy, rawValue: hit.input.id || '' }
  : notFound();
"#;

const ATTENDANCE: &str = r#"
const findNativeSelect = () => {
  const root = scope();
  const selects = Array.from(root.querySelectorAll('select'));
  const labelled = selects.find((select) => {
    let label = null;
    if (select.id) {
      try { label = root.querySelector('label[for="' + CSS.escape(select.id) + '"]'); } catch (e) {}
    }
    label = label || select.closest('label, .v-input, .form-group');
    return !!label && hasKeyword(label, args.keywords);
  });
  return labelled || (selects.length === 1 ? selects[0] : null);
};
const stripKeywords = (value) => args.keywords.reduce((acc, key) => acc.split(key).join(' '), value);
const want = norm(args.option);
"#;

fn with(parts: &[&str], body: &str) -> String {
    let mut out = String::from(PRELUDE);
    for part in parts {
        out.push_str(part);
    }
    out.push_str(body);
    out
}

/// Arguments every scoped script needs, merged with `extra`.
fn scoped(selectors: &SelectorTable, extra: Value) -> Value {
    let mut args = json!({
        "activeDialog": selectors.active_dialog,
        "textField": selectors.text_field,
    });
    if let (Some(base), Value::Object(more)) = (args.as_object_mut(), extra) {
        base.extend(more);
    }
    args
}

pub fn field_marker(index: usize) -> String {
    format!("[data-autoabsen=\"field-{index}\"]")
}

pub fn submit_marker(index: usize) -> String {
    format!("[data-autoabsen=\"submit-{index}\"]")
}

/// `{open, count}`: whether any visible container looks like the report dialog.
pub fn report_dialog_open(selectors: &SelectorTable) -> Script {
    Script::new(
        "dialog.open",
        scoped(
            selectors,
            json!({
                "dialogContainer": selectors.dialog_container,
                "phrases": selectors.report_dialog_phrases,
            }),
        ),
        with(
            &[],
            r#"
const containers = Array.from(document.querySelectorAll(args.dialogContainer + ', ' + args.activeDialog)).filter(visible);
const isReport = (el) => Array.from(el.querySelectorAll(args.textField)).some(visible) || hasKeyword(el, args.phrases);
const open = containers.filter(isReport);
return { open: open.length > 0, count: open.length };
"#,
        ),
    )
}

/// `{count}`: visible report text fields, tagged `field-N` in layout order.
/// Later field scripts find their target by that tag, so focus or scroll
/// side effects cannot shift which field an index names.
pub fn resolve_fields(selectors: &SelectorTable) -> Script {
    Script::new(
        "fields.resolve",
        scoped(selectors, json!({})),
        with(
            &[FIELDS],
            r#"
clearMarks('field-');
const fields = visibleFields();
fields.forEach((el, i) => mark(el, 'field-' + i));
return { count: fields.length };
"#,
        ),
    )
}

/// Direct value assignment plus synthetic input/change/blur notifications.
pub fn assign_field(selectors: &SelectorTable, index: usize, value: &str) -> Script {
    Script::new(
        "field.assign",
        scoped(selectors, json!({ "index": index, "value": value })),
        with(
            &[FIELDS],
            r#"
const el = fieldAt(args.index);
if (!el) return { found: false };
el.scrollIntoView({ block: 'center' });
el.focus();
setValue(el, '');
fire(el, ['input']);
setValue(el, args.value);
fire(el, ['input', 'change']);
el.blur();
fire(el, ['blur']);
return { found: true };
"#,
        ),
    )
}

/// Focus the field and select its whole content ahead of keystroke entry.
pub fn select_field(selectors: &SelectorTable, index: usize) -> Script {
    Script::new(
        "field.select",
        scoped(selectors, json!({ "index": index })),
        with(
            &[FIELDS],
            r#"
const el = fieldAt(args.index);
if (!el) return { found: false };
el.scrollIntoView({ block: 'center' });
el.focus();
if (el.select) el.select();
return { found: true };
"#,
        ),
    )
}

/// `{found, length}` of a freshly resolved field's trimmed value.
pub fn field_length(selectors: &SelectorTable, index: usize) -> Script {
    Script::new(
        "field.length",
        scoped(selectors, json!({ "index": index })),
        with(
            &[FIELDS],
            r#"
const el = fieldAt(args.index);
if (!el) return { found: false, length: 0 };
return { found: true, length: Array.from((el.value || '').trim()).length };
"#,
        ),
    )
}

fn checkbox_args(selectors: &SelectorTable, strategy: LocatorSource) -> Value {
    scoped(
        selectors,
        json!({
            "strategy": strategy.as_str(),
            "keywords": selectors.confirm_keywords,
            "wrappers": selectors.checkbox_wrappers,
        }),
    )
}

pub fn checkbox_inspect(selectors: &SelectorTable, strategy: LocatorSource) -> Script {
    Script::new(
        "checkbox.inspect",
        checkbox_args(selectors, strategy),
        with(&[CHECKBOX], "return stateOf(findCheckbox(args.strategy));"),
    )
}

/// Click label, then the styled wrapper, then the input until it registers.
pub fn checkbox_click(selectors: &SelectorTable, strategy: LocatorSource) -> Script {
    Script::new(
        "checkbox.click",
        checkbox_args(selectors, strategy),
        with(
            &[CHECKBOX],
            r#"
const hit = findCheckbox(args.strategy);
if (!hit) return notFound();
const control = hit.input.closest('.v-selection-control') || hit.input.closest('.v-input');
const wrapper = control ? control.querySelector(args.wrappers) : null;
for (const target of [hit.label, wrapper, hit.input].filter(Boolean)) {
  if (hit.input.checked) break;
  target.click();
}
return stateOf(hit);
"#,
        ),
    )
}

/// Force `checked` with synthetic events when clicks did not register.
pub fn checkbox_force(selectors: &SelectorTable, strategy: LocatorSource) -> Script {
    Script::new(
        "checkbox.force",
        checkbox_args(selectors, strategy),
        with(
            &[CHECKBOX],
            r#"
const hit = findCheckbox(args.strategy);
if (!hit) return notFound();
if (!hit.input.checked) {
  hit.input.checked = true;
  fire(hit.input, ['input', 'change']);
}
return stateOf(hit);
"#,
        ),
    )
}

fn attendance_args(selectors: &SelectorTable) -> Value {
    scoped(
        selectors,
        json!({
            "keywords": selectors.attendance_keywords,
            "option": selectors.attendance_option,
            "blocks": selectors.attendance_blocks,
            "trigger": selectors.attendance_trigger,
            "display": selectors.attendance_display,
        }),
    )
}

/// Set a native `<select>` to the wanted option. `found` is false when the
/// control is not a native selection list.
pub fn attendance_native(selectors: &SelectorTable) -> Script {
    Script::new(
        "attendance.native",
        attendance_args(selectors),
        with(
            &[ATTENDANCE],
            r#"
const select = findNativeSelect();
if (!select) return notFound();
const options = Array.from(select.options || []);
const target = options.find((o) => norm(o.textContent) === want)
  || options.find((o) => norm(o.textContent).startsWith(want))
  || options.find((o) => norm(o.textContent).includes(want));
if (!target) return { found: true, satisfied: false, source: 'native-select', rawValue: '' };
select.value = target.value;
if (select.value !== target.value) target.selected = true;
fire(select, ['input', 'change']);
const chosen = options[select.selectedIndex] ? norm(options[select.selectedIndex].textContent) : '';
return { found: true, satisfied: chosen.includes(want), source: 'native-select', rawValue: chosen };
"#,
        ),
    )
}

/// Open the custom dropdown with a pointer sequence on its trigger.
pub fn attendance_open(selectors: &SelectorTable) -> Script {
    Script::new(
        "attendance.open",
        attendance_args(selectors),
        with(
            &[ATTENDANCE],
            r#"
const root = scope();
const label = Array.from(root.querySelectorAll('label, .v-label'))
  .filter(visible)
  .find((el) => hasKeyword(el, args.keywords));
let container = null;
if (label) container = label.closest('.v-input') || (label.parentElement || root).querySelector(args.blocks);
if (!container) container = Array.from(root.querySelectorAll(args.blocks)).find((el) => hasKeyword(el, args.keywords));
if (!container) return notFound();
const target = container.querySelector(args.trigger) || container;
target.scrollIntoView({ block: 'center' });
['pointerdown', 'mousedown', 'pointerup', 'mouseup', 'click'].forEach((name) => {
  const Ctor = name.startsWith('pointer') && window.PointerEvent ? PointerEvent : MouseEvent;
  target.dispatchEvent(new Ctor(name, { bubbles: true, cancelable: true, view: window }));
});
return { found: true, satisfied: false, source: 'custom-dropdown', rawValue: '' };
"#,
        ),
    )
}

/// Read back the displayed or typed attendance value.
pub fn attendance_read(selectors: &SelectorTable) -> Script {
    Script::new(
        "attendance.read",
        attendance_args(selectors),
        with(
            &[ATTENDANCE],
            r#"
const select = findNativeSelect();
if (select) {
  const opt = select.options[select.selectedIndex];
  const value = opt ? norm(opt.textContent) : '';
  return { found: true, satisfied: value.includes(want), source: 'native-select', rawValue: value };
}
const root = scope();
const block = Array.from(root.querySelectorAll(args.blocks + ', label, .v-label')).find((el) => hasKeyword(el, args.keywords));
if (!block) return notFound();
const container = block.closest('.v-input') || block.parentElement || block;
const typed = container.querySelector('input:not([type="hidden"])');
const display = container.querySelector(args.display) || typed || container;
const value = norm(typed && typed.value ? typed.value : display.textContent);
// the field label itself contains the option word ("kehadiran" / "hadir")
return { found: true, satisfied: norm(stripKeywords(value)).includes(want), source: 'custom-dropdown', rawValue: value };
"#,
        ),
    )
}

/// Submit candidates `[{text, disabled, class}]`, tagged `submit-N`.
pub fn submit_candidates(selectors: &SelectorTable) -> Script {
    Script::new(
        "submit.candidates",
        scoped(
            selectors,
            json!({
                "keywords": selectors.submit_keywords,
                "marker": selectors.submit_style_marker,
                "disabledClass": selectors.disabled_class,
            }),
        ),
        with(
            &[],
            r#"
clearMarks('submit-');
const out = [];
Array.from(scope().querySelectorAll('button')).filter(usable).forEach((button) => {
  const text = norm(button.textContent);
  const cls = (button.getAttribute('class') || '').toLowerCase();
  const byKeyword = args.keywords.some((key) => text.includes(key));
  if (!byKeyword && !(args.marker && cls.includes(args.marker))) return;
  const disabled = button.disabled
    || button.hasAttribute('disabled')
    || button.getAttribute('aria-disabled') === 'true'
    || cls.includes(args.disabledClass);
  mark(button, 'submit-' + out.length);
  out.push({ text: text.slice(0, 60), disabled, class: cls.slice(0, 120) });
});
return out;
"#,
        ),
    )
}

/// Programmatic click on a tagged submit candidate.
pub fn submit_click(index: usize) -> Script {
    Script::new(
        "submit.click",
        json!({ "index": index }),
        r#"
const el = document.querySelector('[data-autoabsen="submit-' + args.index + '"]');
if (!el) return { clicked: false };
el.scrollIntoView({ block: 'center' });
el.click();
return { clicked: true };
"#,
    )
}

/// `{errors, invalidHints}` visible in the active dialog.
pub fn collect_feedback(selectors: &SelectorTable) -> Script {
    Script::new(
        "feedback.collect",
        scoped(
            selectors,
            json!({
                "validationErrors": selectors.validation_errors,
                "invalidInputs": selectors.invalid_inputs,
            }),
        ),
        with(
            &[],
            r#"
const root = scope();
const errors = Array.from(root.querySelectorAll(args.validationErrors))
  .filter(visible)
  .map((el) => (el.innerText || el.textContent || '').trim())
  .filter(Boolean);
const invalid = Array.from(root.querySelectorAll(args.invalidInputs)).map((el) => {
  const input = el.matches('input, textarea, select') ? el : el.querySelector('input, textarea, select');
  const owner = el.closest('.v-input') || el;
  const label = owner.querySelector('label, .v-label');
  return norm((label && label.textContent) || (input && (input.name || input.id || input.placeholder)) || el.tagName);
}).filter(Boolean);
return { errors: [...new Set(errors)].slice(0, 20), invalidHints: [...new Set(invalid)].slice(0, 20) };
"#,
        ),
    )
}

/// Compact one-line-per-control outline of the active dialog.
pub fn dialog_outline(selectors: &SelectorTable) -> Script {
    Script::new(
        "dom.outline",
        scoped(selectors, json!({})),
        with(
            &[],
            r#"
const root = scope();
const lines = [root === document ? '(no active dialog)' : 'dialog ' + (root.className || root.tagName)];
const controls = Array.from(root.querySelectorAll('a, button, input, textarea, select, label'));
for (const el of controls) {
  if (!visible(el) && el.type !== 'checkbox') continue;
  const tag = el.tagName.toLowerCase();
  let desc = tag;
  if (tag === 'input' || tag === 'textarea') {
    desc += ' type=' + (el.type || 'text');
    if (el.name) desc += ' name=' + el.name;
    if (el.type === 'checkbox') desc += ' checked=' + !!el.checked;
    else desc += ' len=' + (el.value || '').trim().length;
  } else if (tag === 'select') {
    const opt = el.options[el.selectedIndex];
    desc += ' selected="' + (opt ? opt.textContent.trim() : '') + '"';
  } else {
    desc += ' "' + norm(el.textContent).slice(0, 60) + '"';
  }
  if (el.disabled || el.getAttribute('aria-disabled') === 'true') desc += ' disabled';
  lines.push(desc);
}
return lines.join('\n');
"#,
        ),
    )
}

/// Capture the dialog outline, truncated to a fixed budget.
pub fn capture_dialog_outline<P: Page>(page: &P, selectors: &SelectorTable) -> Result<String> {
    let value = page.evaluate(&dialog_outline(selectors))?;
    let raw = value.as_str().unwrap_or_default();
    Ok(truncate_outline(raw))
}

fn truncate_outline(raw: &str) -> String {
    let total = raw.chars().count();
    if total <= DOM_OUTLINE_MAX_CHARS {
        return raw.to_string();
    }
    let head: String = raw.chars().take(DOM_OUTLINE_MAX_CHARS).collect();
    format!("{head}\n... [truncated, {total} total chars]")
}

/// Replace `alert`/`confirm` with a recorder so feedback text can be read back.
pub fn install_alert_recorder() -> Script {
    Script::new(
        "alerts.install",
        json!({}),
        r#"
if (!window.__autoabsenAlerts) {
  window.__autoabsenAlerts = [];
  const record = (message) => window.__autoabsenAlerts.push(String(message == null ? '' : message));
  window.alert = (message) => { record(message); };
  window.confirm = (message) => { record(message); return true; };
}
return true;
"#,
    )
}

/// Drain recorded alert texts, newline separated.
pub fn take_alerts() -> Script {
    Script::new(
        "alerts.take",
        json!({}),
        r#"
const taken = (window.__autoabsenAlerts || []).splice(0);
return taken.join('\n').trim();
"#,
    )
}

/// Pick the `<select>` option whose visible text equals `text`.
pub fn select_option_by_text(selector: &str, text: &str) -> Script {
    Script::new(
        "select.by_text",
        json!({ "selector": selector, "text": text }),
        with(
            &[],
            r#"
const select = document.querySelector(args.selector);
if (!select) return notFound();
const wanted = norm(args.text);
const option = Array.from(select.options || []).find((o) => norm(o.textContent) === wanted);
if (!option) return { found: true, satisfied: false, source: 'native-select', rawValue: '' };
select.value = option.value;
fire(select, ['input', 'change']);
return { found: true, satisfied: true, source: 'native-select', rawValue: option.textContent.trim() };
"#,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_args_carry_dialog_scope_and_extras() {
        let selectors = SelectorTable::default();
        let script = checkbox_inspect(&selectors, LocatorSource::LabelParent);
        assert_eq!(script.op, "checkbox.inspect");
        assert_eq!(script.arg_str("strategy"), "label-parent");
        assert_eq!(script.arg_str("activeDialog"), selectors.active_dialog);
        assert_eq!(script.args["keywords"][0], "meninjau");
        assert!(script.body.contains("const findCheckbox"));
    }

    #[test]
    fn markers_match_tagging_scheme() {
        assert_eq!(field_marker(1), "[data-autoabsen=\"field-1\"]");
        assert_eq!(submit_marker(0), "[data-autoabsen=\"submit-0\"]");
        assert!(resolve_fields(&SelectorTable::default()).body.contains("'field-' + i"));
    }

    #[test]
    fn long_outline_is_truncated_with_total() {
        let raw = "x".repeat(DOM_OUTLINE_MAX_CHARS + 10);
        let out = truncate_outline(&raw);
        assert!(out.ends_with(&format!("[truncated, {} total chars]", DOM_OUTLINE_MAX_CHARS + 10)));
        assert_eq!(truncate_outline("button \"simpan\""), "button \"simpan\"");
    }

    #[test]
    fn field_scripts_target_the_tagged_field() {
        let selectors = SelectorTable::default();
        for script in [
            assign_field(&selectors, 1, "isi"),
            select_field(&selectors, 1),
            field_length(&selectors, 1),
        ] {
            assert!(script.body.contains("const el = fieldAt(args.index);"), "{}", script.op);
            assert!(!script.body.contains("visibleFields()[args.index]"), "{}", script.op);
        }
        assert!(assign_field(&selectors, 0, "x").body.contains("scrollIntoView"));
    }
}
