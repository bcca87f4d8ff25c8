//! Login and navigation to today's report dialog.

use tracing::{debug, info, warn};

use super::Timings;
use super::poll::PollOutcome;
use super::resolve::Resolver;
use crate::error::StageError;
use crate::page::Page;
use crate::selectors::SelectorTable;

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoginSignal {
    Redirected(String),
    Dashboard,
    Rejected(String),
}

/// Sign in and wait for a success or rejection signal.
pub fn login<P: Page>(
    page: &P,
    selectors: &SelectorTable,
    timings: &Timings,
    identifier: &str,
    secret: &str,
) -> Result<(), StageError> {
    info!(url = %selectors.login_url, "opening login page");
    page.navigate(&selectors.login_url)?;
    page.wait_visible(&selectors.username_input, timings.login_field_wait)?;
    page.wait_visible(&selectors.password_input, timings.login_field_wait)?;

    page.type_into(&selectors.username_input, identifier)?;
    page.type_into(&selectors.password_input, secret)?;
    page.click(&selectors.login_button)?;
    debug!("credentials submitted");

    let host = selectors.portal_host();
    let outcome = timings.poll(timings.login_attempts).until(|attempt| {
        let url = page.current_url().unwrap_or_default().to_lowercase();
        let on_portal = host.as_deref().is_some_and(|h| url.contains(h));
        if on_portal && !url.contains("/login") {
            return Ok::<_, StageError>(Some(LoginSignal::Redirected(url)));
        }
        if page.is_visible(&selectors.dashboard_markers).unwrap_or(false) {
            return Ok(Some(LoginSignal::Dashboard));
        }
        if page.is_visible(&selectors.login_error).unwrap_or(false) {
            let text = page.text_of(&selectors.login_error).unwrap_or_default();
            return Ok(Some(LoginSignal::Rejected(text)));
        }
        debug!(attempt, %url, "waiting for login result");
        Ok(None)
    })?;

    match outcome {
        PollOutcome::Ready {
            value: LoginSignal::Rejected(text),
            attempt,
        } => {
            warn!(attempt, message = %text, "login rejected");
            let message = if text.is_empty() {
                "error message shown on the login page".to_string()
            } else {
                text
            };
            Err(StageError::LoginRejected(message))
        }
        PollOutcome::Ready { value, attempt } => {
            info!(attempt, signal = ?value, "login succeeded");
            Ok(())
        }
        PollOutcome::Exhausted { attempts } => Err(StageError::LoginTimeout { attempts }),
    }
}

/// Open today's calendar cell and wait for the report dialog.
pub fn open_report_dialog<P: Page>(
    page: &P,
    selectors: &SelectorTable,
    timings: &Timings,
) -> Result<(), StageError> {
    page.wait_visible(&selectors.calendar_today_cell, timings.today_cell_wait)
        .map_err(|e| StageError::Navigation(format!("today's calendar cell not visible: {e}")))?;
    page.click(&selectors.calendar_today_cell)
        .map_err(|e| StageError::Navigation(format!("today's calendar cell not clickable: {e}")))?;

    let resolver = Resolver::new(page, selectors);
    let outcome = timings.poll(timings.dialog_attempts).until(|attempt| {
        let open = resolver.report_dialog_open().unwrap_or_else(|e| {
            debug!(error = %e, "dialog check failed");
            false
        });
        debug!(attempt, open, "waiting for report dialog");
        Ok::<_, StageError>(open.then_some(()))
    })?;

    if !outcome.is_ready() {
        return Err(StageError::Navigation(format!(
            "report dialog did not open after {} checks",
            timings.dialog_attempts
        )));
    }
    info!("report dialog open");
    Ok(())
}
