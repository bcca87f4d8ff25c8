//! Wiring between configuration, the blocking engines and the async front ends.

use anyhow::{Result, anyhow, bail};
use tracing::{info, warn};

use crate::brain::ContentGenerator;
use crate::config::AppConfig;
use crate::engine::diagnostics::Diagnostics;
use crate::engine::flow::{FlowResult, ReportEngine};
use crate::hands::ChromeLauncher;
use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
use crate::presensi::{self, PresensiConfig, PresensiRunner};
use crate::types::{Report, Thresholds};

/// Generate a draft and reject it when any field is below the minimum.
pub async fn generate_report<G: ContentGenerator>(
    generator: &G,
    context: &str,
    activity: &str,
    thresholds: &Thresholds,
) -> Result<Report> {
    let report = generator.generate(context, activity).await?;
    if !report.validate(thresholds.min_field_length) {
        bail!(
            "generated report is too short: {:?} chars, need at least {} each",
            report.lengths(),
            thresholds.min_field_length
        );
    }
    Ok(report)
}

/// Run the report engine against the live portal on a blocking worker.
pub async fn submit_report(config: &AppConfig, report: Report) -> Result<FlowResult> {
    let credentials = config.credentials()?.clone();
    let selectors = config.selectors()?;
    let launcher = ChromeLauncher::new(config.browser_options(config.show_browser));
    let prefer_stealth = config.prefer_stealth;
    let diagnostics = Diagnostics::new(config.debug_dir.clone());

    tokio::task::spawn_blocking(move || {
        ReportEngine::new(launcher, prefer_stealth, selectors)
            .with_diagnostics(diagnostics)
            .run(&credentials.identifier, credentials.secret(), &report)
    })
    .await
    .map_err(|e| anyhow!("report engine task panicked: {e}"))
}

pub fn outcome_message(result: &FlowResult) -> String {
    match result {
        FlowResult::Success => "✅ Report Submitted Successfully!".to_string(),
        FlowResult::Failure(failure) => {
            let mut message = format!("❌ Report Submission Failed.\n{failure}");
            if let Some(dir) = failure
                .artifacts
                .as_ref()
                .and_then(|a| a.screenshot.as_ref().or(a.metadata.as_ref()))
                .and_then(|path| path.parent())
            {
                message.push_str(&format!("\nDiagnostics: {}", dir.display()));
            }
            message
        }
    }
}

/// Send through Telegram when configured, otherwise to the log.
pub async fn notify(config: &AppConfig, text: &str) -> bool {
    let telegram = TelegramNotifier::new(
        config.telegram_bot_token.as_deref(),
        config.telegram_chat_id.as_deref(),
    );
    if telegram.is_configured() {
        telegram.send(text).await
    } else {
        LogNotifier.send(text).await
    }
}

/// Run the external attendance flow and report it. A disabled runner is a
/// successful no-op; an undelivered notification fails the run.
pub async fn run_presensi<N: Notifier>(
    config: &AppConfig,
    presensi_config: &PresensiConfig,
    notifier: &N,
) -> Result<bool> {
    let Some(request) = presensi_config.request()? else {
        info!("PRESENSI_ENABLED=false, skipping external presensi");
        return Ok(true);
    };

    let launcher = ChromeLauncher::new(config.browser_options(presensi_config.show_browser));
    let prefer_stealth = config.prefer_stealth;
    let diagnostics = Diagnostics::new(config.debug_dir.clone());
    let run_request = request.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        PresensiRunner::new(launcher, prefer_stealth)
            .with_diagnostics(diagnostics)
            .submit(&run_request)
    })
    .await
    .map_err(|e| anyhow!("presensi task panicked: {e}"))?;

    let message = presensi::notification_message(&request, &outcome, presensi::wita_now());
    if !notifier.send(&message).await {
        warn!("presensi notification was not delivered");
        bail!("notification failed to send");
    }
    Ok(outcome.success)
}
