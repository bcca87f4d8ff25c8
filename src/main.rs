use anyhow::{Result, bail};
use autoabsen::brain::{ContentGenerator, OpenRouterGenerator};
use autoabsen::config::AppConfig;
use autoabsen::face::{self, UiEvent, UiHandle};
use autoabsen::notify::TelegramNotifier;
use autoabsen::presensi::{PresensiAction, PresensiConfig};
use autoabsen::service;
use autoabsen::types::{Report, Thresholds};
use autoabsen::workflow::{Conversation, INTERACTION_BUDGET, Turn};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "autoabsen", version, about = "Daily MagangHub report automation")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate today's report from an activity summary and submit it.
    Report {
        /// Today's activity; read from stdin when omitted.
        #[arg(short, long)]
        activity: Option<String>,
        /// Print the generated draft without submitting.
        #[arg(long)]
        dry_run: bool,
    },
    /// Draft and confirm the report through a local web UI.
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
        /// Interaction budget in seconds.
        #[arg(long, default_value_t = INTERACTION_BUDGET.as_secs())]
        budget: u64,
    },
    /// Press the external attendance button (MASUK or KELUAR).
    Presensi {
        /// Overrides PRESENSI_ACTION.
        #[arg(long)]
        action: Option<PresensiAction>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    init_logging(&config.log_level, cli.json_logs);

    let ok = match cli.command {
        Command::Report { activity, dry_run } => report(&config, activity, dry_run).await?,
        Command::Serve { port, budget } => {
            serve(&config, port, Duration::from_secs(budget)).await?
        }
        Command::Presensi { action } => presensi(&config, action).await?,
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// `RUST_LOG` wins; `LOG_LEVEL` is the fallback.
fn init_logging(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(false)))
        .init();
}

fn read_activity(context: &str) -> Result<String> {
    print!("Apa aktivitasmu hari ini? (Context: {context})\n> ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

async fn report(config: &AppConfig, activity: Option<String>, dry_run: bool) -> Result<bool> {
    let activity = match activity {
        Some(activity) => activity,
        None => read_activity(&config.activity_context)?,
    };
    let activity = activity.trim();
    if activity.is_empty() {
        bail!("activity cannot be empty");
    }

    let generator = OpenRouterGenerator::new(config.api_key()?, &config.ai_model)?;
    info!(model = %config.ai_model, "generating report content");
    let report = service::generate_report(
        &generator,
        &config.activity_context,
        activity,
        &Thresholds::default(),
    )
    .await?;

    let [activity_len, learning_len, obstacles_len] = report.lengths();
    println!("Report generated:");
    println!("  - Activity: {activity_len} chars");
    println!("  - Learning: {learning_len} chars");
    println!("  - Obstacles: {obstacles_len} chars");
    if dry_run {
        println!("\n{}\n\n{}\n\n{}", report.activity, report.learning, report.obstacles);
        return Ok(true);
    }

    info!("submitting report");
    let result = service::submit_report(config, report).await?;
    let message = service::outcome_message(&result);
    println!("{message}");
    service::notify(config, &message).await;
    Ok(result.is_success())
}

async fn serve(config: &AppConfig, port: u16, budget: Duration) -> Result<bool> {
    let generator = OpenRouterGenerator::new(config.api_key()?, &config.ai_model)?;
    let mut conversation = Conversation::new(
        generator,
        config.activity_context.clone(),
        Thresholds::default(),
    );
    let mut ui = face::start_server(port).await?;
    service::notify(
        config,
        &format!(
            "🔔 AutoAbsen Reminder\n\nWhat did you do today?\nReply at http://localhost:{} within {} minutes to generate your report.",
            ui.port,
            budget.as_secs() / 60
        ),
    )
    .await;

    let confirmed = match tokio::time::timeout(budget, converse(&mut conversation, &mut ui)).await {
        Ok(confirmed) => confirmed,
        Err(_) => {
            warn!(?budget, "interaction budget exhausted");
            let notice = "⏳ Timeout: no reply in time. Workflow exiting.";
            ui.emit(UiEvent::Closed {
                summary: notice.to_string(),
            });
            service::notify(config, notice).await;
            return Ok(false);
        }
    };
    let Some(report) = confirmed else {
        return Ok(true);
    };

    let (message, success) = match service::submit_report(config, report).await {
        Ok(result) => (service::outcome_message(&result), result.is_success()),
        Err(e) => {
            error!(error = %e, "submission could not run");
            (format!("❌ Automation Error: {e}"), false)
        }
    };
    ui.emit(UiEvent::Closed {
        summary: message.clone(),
    });
    service::notify(config, &message).await;
    Ok(success)
}

/// Relay messages until a draft is confirmed (`Some`) or the user cancels.
async fn converse<G: ContentGenerator>(
    conversation: &mut Conversation<G>,
    ui: &mut UiHandle,
) -> Option<Report> {
    while let Some(text) = ui.input_rx.recv().await {
        ui.emit(UiEvent::Busy {
            message: conversation.pending_message(&text).to_string(),
        });
        let turn = conversation.handle(&text).await;
        let message = turn.message();
        match turn {
            Turn::Draft(_) | Turn::Finished => ui.emit(UiEvent::Reply { message }),
            Turn::TooShort(_) | Turn::GenerationFailed(_) => ui.emit(UiEvent::Failed { message }),
            Turn::Confirmed(report) => return Some(report),
            Turn::Cancelled => {
                ui.emit(UiEvent::Closed { summary: message });
                return None;
            }
        }
    }
    None
}

async fn presensi(config: &AppConfig, action: Option<PresensiAction>) -> Result<bool> {
    let mut presensi_config = PresensiConfig::from_env()?;
    if action.is_some() {
        presensi_config.action = action;
    }
    let notifier = TelegramNotifier::new(
        config.telegram_bot_token.as_deref(),
        config.telegram_chat_id.as_deref(),
    );
    service::run_presensi(config, &presensi_config, &notifier).await
}
