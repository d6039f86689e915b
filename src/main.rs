//! # Outage Alert
//!
//! A crawler for the TNEB shutdown-notice portal that works through the
//! portal's session-bound CAPTCHA gate and relays scheduled power outages
//! to a Telegram chat.
//!
//! ## Features
//!
//! - Acquires the portal's per-session view state token and form field prefix
//! - Solves the session captcha with tesseract, retrying rejected answers
//!   under a bounded attempt limit without restarting the session
//! - Parses the outage table and formats one report block per outage
//! - Delivers through the Telegram Bot API, chunking oversized reports
//! - On failure, best-effort delivery of a short failure report to the
//!   same chat
//!
//! ## Usage
//!
//! ```sh
//! TELEGRAM_BOT_TOKEN=... TELEGRAM_CHAT_ID=... APPCAT_CODE=090 outage_alert
//! ```
//!
//! ## Architecture
//!
//! One run is strictly sequential, every request depending on session state
//! from the previous one:
//! 1. **Acquire**: fetch the listing page, extract token + field prefix
//! 2. **Solve**: fetch a fresh captcha image over the same cookies, recognize it
//! 3. **Submit**: POST the lookup form, echoing the token
//! 4. **Parse**: extract the outage table (a rejection re-renders the form
//!    instead, looping back to step 2)
//! 5. **Notify**: format and deliver the result set

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod captcha;
mod cli;
mod crawler;
mod errors;
mod extract;
mod models;
mod notify;
mod session;

use captcha::TesseractRecognizer;
use cli::Cli;
use models::OutageRecord;
use notify::TelegramSink;
use session::PortalSession;

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("outage_alert starting up");

    let args = Cli::parse();
    let request_timeout = Duration::from_secs(args.request_timeout_secs);

    // The sink is read-only after startup and shared across runs; portal
    // sessions are created fresh per run.
    let notifier = match TelegramSink::new(
        &args.telegram_bot_token,
        args.telegram_chat_id.clone(),
        request_timeout,
    ) {
        Ok(sink) => sink,
        Err(e) => {
            error!(error = %e, "Failed to construct Telegram sink");
            return ExitCode::FAILURE;
        }
    };

    match args.interval_mins {
        Some(mins) => {
            info!(mins, "Running on an interval");
            let mut ticker = tokio::time::interval(Duration::from_secs(mins * 60));
            loop {
                ticker.tick().await;
                if !run_once(&args, &notifier).await {
                    warn!("Run failed; next tick will retry with a fresh session");
                }
            }
        }
        None => {
            if run_once(&args, &notifier).await {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Execute one full crawl-and-notify run.
///
/// Returns `true` when the outage report was retrieved *and* delivered.
/// Every failure path logs the cause and makes a best-effort attempt to
/// report it to the same chat before returning `false`.
#[instrument(level = "info", skip_all)]
async fn run_once(args: &Cli, notifier: &TelegramSink) -> bool {
    let start_time = std::time::Instant::now();

    let outages = match crawl(args).await {
        Ok(outages) => outages,
        Err(e) => {
            error!(error = %e, "Crawl failed");
            notify::deliver_error(notifier, &failure_summary(&e)).await;
            return false;
        }
    };
    info!(count = outages.len(), "Crawl succeeded");

    let report = notify::format_outages(&outages);
    if let Err(e) = notify::deliver(notifier, &report).await {
        // Data was obtained but never reached the chat, so the run failed.
        error!(error = %e, "Failed to deliver outage report");
        notify::deliver_error(notifier, &failure_summary(&e)).await;
        return false;
    }

    let elapsed = start_time.elapsed();
    info!(
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Run complete"
    );
    true
}

/// Drive the retrieval protocol with a fresh portal session.
async fn crawl(args: &Cli) -> Result<Vec<OutageRecord>, Box<dyn Error>> {
    let listing_url = Url::parse(&args.portal_url)?;
    let recognizer = TesseractRecognizer::new(&args.tesseract_cmd);
    let mut portal = PortalSession::new(
        listing_url,
        args.appcat_code.clone(),
        recognizer,
        Duration::from_secs(args.request_timeout_secs),
    )?;

    let outages = crawler::retrieve_outages(
        &mut portal,
        args.max_captcha_retries,
        Duration::from_secs(args.retry_backoff_secs),
    )
    .await?;
    Ok(outages)
}

/// Short failure description for the best-effort error report.
fn failure_summary(e: &dyn std::fmt::Display) -> String {
    format!(
        "outage crawl failed at {}: {e}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}
