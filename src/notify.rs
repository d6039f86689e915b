//! Formatting and Telegram delivery of outage reports.
//!
//! Delivery is split along the same seam as recognition: [`MessageSink`] is
//! the opaque send-one-message capability, [`TelegramSink`] the production
//! implementation, and [`deliver`] the chunking policy layered on top.
//! Telegram caps message length, so oversized reports are split into
//! fixed-width chunks labeled `Part i/n` and sent sequentially; the first
//! failed chunk aborts the rest.

use crate::errors::AlertError;
use crate::models::OutageRecord;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// Longest text sent as a single message.
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Fixed report body for a run that found an empty outage table.
pub const NO_OUTAGES_MESSAGE: &str = "No power outages currently scheduled.";

/// Render a result set as the human-readable report text.
///
/// One block per record in table order, blocks separated by a blank line.
pub fn format_outages(outages: &[OutageRecord]) -> String {
    if outages.is_empty() {
        return NO_OUTAGES_MESSAGE.to_string();
    }

    outages
        .iter()
        .map(|outage| {
            format!(
                "📅 {}\n\
                 ⚡ {}\n\
                 Town: {}\n\
                 Feeder: {}\n\
                 Location: {}\n\
                 Work: {}\n\
                 Time: {} - {}",
                outage.date,
                outage.substation,
                outage.town,
                outage.feeder,
                outage.location,
                outage.work_type,
                outage.from_time,
                outage.to_time
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split text into fixed-width chunks on char boundaries.
///
/// The split is deliberately naive (not sentence-aware); chunk bodies
/// concatenate back to the original text.
pub fn chunk_message(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Opaque one-message delivery capability.
pub trait MessageSink {
    /// Send a single message to the configured destination.
    async fn send(&self, text: &str) -> Result<(), AlertError>;
}

/// Send a report, chunking when it exceeds [`MAX_MESSAGE_LEN`].
///
/// Each chunk is an independent send labeled with its ordinal position;
/// a failure aborts the remaining chunks and escalates.
#[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
pub async fn deliver<S: MessageSink>(sink: &S, text: &str) -> Result<(), AlertError> {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        sink.send(text).await?;
        info!("Delivered report");
        return Ok(());
    }

    let chunks = chunk_message(text, MAX_MESSAGE_LEN);
    let total = chunks.len();
    for (i, chunk) in chunks.iter().enumerate() {
        let labeled = format!("Part {}/{}:\n\n{}", i + 1, total, chunk);
        sink.send(&labeled).await?;
    }
    info!(parts = total, "Delivered chunked report");
    Ok(())
}

/// Best-effort failure report to the same channel.
///
/// A failure here is logged and swallowed so it never masks the run
/// failure being reported.
pub async fn deliver_error<S: MessageSink>(sink: &S, summary: &str) {
    let message = format!("Error: {summary}");
    if let Err(e) = sink.send(&message).await {
        warn!(error = %e, "Failed to deliver failure report");
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// [`MessageSink`] backed by the Telegram Bot API `sendMessage` call.
pub struct TelegramSink {
    http: reqwest::Client,
    send_message_url: Url,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(
        bot_token: &str,
        chat_id: String,
        timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let send_message_url =
            Url::parse(&format!("https://api.telegram.org/bot{bot_token}/sendMessage"))?;
        Ok(Self {
            http,
            send_message_url,
            chat_id,
        })
    }
}

impl MessageSink for TelegramSink {
    #[instrument(level = "info", skip_all)]
    async fn send(&self, text: &str) -> Result<(), AlertError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };
        let response = self
            .http
            .post(self.send_message_url.clone())
            .form(&payload)
            .send()
            .await
            // without_url: the request URL embeds the bot token
            .map_err(|e| AlertError::Delivery(e.without_url().to_string()))?;

        if let Err(e) = response.error_for_status_ref() {
            let status = response.status();
            let detail = response
                .text()
                .await
                .ok()
                .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
                .and_then(|v| v["description"].as_str().map(String::from))
                .unwrap_or_else(|| e.without_url().to_string());
            return Err(AlertError::Delivery(format!("telegram API {status}: {detail}")));
        }
        Ok(())
    }
}
