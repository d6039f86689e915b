//! Command-line interface definitions for the outage crawler.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and the account code can be provided via environment
//! variables; everything else has sensible defaults. Missing required
//! configuration is a fatal startup error, surfaced by clap before any
//! network activity.

use crate::crawler::DEFAULT_MAX_ATTEMPTS;
use clap::Parser;

/// Command-line arguments for the outage crawler.
///
/// # Examples
///
/// ```sh
/// # One-shot run (credentials from the environment)
/// outage_alert
///
/// # Explicit credentials, repeating every 30 minutes
/// outage_alert --telegram-bot-token TOKEN --telegram-chat-id -100123 \
///     --appcat-code 090 --interval-mins 30
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Telegram bot token used to deliver reports
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: String,

    /// Telegram chat the reports are delivered to
    #[arg(long, env = "TELEGRAM_CHAT_ID", allow_hyphen_values = true)]
    pub telegram_chat_id: String,

    /// Application category code identifying which outages to query
    #[arg(long, env = "APPCAT_CODE")]
    pub appcat_code: String,

    /// Portal listing page URL
    #[arg(
        long,
        default_value = "https://www.tnebltd.gov.in/outages/viewshutdown.xhtml"
    )]
    pub portal_url: String,

    /// Captcha attempts before a run is abandoned
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_captcha_retries: usize,

    /// Seconds to wait between captcha attempts
    #[arg(long, default_value_t = 2)]
    pub retry_backoff_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Command used to run tesseract for challenge recognition
    #[arg(long, default_value = "tesseract")]
    pub tesseract_cmd: String,

    /// Repeat the crawl every N minutes instead of exiting after one run
    #[arg(long)]
    pub interval_mins: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "outage_alert",
            "--telegram-bot-token",
            "123:abc",
            "--telegram-chat-id",
            "-100456",
            "--appcat-code",
            "090",
        ]);

        assert_eq!(cli.telegram_bot_token, "123:abc");
        assert_eq!(cli.telegram_chat_id, "-100456");
        assert_eq!(cli.appcat_code, "090");
        assert_eq!(
            cli.portal_url,
            "https://www.tnebltd.gov.in/outages/viewshutdown.xhtml"
        );
        assert_eq!(cli.max_captcha_retries, 5);
        assert_eq!(cli.retry_backoff_secs, 2);
        assert_eq!(cli.request_timeout_secs, 30);
        assert_eq!(cli.tesseract_cmd, "tesseract");
        assert!(cli.interval_mins.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(&[
            "outage_alert",
            "--telegram-bot-token",
            "t",
            "--telegram-chat-id",
            "c",
            "--appcat-code",
            "a",
            "--max-captcha-retries",
            "3",
            "--interval-mins",
            "30",
        ]);

        assert_eq!(cli.max_captcha_retries, 3);
        assert_eq!(cli.interval_mins, Some(30));
    }
}
