//! Sequential broadcast to all registered users.

use std::sync::Arc;
use std::time::Duration;

use crate::delivery::OutboundChannel;
use crate::telegram::escape_html;

/// Pause between consecutive sends, to stay under the flood limits.
const SEND_PAUSE: Duration = Duration::from_millis(50);

/// Tally of one finished broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn total(&self) -> usize {
        self.sent + self.failed
    }
}

/// Sends one admin-authored message to many chats, one at a time.
///
/// Per-recipient failures (blocked bot, deleted account) are tallied and
/// logged; they never abort the run.
pub struct BroadcastSender {
    channel: Arc<dyn OutboundChannel>,
    pause: Duration,
}

impl BroadcastSender {
    pub fn new(channel: Arc<dyn OutboundChannel>) -> Self {
        Self {
            channel,
            pause: SEND_PAUSE,
        }
    }

    /// Override the inter-send pause.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Deliver `text` to every recipient. The body is escaped and sent
    /// without rich formatting, since it is free-form admin input.
    pub async fn broadcast(&self, recipients: &[i64], text: &str) -> BroadcastReport {
        let safe_text = escape_html(text);
        let mut report = BroadcastReport::default();

        for &chat_id in recipients {
            match self.channel.send_text(chat_id, &safe_text, None).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(chat_id, error = %e, "broadcast send failed");
                }
            }
            tokio::time::sleep(self.pause).await;
        }

        tracing::info!(
            sent = report.sent,
            failed = report.failed,
            "broadcast finished"
        );
        report
    }
}
