//! Bot runtime: startup wiring, the long-poll loop, shutdown.

pub mod broadcast;
pub mod handlers;

pub use broadcast::{BroadcastReport, BroadcastSender};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::Config;
use crate::delivery::DeliveryPipeline;
use crate::store::migrations::{self, MigrationError};
use crate::store::{StoreError, VoiceProfileStore};
use crate::telegram::{BotCommandScope, ParseMode, TelegramApi, TelegramError};
use crate::tts::{AudioFetcher, TtsClient, TtsError};

/// Server-side hold time for one getUpdates call.
const POLL_TIMEOUT_SECS: u64 = 25;
/// Pause before retrying after a failed poll.
const POLL_RETRY_PAUSE: Duration = Duration::from_secs(3);

const STARTUP_NOTICE: &str = "🚀 <b>Bot is up and running</b>";
const SHUTDOWN_NOTICE: &str = "🛑 <b>Bot stopped</b>";

/// Bot runtime errors
#[derive(Debug, Error)]
pub enum BotError {
    #[error("telegram error: {0}")]
    Telegram(#[from] TelegramError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("tts error: {0}")]
    Tts(#[from] TtsError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state handed to every update handler.
pub struct BotContext {
    pub api: Arc<TelegramApi>,
    pub store: VoiceProfileStore,
    pub pipeline: DeliveryPipeline,
    pub admins: Vec<i64>,
    /// Bot username, shown in voice message captions.
    pub username: String,
}

impl BotContext {
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }
}

/// Start the bot and block until shutdown.
pub async fn run(config: Config) -> Result<(), BotError> {
    let api = Arc::new(TelegramApi::new(&config.telegram)?);

    // getMe doubles as a token check before anything else starts
    let me = api.get_me().await?;
    let username = me.username.clone().unwrap_or_else(|| me.first_name.clone());
    tracing::info!(username = %username, "authenticated with the bot api");

    let store = VoiceProfileStore::connect(&config.database.path).await?;
    let applied = migrations::run(store.pool()).await?;
    if applied > 0 {
        tracing::info!(applied, "database migrated");
    }

    tokio::fs::create_dir_all(&config.staging.dir).await?;

    let synth = Arc::new(TtsClient::new(&config.tts)?);
    let fetcher = Arc::new(AudioFetcher::new(&config.tts)?);
    let pipeline = DeliveryPipeline::new(
        synth,
        fetcher,
        api.clone(),
        config.tts.voice_table(),
        config.staging.dir.clone(),
        username.clone(),
    );

    if config.admins.is_empty() {
        tracing::warn!("no admins configured; /stat and /send will reject everyone");
    }

    let ctx = Arc::new(BotContext {
        api: api.clone(),
        store,
        pipeline,
        admins: config.admins.clone(),
        username,
    });

    install_command_menus(&ctx).await;
    notify_admins(&ctx, STARTUP_NOTICE).await;

    let mut offset = drop_pending_updates(&ctx.api).await?;
    tracing::info!("listening for updates");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            batch = ctx.api.get_updates(offset, POLL_TIMEOUT_SECS) => match batch {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            handlers::handle_update(ctx, update).await;
                        });
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "poll failed, backing off");
                    tokio::time::sleep(POLL_RETRY_PAUSE).await;
                }
            }
        }
    }

    notify_admins(&ctx, SHUTDOWN_NOTICE).await;
    Ok(())
}

/// Install the default command menu, plus the extended one per admin chat.
async fn install_command_menus(ctx: &BotContext) {
    if let Err(e) = ctx
        .api
        .set_my_commands(&handlers::user_commands(), &BotCommandScope::Default)
        .await
    {
        tracing::warn!(error = %e, "failed to install default command menu");
    }

    for &admin_id in &ctx.admins {
        if let Err(e) = ctx
            .api
            .set_my_commands(
                &handlers::admin_commands(),
                &BotCommandScope::Chat { chat_id: admin_id },
            )
            .await
        {
            tracing::warn!(admin_id, error = %e, "failed to install admin command menu");
        }
    }
}

async fn notify_admins(ctx: &BotContext, text: &str) {
    for &admin_id in &ctx.admins {
        if let Err(e) = ctx
            .api
            .send_message(admin_id, text, ParseMode::Html, None, None)
            .await
        {
            tracing::debug!(admin_id, error = %e, "failed to notify admin");
        }
    }
}

/// Skip everything that queued up while the bot was offline, so polling
/// starts at the head of the live stream.
async fn drop_pending_updates(api: &TelegramApi) -> Result<Option<i64>, TelegramError> {
    let mut offset = None;
    let mut skipped = 0usize;

    loop {
        let updates = api.get_updates(offset, 0).await?;
        match updates.last() {
            Some(last) => {
                offset = Some(last.update_id + 1);
                skipped += updates.len();
            }
            None => break,
        }
    }

    if skipped > 0 {
        tracing::info!(skipped, "dropped updates that arrived while offline");
    }

    Ok(offset)
}
