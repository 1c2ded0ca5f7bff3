//! Update dispatch and command handlers.
//!
//! Plain text is the main path: it goes straight into the delivery
//! pipeline. Commands cover onboarding, voice selection and the admin
//! surface. An unknown `/command` is read aloud like any other text,
//! matching how users actually treat the bot.

use std::sync::Arc;

use super::broadcast::{BroadcastReport, BroadcastSender};
use super::BotContext;
use crate::delivery::DeliveryRequest;
use crate::store::UserStats;
use crate::telegram::{
    BotCommand, CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, ParseMode,
    Update, User,
};
use crate::tts::VoicePreference;

const CHOOSE_VOICE: &str = "🔊 Pick a voice:";
const VOICE_SET_MALE: &str = "🧔‍♂️ Male voice selected!";
const VOICE_SET_FEMALE: &str = "👩‍🦰 Female voice selected!";
const VOICE_SET_FAILED: &str = "❌ Something went wrong, try again";
const ADMINS_ONLY: &str = "❌ This command is for admins only!";
const SEND_USAGE: &str = "❌ Add the message text:\n<code>/send your announcement</code>";
const BROADCAST_RUNNING: &str = "📤 Broadcasting...";
const RECIPIENTS_FAILED: &str = "❌ Could not load the recipient list";
const STAT_FAILED: &str = "❌ Could not load the statistics";

/// Commands every user sees in the menu.
pub fn user_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "♻️ Restart the bot"),
        BotCommand::new("settings", "🔊 Change the voice"),
    ]
}

/// Commands shown to admins, on top of the user set.
pub fn admin_commands() -> Vec<BotCommand> {
    let mut commands = user_commands();
    commands.push(BotCommand::new("stat", "📊 Usage statistics"));
    commands.push(BotCommand::new("send", "📤 Broadcast a message"));
    commands
}

/// Entry point for one polled update.
pub async fn handle_update(ctx: Arc<BotContext>, update: Update) {
    if let Some(message) = update.message {
        handle_message(ctx, message).await;
    } else if let Some(callback) = update.callback_query {
        handle_callback(ctx, callback).await;
    }
}

async fn handle_message(ctx: Arc<BotContext>, message: Message) {
    let Some(from) = message.from.clone() else {
        // channel posts carry no sender, nothing to do with them
        return;
    };
    if from.is_bot {
        return;
    }
    let Some(text) = message.text.clone() else {
        // stickers, photos and other non-text content are ignored
        return;
    };

    match parse_command(&text) {
        Some((command, rest)) => match command.as_str() {
            "start" => handle_start(&ctx, &message, &from).await,
            "settings" => handle_settings(&ctx, &message, &from).await,
            "stat" => handle_stat(&ctx, &message, &from).await,
            "send" => handle_send(&ctx, &message, &from, rest).await,
            _ => handle_text(&ctx, &message, &from, &text).await,
        },
        None => handle_text(&ctx, &message, &from, &text).await,
    }
}

/// Split `/command rest`, tolerating the `/command@botname` group form.
fn parse_command(text: &str) -> Option<(String, &str)> {
    let stripped = text.trim_start().strip_prefix('/')?;
    let (head, rest) = match stripped.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest),
        None => (stripped, ""),
    };

    let command = head.split('@').next().unwrap_or(head);
    if command.is_empty() {
        return None;
    }

    Some((command.to_ascii_lowercase(), rest))
}

async fn register(ctx: &BotContext, from: &User) {
    if let Err(e) = ctx.store.register_user(from.id, &from.full_name()).await {
        tracing::warn!(user_id = from.id, error = %e, "failed to register user");
    }
}

async fn send_html(ctx: &BotContext, chat_id: i64, text: &str) {
    if let Err(e) = ctx
        .api
        .send_message(chat_id, text, ParseMode::Html, None, None)
        .await
    {
        tracing::warn!(chat_id, error = %e, "failed to send message");
    }
}

async fn handle_start(ctx: &BotContext, message: &Message, from: &User) {
    register(ctx, from).await;

    let text = if ctx.is_admin(from.id) {
        admin_welcome_text(from)
    } else {
        welcome_text(from)
    };
    send_html(ctx, message.chat.id, &text).await;
}

fn welcome_text(user: &User) -> String {
    format!(
        "<b>Hello, {}!</b>\n\n\
         Send me any text and I will read it out loud as a voice message 🎤\n\n\
         Pick the voice with /settings.",
        user.mention()
    )
}

fn admin_welcome_text(user: &User) -> String {
    format!(
        "<b>Hello, Admin {}! 👑</b>\n\n\
         Send me any text and I will read it out loud as a voice message 🎤\n\n\
         Admin commands:\n\
         /stat - usage statistics\n\
         /send - broadcast a message\n\
         /settings - change the voice",
        user.mention()
    )
}

fn voice_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            InlineKeyboardButton::new("🧔‍♂️ Male voice", VoicePreference::Male.as_str()),
            InlineKeyboardButton::new("👩‍🦰 Female voice", VoicePreference::Female.as_str()),
        ]],
    }
}

async fn handle_settings(ctx: &BotContext, message: &Message, from: &User) {
    register(ctx, from).await;

    if let Err(e) = ctx
        .api
        .send_message(
            message.chat.id,
            CHOOSE_VOICE,
            ParseMode::Html,
            None,
            Some(&voice_keyboard()),
        )
        .await
    {
        tracing::warn!(chat_id = message.chat.id, error = %e, "failed to send voice keyboard");
    }
}

async fn handle_callback(ctx: Arc<BotContext>, callback: CallbackQuery) {
    let Some(data) = callback.data.as_deref() else {
        return;
    };
    let voice = match data {
        "male" => VoicePreference::Male,
        "female" => VoicePreference::Female,
        other => {
            tracing::debug!(data = other, "ignoring unknown callback data");
            return;
        }
    };

    match ctx.store.set_voice(callback.from.id, voice).await {
        Ok(()) => {
            let confirmation = match voice {
                VoicePreference::Male => VOICE_SET_MALE,
                VoicePreference::Female => VOICE_SET_FEMALE,
            };
            if let Err(e) = ctx
                .api
                .answer_callback_query(&callback.id, confirmation, true)
                .await
            {
                tracing::warn!(error = %e, "failed to answer callback query");
            }
            // the keyboard has served its purpose
            if let Some(message) = &callback.message {
                if let Err(e) = ctx
                    .api
                    .delete_message(message.chat.id, message.message_id)
                    .await
                {
                    tracing::debug!(error = %e, "failed to delete settings keyboard");
                }
            }
        }
        Err(e) => {
            tracing::error!(
                user_id = callback.from.id,
                error = %e,
                "failed to store voice preference"
            );
            if let Err(e) = ctx
                .api
                .answer_callback_query(&callback.id, VOICE_SET_FAILED, true)
                .await
            {
                tracing::warn!(error = %e, "failed to answer callback query");
            }
        }
    }
}

async fn handle_stat(ctx: &BotContext, message: &Message, from: &User) {
    if !ctx.is_admin(from.id) {
        send_html(ctx, message.chat.id, ADMINS_ONLY).await;
        return;
    }

    match ctx.store.stats().await {
        Ok(stats) => send_html(ctx, message.chat.id, &stats_text(&stats, &ctx.admins)).await,
        Err(e) => {
            tracing::error!(error = %e, "failed to load statistics");
            send_html(ctx, message.chat.id, STAT_FAILED).await;
        }
    }
}

fn stats_text(stats: &UserStats, admins: &[i64]) -> String {
    let admin_list = admins
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "📊 <b>Bot statistics</b>\n\n\
         👥 Total users: <code>{}</code>\n\
         🧔‍♂️ Male voice: <code>{}</code>\n\
         👩‍🦰 Female voice: <code>{}</code>\n\n\
         🔧 Admins: <code>{}</code>",
        stats.total, stats.male, stats.female, admin_list
    )
}

async fn handle_send(ctx: &BotContext, message: &Message, from: &User, rest: &str) {
    if !ctx.is_admin(from.id) {
        send_html(ctx, message.chat.id, ADMINS_ONLY).await;
        return;
    }

    let body = rest.trim();
    if body.is_empty() {
        send_html(ctx, message.chat.id, SEND_USAGE).await;
        return;
    }

    let recipients = match ctx.store.all_user_ids().await {
        Ok(recipients) => recipients,
        Err(e) => {
            tracing::error!(error = %e, "failed to load broadcast recipients");
            send_html(ctx, message.chat.id, RECIPIENTS_FAILED).await;
            return;
        }
    };

    let placeholder = match ctx
        .api
        .send_message(message.chat.id, BROADCAST_RUNNING, ParseMode::Html, None, None)
        .await
    {
        Ok(placeholder) => Some(placeholder),
        Err(e) => {
            tracing::warn!(error = %e, "failed to post broadcast placeholder");
            None
        }
    };

    let report = BroadcastSender::new(ctx.api.clone())
        .broadcast(&recipients, body)
        .await;

    let summary = broadcast_summary(&report);
    match placeholder {
        Some(placeholder) => {
            if let Err(e) = ctx
                .api
                .edit_message_text(placeholder.chat.id, placeholder.message_id, &summary)
                .await
            {
                tracing::warn!(error = %e, "failed to update broadcast summary");
            }
        }
        None => send_html(ctx, message.chat.id, &summary).await,
    }
}

fn broadcast_summary(report: &BroadcastReport) -> String {
    format!(
        "✅ <b>Broadcast finished</b>\n\n\
         📨 Delivered: <code>{}</code>\n\
         ❌ Failed: <code>{}</code>\n\
         👥 Total: <code>{}</code>",
        report.sent,
        report.failed,
        report.total()
    )
}

async fn handle_text(ctx: &BotContext, message: &Message, from: &User, text: &str) {
    register(ctx, from).await;

    let voice = match ctx.store.voice_for(from.id).await {
        Ok(voice) => voice,
        Err(e) => {
            tracing::warn!(
                user_id = from.id,
                error = %e,
                "failed to load voice preference, using default"
            );
            VoicePreference::default()
        }
    };

    let request = DeliveryRequest {
        chat_id: message.chat.id,
        sender_id: from.id,
        message_id: message.message_id,
        text: text.to_string(),
        voice,
    };

    let outcome = ctx.pipeline.deliver(&request).await;
    tracing::debug!(
        chat_id = request.chat_id,
        message_id = request.message_id,
        outcome = ?outcome,
        "delivery finished"
    );
}
