//! Bot API client.
//!
//! Thin JSON client over the `api.telegram.org/bot<token>/<method>`
//! surface. Every response arrives in the `{ok, result, description}`
//! envelope; `call` unwraps it once for all methods.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::types::{
    BotCommand, BotCommandScope, InlineKeyboardMarkup, Message, Update, User,
};
use super::{Result, TelegramError};
use crate::config::TelegramConfig;
use crate::delivery::{OutboundChannel, OutboundError, StatusHandle};
use crate::logging::redact::redact_string;

/// Rich text handling for an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Telegram HTML markup.
    Html,
    /// No markup; text is rendered verbatim.
    Plain,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        if self.ok {
            self.result
                .ok_or_else(|| TelegramError::Decode("missing result field".to_string()))
        } else {
            Err(TelegramError::Api(
                self.description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// Telegram Bot API client
pub struct TelegramApi {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl TelegramApi {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TelegramError::Config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base, self.token, method)
    }

    fn network(e: reqwest::Error) -> TelegramError {
        TelegramError::Network(redact_string(&e.to_string()))
    }

    fn decode(e: reqwest::Error) -> TelegramError {
        TelegramError::Decode(redact_string(&e.to_string()))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await
            .map_err(Self::network)?;

        // API errors still come wrapped in the envelope, regardless of
        // the HTTP status
        let envelope: ApiResponse<T> = response.json().await.map_err(Self::decode)?;
        envelope.into_result()
    }

    /// Identify the bot account behind the token.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates. `timeout_secs` is the server-side hold
    /// time and must stay under the client timeout.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut payload = serde_json::json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            payload["offset"] = offset.into();
        }

        self.call("getUpdates", &payload).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        mode: ParseMode,
        reply_to: Option<i64>,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message> {
        let payload = send_message_payload(chat_id, text, mode, reply_to, keyboard);
        self.call("sendMessage", &payload).await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
        });
        // result is the edited Message, or true for inline edits
        self.call::<serde_json::Value>("editMessageText", &payload)
            .await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });
        self.call::<bool>("deleteMessage", &payload).await?;
        Ok(())
    }

    /// Upload a local audio file as a voice message.
    pub async fn send_voice(
        &self,
        chat_id: i64,
        voice: &Path,
        caption: &str,
        reply_to: i64,
    ) -> Result<Message> {
        let bytes = tokio::fs::read(voice).await?;
        let file_name = voice
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "voice.ogg".to_string());

        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML")
            .text("reply_to_message_id", reply_to.to_string())
            .part("voice", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.method_url("sendVoice"))
            .multipart(form)
            .send()
            .await
            .map_err(Self::network)?;

        let envelope: ApiResponse<Message> = response.json().await.map_err(Self::decode)?;
        envelope.into_result()
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: &str,
        show_alert: bool,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "callback_query_id": callback_query_id,
            "text": text,
            "show_alert": show_alert,
        });
        self.call::<bool>("answerCallbackQuery", &payload).await?;
        Ok(())
    }

    /// Install a command menu for the given scope.
    pub async fn set_my_commands(
        &self,
        commands: &[BotCommand],
        scope: &BotCommandScope,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "commands": commands,
            "scope": scope,
        });
        self.call::<bool>("setMyCommands", &payload).await?;
        Ok(())
    }
}

fn send_message_payload(
    chat_id: i64,
    text: &str,
    mode: ParseMode,
    reply_to: Option<i64>,
    keyboard: Option<&InlineKeyboardMarkup>,
) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
    });
    if mode == ParseMode::Html {
        payload["parse_mode"] = "HTML".into();
    }
    if let Some(reply_to) = reply_to {
        payload["reply_to_message_id"] = reply_to.into();
    }
    if let Some(keyboard) = keyboard {
        payload["reply_markup"] = serde_json::json!(keyboard);
    }
    payload
}

#[async_trait::async_trait]
impl OutboundChannel for TelegramApi {
    async fn send_status(
        &self,
        chat_id: i64,
        reply_to: i64,
        text: &str,
    ) -> std::result::Result<StatusHandle, OutboundError> {
        let message = self
            .send_message(chat_id, text, ParseMode::Html, Some(reply_to), None)
            .await?;
        Ok(StatusHandle {
            chat_id,
            message_id: message.message_id,
        })
    }

    async fn edit_status(
        &self,
        handle: StatusHandle,
        text: &str,
    ) -> std::result::Result<(), OutboundError> {
        self.edit_message_text(handle.chat_id, handle.message_id, text)
            .await?;
        Ok(())
    }

    async fn delete_status(&self, handle: StatusHandle) -> std::result::Result<(), OutboundError> {
        self.delete_message(handle.chat_id, handle.message_id)
            .await?;
        Ok(())
    }

    async fn send_voice_attachment(
        &self,
        chat_id: i64,
        voice: &Path,
        caption: &str,
        reply_to: i64,
    ) -> std::result::Result<(), OutboundError> {
        self.send_voice(chat_id, voice, caption, reply_to).await?;
        Ok(())
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> std::result::Result<(), OutboundError> {
        self.send_message(chat_id, text, ParseMode::Plain, reply_to, None)
            .await?;
        Ok(())
    }
}

impl From<TelegramError> for OutboundError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::Api(message) => OutboundError::Rejected(message),
            other => OutboundError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::types::InlineKeyboardButton;

    fn api() -> TelegramApi {
        let config = TelegramConfig {
            bot_token: "111:token".to_string(),
            api_base: "https://api.telegram.org".to_string(),
        };
        TelegramApi::new(&config).unwrap()
    }

    #[test]
    fn test_method_url_embeds_token_and_method() {
        assert_eq!(
            api().method_url("getMe"),
            "https://api.telegram.org/bot111:token/getMe"
        );
    }

    #[test]
    fn test_trailing_slash_in_base_is_tolerated() {
        let config = TelegramConfig {
            bot_token: "111:token".to_string(),
            api_base: "https://tg.example/".to_string(),
        };
        let api = TelegramApi::new(&config).unwrap();
        assert_eq!(api.method_url("getMe"), "https://tg.example/bot111:token/getMe");
    }

    #[test]
    fn test_envelope_unwraps_result() {
        let raw = r#"{"ok": true, "result": ["a", "b"]}"#;
        let envelope: ApiResponse<Vec<String>> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.into_result().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_envelope_decodes_payloads_without_default() {
        // Message has no Default impl; the envelope must not require one.
        let raw = r#"{"ok": true, "result": {
            "message_id": 5,
            "chat": {"id": 9, "type": "private"},
            "date": 1700000000
        }}"#;
        let envelope: ApiResponse<Message> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.into_result().unwrap().message_id, 5);
    }

    #[test]
    fn test_envelope_surfaces_api_errors() {
        let raw = r#"{"ok": false, "description": "Bad Request: chat not found"}"#;
        let envelope: ApiResponse<bool> = serde_json::from_str(raw).unwrap();
        match envelope.into_result().unwrap_err() {
            TelegramError::Api(message) => assert_eq!(message, "Bad Request: chat not found"),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn test_ok_without_result_is_a_decode_error() {
        let raw = r#"{"ok": true}"#;
        let envelope: ApiResponse<bool> = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            envelope.into_result().unwrap_err(),
            TelegramError::Decode(_)
        ));
    }

    #[test]
    fn test_send_message_payload_html_and_reply() {
        let payload = send_message_payload(7, "<b>hi</b>", ParseMode::Html, Some(3), None);
        assert_eq!(
            payload,
            serde_json::json!({
                "chat_id": 7,
                "text": "<b>hi</b>",
                "parse_mode": "HTML",
                "reply_to_message_id": 3,
            })
        );
    }

    #[test]
    fn test_send_message_payload_plain_omits_parse_mode() {
        let payload = send_message_payload(7, "a < b", ParseMode::Plain, None, None);
        assert!(payload.get("parse_mode").is_none());
        assert!(payload.get("reply_to_message_id").is_none());
    }

    #[test]
    fn test_send_message_payload_includes_keyboard() {
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![
                InlineKeyboardButton::new("Male", "male"),
                InlineKeyboardButton::new("Female", "female"),
            ]],
        };
        let payload = send_message_payload(7, "choose", ParseMode::Html, None, Some(&keyboard));
        assert_eq!(
            payload["reply_markup"]["inline_keyboard"][0][1]["callback_data"],
            "female"
        );
    }
}
