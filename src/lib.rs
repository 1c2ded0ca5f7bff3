//! ovozbot library
//!
//! This library provides the core functionality for ovozbot, a Telegram
//! bot that turns Uzbek text messages into spoken voice replies: the
//! Telegram API client, the text-to-speech pipeline, per-user voice
//! profiles, and admin broadcast tooling.

pub mod bot;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod logging;
pub mod store;
pub mod telegram;
pub mod tts;
