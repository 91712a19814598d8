#![deny(missing_docs)]
//! Telegram transport adapter for the inline limiter.

/// Telegram-specific bot/transport implementation.
pub mod bot;
/// Telegram transport configuration.
pub mod config;
/// Uptime-Kuma push monitor.
pub mod health;
/// Telegram runtime entrypoint.
pub mod runner;
