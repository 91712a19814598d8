#![deny(missing_docs)]
//! Inline limiter core library.
//!
//! Burnout accounting for inline messages, the self-destruct queue and the
//! periodic decay / summary tasks. Transport-agnostic: a chat backend plugs in
//! through [`transport::ChatTransport`].

/// Admin command parsing and execution.
pub mod admin;
/// Configuration management.
pub mod config;
/// Burnout counter primitive.
pub mod counter;
/// Minute-by-minute cooldown decay.
pub mod decay;
/// Throttle for "admins only" replies.
pub mod denial;
/// Per-chat state and burnout decisions.
pub mod group;
/// Inbound message moderation flow.
pub mod moderation;
/// Self-destructing notification helpers.
pub mod notify;
/// Persisted delayed-deletion queue.
pub mod queue;
/// Chat id to group state registry.
pub mod registry;
/// Periodic task runner.
pub mod scheduler;
/// Group and bot limit configuration.
pub mod setup;
/// Key-value persistence.
pub mod storage;
/// Periodic usage digest.
pub mod summary;
/// Chat transport abstraction.
pub mod transport;
/// Utility functions.
pub mod utils;
/// Recording transport and wiring for tests.
pub mod testing;
