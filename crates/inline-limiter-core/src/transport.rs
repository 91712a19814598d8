//! Chat transport abstraction
//!
//! The limiter never talks to a chat backend directly; every send, delete and
//! role lookup goes through [`ChatTransport`].

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a chat transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// The backend rejected or failed the request
    #[error("Transport request failed: {0}")]
    Request(String),
    /// An identifier could not be mapped to the backend's format
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

/// Role of a chat member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    /// Chat creator
    Owner,
    /// Chat administrator
    Administrator,
    /// Regular member
    Member,
    /// Member with restrictions
    Restricted,
    /// Left the chat
    Left,
    /// Banned from the chat
    Banned,
}

impl MemberRole {
    /// Whether the member may run admin commands
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Owner | Self::Administrator)
    }
}

/// Operations the limiter needs from a chat backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a message, optionally as a reply; returns the new message id
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<i32, TransportError>;
    /// Delete a message
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError>;
    /// Look up the role of a user in a chat
    async fn member_role(&self, chat_id: i64, user_id: i64) -> Result<MemberRole, TransportError>;
}
