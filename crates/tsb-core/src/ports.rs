use async_trait::async_trait;

use crate::{
    domain::{
        BlockedUser, ChatId, MessageRef, NewTicket, Ticket, TicketId, TicketStatus, User, UserId,
    },
    Result,
};

/// Inline keyboard (action buttons) attached to an outgoing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    /// All buttons on a single row.
    pub fn single_row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }
}

/// Port for the chat transport (Telegram in production).
///
/// The core only needs plain sends, keyboard sends, in-place edits and
/// callback acknowledgement; everything else about the transport stays in
/// the adapter crate.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    /// Replace a message's text, dropping any keyboard it carried.
    async fn edit_html(&self, message: MessageRef, html: &str) -> Result<()>;
    /// Replace a message's text and keyboard.
    async fn edit_keyboard(
        &self,
        message: MessageRef,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<()>;

    /// Acknowledge a callback query so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}

/// Filter for ticket listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketFilter {
    All,
    Owner(UserId),
    Status(TicketStatus),
}

/// Port for the relational store.
///
/// All operations are synchronous request/response; each call is a single
/// statement treated as atomic. Implemented over SQLite in `tsb-storage`.
pub trait Storage: Send + Sync {
    fn user_by_uid(&self, uid: UserId) -> Result<Option<User>>;
    fn add_user(&self, user: &User) -> Result<()>;

    fn is_blocked(&self, uid: UserId) -> Result<bool>;
    fn add_blocked_user(&self, uid: UserId, reason: &str) -> Result<()>;
    fn remove_blocked_user(&self, uid: UserId) -> Result<()>;
    fn blocked_users(&self) -> Result<Vec<BlockedUser>>;

    /// Insert a ticket with status `new`; returns the stored row with its
    /// assigned id.
    fn add_ticket(&self, ticket: &NewTicket, now: chrono::DateTime<chrono::Utc>)
        -> Result<Ticket>;
    fn ticket_by_id(&self, id: TicketId) -> Result<Option<Ticket>>;
    /// Tickets matching `filter`, in creation order.
    fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>>;
    fn update_ticket_status(
        &self,
        id: TicketId,
        status: TicketStatus,
        reason: Option<&str>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<()>;
}
