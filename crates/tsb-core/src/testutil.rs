//! In-memory fakes shared by the core unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{
        BlockedUser, ChatId, MessageId, MessageRef, NewTicket, Ticket, TicketId, TicketStatus,
        User, UserId,
    },
    ports::{InlineKeyboard, MessagingPort, Storage, TicketFilter},
    Error, Result,
};

#[derive(Default)]
pub struct MemStore {
    users: Mutex<Vec<User>>,
    blocked: Mutex<Vec<BlockedUser>>,
    tickets: Mutex<Vec<Ticket>>,
}

impl Storage for MemStore {
    fn user_by_uid(&self, uid: UserId) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_uid == uid)
            .cloned())
    }

    fn add_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.user_uid == user.user_uid) {
            return Err(Error::Storage("duplicate user_uid".to_string()));
        }
        users.push(user.clone());
        Ok(())
    }

    fn is_blocked(&self, uid: UserId) -> Result<bool> {
        Ok(self
            .blocked
            .lock()
            .unwrap()
            .iter()
            .any(|b| b.user_uid == uid))
    }

    fn add_blocked_user(&self, uid: UserId, reason: &str) -> Result<()> {
        self.blocked.lock().unwrap().push(BlockedUser {
            user_uid: uid,
            reason: reason.to_string(),
        });
        Ok(())
    }

    fn remove_blocked_user(&self, uid: UserId) -> Result<()> {
        self.blocked.lock().unwrap().retain(|b| b.user_uid != uid);
        Ok(())
    }

    fn blocked_users(&self) -> Result<Vec<BlockedUser>> {
        Ok(self.blocked.lock().unwrap().clone())
    }

    fn add_ticket(&self, ticket: &NewTicket, now: DateTime<Utc>) -> Result<Ticket> {
        let mut tickets = self.tickets.lock().unwrap();
        let stored = Ticket {
            id: TicketId(tickets.len() as i64 + 1),
            user_uid: ticket.user_uid,
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            status: TicketStatus::New,
            update_reason: None,
            created_at: now,
            last_updated: now,
        };
        tickets.push(stored.clone());
        Ok(stored)
    }

    fn ticket_by_id(&self, id: TicketId) -> Result<Option<Ticket>> {
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>> {
        let tickets = self.tickets.lock().unwrap();
        Ok(tickets
            .iter()
            .filter(|t| match filter {
                TicketFilter::All => true,
                TicketFilter::Owner(uid) => t.user_uid == uid,
                TicketFilter::Status(status) => t.status == status,
            })
            .cloned()
            .collect())
    }

    fn update_ticket_status(
        &self,
        id: TicketId,
        status: TicketStatus,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut tickets = self.tickets.lock().unwrap();
        let ticket = tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::TicketNotFound(id))?;
        ticket.status = status;
        ticket.update_reason = reason.map(str::to_string);
        ticket.last_updated = now;
        Ok(())
    }
}

/// A sent message captured by [`RecordingMessenger`].
#[derive(Clone, Debug)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<SentMessage>>,
}

impl RecordingMessenger {
    pub fn sent_to(&self, chat_id: ChatId) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    fn record(&self, chat_id: ChatId, text: &str, keyboard: Option<InlineKeyboard>) -> MessageRef {
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
        MessageRef {
            chat_id,
            message_id: MessageId(sent.len() as i32),
        }
    }
}

#[async_trait]
impl MessagingPort for RecordingMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        Ok(self.record(chat_id, text, None))
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        Ok(self.record(chat_id, html, None))
    }

    async fn send_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        Ok(self.record(chat_id, html, Some(keyboard)))
    }

    async fn edit_html(&self, _message: MessageRef, _html: &str) -> Result<()> {
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        _message: MessageRef,
        _html: &str,
        _keyboard: InlineKeyboard,
    ) -> Result<()> {
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str) -> Result<()> {
        Ok(())
    }
}
