use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telegram user id (numeric). For this bot every conversation is a private
/// chat, so the user id doubles as the chat id on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a previously sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Ticket number, assigned by the store on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub i64);

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl UserId {
    /// The private chat shared with this user.
    pub fn chat(self) -> ChatId {
        ChatId(self.0)
    }
}

/// Ticket lifecycle status. Transitions are owned by
/// [`crate::lifecycle::TicketLifecycle`]; `Completed` and `Rejected` are
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    New,
    InWork,
    Completed,
    Rejected,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::InWork => "in_work",
            TicketStatus::Completed => "completed",
            TicketStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Completed | TicketStatus::Rejected)
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(TicketStatus::New),
            "in_work" => Ok(TicketStatus::InWork),
            "completed" => Ok(TicketStatus::Completed),
            "rejected" => Ok(TicketStatus::Rejected),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered user. Created once at registration, immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_uid: UserId,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub priority: i64,
}

/// Priority assigned to the administrator account at registration.
pub const ADMIN_PRIORITY: i64 = 99;

/// A support ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub user_uid: UserId,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    /// Set iff `status` is terminal.
    pub update_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Ticket fields collected by the creation flow; the store assigns the id
/// and timestamps on insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTicket {
    pub user_uid: UserId,
    pub title: String,
    pub description: String,
}

/// A denied user. Row presence is the single source of truth for "blocked".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedUser {
    pub user_uid: UserId,
    /// Username at block time, or a note for administrator-issued blocks.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            TicketStatus::New,
            TicketStatus::InWork,
            TicketStatus::Completed,
            TicketStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<TicketStatus>(), Ok(status));
        }
        assert!("cancelled".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TicketStatus::New.is_terminal());
        assert!(!TicketStatus::InWork.is_terminal());
        assert!(TicketStatus::Completed.is_terminal());
        assert!(TicketStatus::Rejected.is_terminal());
    }
}
