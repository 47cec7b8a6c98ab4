use crate::domain::{TicketId, TicketStatus};

/// Core error type.
///
/// Adapter crates map their specific errors into this type so the bot core
/// can handle failures consistently (user-facing message vs fatal).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("no ticket with id {0}")]
    TicketNotFound(TicketId),

    #[error("ticket {0} belongs to another user")]
    NotTicketOwner(TicketId),

    #[error("ticket {id} is {status}, cannot {action}")]
    InvalidTransition {
        id: TicketId,
        status: TicketStatus,
        action: &'static str,
    },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
