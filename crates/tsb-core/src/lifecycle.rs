//! Ticket lifecycle controller.
//!
//! The only code path that creates tickets or changes their status. Status
//! follows a fixed one-directional graph:
//!
//! ```text
//! new ----accept----> in_work
//! new ----cancel----> rejected
//! in_work --cancel--> rejected
//! in_work -complete-> completed
//! ```
//!
//! Every transition stamps `last_updated`, records an actor-specific reason
//! when it lands in a terminal status, and notifies the counterpart party
//! (administrator actions inform the requester and vice versa).

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::{
    buttons::{ticket_keyboard, TicketKeyboard},
    domain::{NewTicket, Ticket, TicketId, TicketStatus, User, UserId},
    ports::{MessagingPort, Storage, TicketFilter},
    render, Error, Result,
};

/// An edge label in the status graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketAction {
    Accept,
    Cancel,
    Complete,
}

impl TicketAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketAction::Accept => "accept",
            TicketAction::Cancel => "cancel",
            TicketAction::Complete => "complete",
        }
    }
}

/// Who is driving a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Actor {
    Administrator,
    Requester,
}

/// The status graph. `None` means the edge does not exist.
pub fn next_status(current: TicketStatus, action: TicketAction) -> Option<TicketStatus> {
    match (current, action) {
        (TicketStatus::New, TicketAction::Accept) => Some(TicketStatus::InWork),
        (TicketStatus::New, TicketAction::Cancel) => Some(TicketStatus::Rejected),
        (TicketStatus::InWork, TicketAction::Cancel) => Some(TicketStatus::Rejected),
        (TicketStatus::InWork, TicketAction::Complete) => Some(TicketStatus::Completed),
        _ => None,
    }
}

/// Default `update_reason` recorded for terminal transitions.
pub fn default_reason(actor: Actor, action: TicketAction) -> Option<&'static str> {
    match (actor, action) {
        (Actor::Administrator, TicketAction::Cancel) => Some("Ticket cancelled by administrator."),
        (Actor::Requester, TicketAction::Cancel) => Some("Ticket cancelled by requester."),
        (Actor::Administrator, TicketAction::Complete) => {
            Some("Ticket completed by administrator.")
        }
        (Actor::Requester, TicketAction::Complete) => Some("Ticket completed by requester."),
        (_, TicketAction::Accept) => None,
    }
}

pub struct TicketLifecycle {
    store: Arc<dyn Storage>,
    messenger: Arc<dyn MessagingPort>,
    admin_id: UserId,
}

impl TicketLifecycle {
    pub fn new(
        store: Arc<dyn Storage>,
        messenger: Arc<dyn MessagingPort>,
        admin_id: UserId,
    ) -> Self {
        Self {
            store,
            messenger,
            admin_id,
        }
    }

    /// Persist a new ticket and fan out its summary: the administrator gets
    /// accept/cancel buttons; a non-administrator requester also gets their
    /// own copy with a cancel button.
    pub async fn submit(&self, owner: &User, title: String, description: String) -> Result<Ticket> {
        let ticket = self.store.add_ticket(
            &NewTicket {
                user_uid: owner.user_uid,
                title,
                description,
            },
            Utc::now(),
        )?;
        info!(id = ticket.id.0, owner = owner.user_uid.0, "ticket created");

        self.messenger
            .send_keyboard(
                self.admin_id.chat(),
                &render::new_ticket_notification(owner, &ticket),
                ticket_keyboard(TicketKeyboard::Triage, ticket.id),
            )
            .await?;

        if owner.user_uid != self.admin_id {
            self.messenger
                .send_keyboard(
                    owner.user_uid.chat(),
                    &render::ticket_summary(owner, &ticket),
                    ticket_keyboard(TicketKeyboard::OwnerCancel, ticket.id),
                )
                .await?;
        }

        Ok(ticket)
    }

    /// Administrator accepts a fresh ticket into work.
    pub async fn accept(&self, id: TicketId) -> Result<Ticket> {
        let ticket = self
            .transition(id, Actor::Administrator, TicketAction::Accept)
            .await?;
        self.messenger
            .send_html(
                ticket.user_uid.chat(),
                &format!(
                    "Your ticket {}\nDescription: {}\nhas been accepted into work!",
                    ticket.id,
                    render::escape_html(&ticket.description)
                ),
            )
            .await?;
        Ok(ticket)
    }

    pub async fn cancel_by_admin(&self, id: TicketId) -> Result<Ticket> {
        let ticket = self
            .transition(id, Actor::Administrator, TicketAction::Cancel)
            .await?;
        self.messenger
            .send_html(
                ticket.user_uid.chat(),
                &format!("Your ticket {} has been cancelled.", ticket.id),
            )
            .await?;
        Ok(ticket)
    }

    pub async fn complete_by_admin(&self, id: TicketId) -> Result<Ticket> {
        let ticket = self
            .transition(id, Actor::Administrator, TicketAction::Complete)
            .await?;
        self.messenger
            .send_html(
                ticket.user_uid.chat(),
                &format!(
                    "Your ticket {}\nDescription: {}\nhas been completed!",
                    ticket.id,
                    render::escape_html(&ticket.description)
                ),
            )
            .await?;
        Ok(ticket)
    }

    /// Requester cancels their own ticket; the administrator is informed.
    pub async fn cancel_by_owner(&self, actor: UserId, id: TicketId) -> Result<Ticket> {
        self.check_owner(actor, id)?;
        let ticket = self
            .transition(id, Actor::Requester, TicketAction::Cancel)
            .await?;
        self.messenger
            .send_html(
                self.admin_id.chat(),
                &format!("Ticket {} was cancelled by the requester.", ticket.id),
            )
            .await?;
        Ok(ticket)
    }

    /// Requester closes their own in-work ticket; the administrator is
    /// informed.
    pub async fn complete_by_owner(&self, actor: UserId, id: TicketId) -> Result<Ticket> {
        self.check_owner(actor, id)?;
        let ticket = self
            .transition(id, Actor::Requester, TicketAction::Complete)
            .await?;
        self.messenger
            .send_html(
                self.admin_id.chat(),
                &format!("Ticket {} was completed by the requester.", ticket.id),
            )
            .await?;
        Ok(ticket)
    }

    /// Tickets visible to `requester`: the administrator sees everything
    /// (optionally narrowed to one status); everyone else sees only their
    /// own tickets no matter what they asked for.
    pub fn list(
        &self,
        requester: UserId,
        requested: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>> {
        let filter = if requester == self.admin_id {
            match requested {
                Some(status) => TicketFilter::Status(status),
                None => TicketFilter::All,
            }
        } else {
            TicketFilter::Owner(requester)
        };
        self.store.list_tickets(filter)
    }

    pub fn ticket_owner(&self, ticket: &Ticket) -> Result<User> {
        self.store
            .user_by_uid(ticket.user_uid)?
            .ok_or_else(|| Error::Storage(format!("no user row for uid {}", ticket.user_uid.0)))
    }

    fn check_owner(&self, actor: UserId, id: TicketId) -> Result<()> {
        let ticket = self
            .store
            .ticket_by_id(id)?
            .ok_or(Error::TicketNotFound(id))?;
        if ticket.user_uid != actor {
            return Err(Error::NotTicketOwner(id));
        }
        Ok(())
    }

    async fn transition(
        &self,
        id: TicketId,
        actor: Actor,
        action: TicketAction,
    ) -> Result<Ticket> {
        let ticket = self
            .store
            .ticket_by_id(id)?
            .ok_or(Error::TicketNotFound(id))?;

        let Some(next) = next_status(ticket.status, action) else {
            return Err(Error::InvalidTransition {
                id,
                status: ticket.status,
                action: action.as_str(),
            });
        };

        let reason = default_reason(actor, action);
        let now = Utc::now();
        self.store.update_ticket_status(id, next, reason, now)?;
        info!(
            id = id.0,
            from = ticket.status.as_str(),
            to = next.as_str(),
            "ticket status changed"
        );

        Ok(Ticket {
            status: next,
            update_reason: reason.map(str::to_string),
            last_updated: now,
            ..ticket
        })
    }
}
