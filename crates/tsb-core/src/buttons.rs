//! Inline keyboard layouts and their callback-data wire format.
//!
//! Callback data is `ticket:<action>:<id>` or `user:unlock:<uid>`; parsing
//! is forgiving (unknown or malformed data yields `None` and the caller
//! just acknowledges the press).

use crate::{
    domain::{TicketId, UserId},
    ports::{InlineButton, InlineKeyboard},
};

/// Which action set a ticket message offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketKeyboard {
    /// Administrator's buttons on a fresh ticket: accept / cancel.
    Triage,
    /// Administrator's buttons once accepted: cancel / complete.
    InWork,
    /// Requester's button on their own copy: cancel.
    OwnerCancel,
}

pub fn ticket_keyboard(kind: TicketKeyboard, id: TicketId) -> InlineKeyboard {
    let row = match kind {
        TicketKeyboard::Triage => vec![
            InlineButton::new("Accept ticket", format!("ticket:accept:{id}")),
            InlineButton::new("Cancel ticket", format!("ticket:cancel:{id}")),
        ],
        TicketKeyboard::InWork => vec![
            InlineButton::new("Cancel ticket", format!("ticket:cancel:{id}")),
            InlineButton::new("Complete ticket", format!("ticket:complete:{id}")),
        ],
        TicketKeyboard::OwnerCancel => vec![InlineButton::new(
            "Cancel ticket",
            format!("ticket:own-cancel:{id}"),
        )],
    };
    InlineKeyboard::single_row(row)
}

pub fn unlock_keyboard(uid: UserId) -> InlineKeyboard {
    InlineKeyboard::single_row(vec![InlineButton::new(
        "Unblock user",
        format!("user:unlock:{}", uid.0),
    )])
}

/// A parsed button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Accept(TicketId),
    AdminCancel(TicketId),
    OwnerCancel(TicketId),
    Complete(TicketId),
    Unlock(UserId),
}

pub fn parse_callback(data: &str) -> Option<CallbackAction> {
    let mut parts = data.splitn(3, ':');
    let (scope, action, raw_id) = (parts.next()?, parts.next()?, parts.next()?);
    let id = raw_id.parse::<i64>().ok()?;

    match (scope, action) {
        ("ticket", "accept") => Some(CallbackAction::Accept(TicketId(id))),
        ("ticket", "cancel") => Some(CallbackAction::AdminCancel(TicketId(id))),
        ("ticket", "own-cancel") => Some(CallbackAction::OwnerCancel(TicketId(id))),
        ("ticket", "complete") => Some(CallbackAction::Complete(TicketId(id))),
        ("user", "unlock") => Some(CallbackAction::Unlock(UserId(id))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboards_round_trip_through_parse() {
        let kb = ticket_keyboard(TicketKeyboard::Triage, TicketId(7));
        let data: Vec<_> = kb.rows[0].iter().map(|b| b.callback_data.as_str()).collect();
        assert_eq!(
            data.iter().map(|d| parse_callback(d)).collect::<Vec<_>>(),
            vec![
                Some(CallbackAction::Accept(TicketId(7))),
                Some(CallbackAction::AdminCancel(TicketId(7))),
            ]
        );

        let kb = ticket_keyboard(TicketKeyboard::OwnerCancel, TicketId(3));
        assert_eq!(
            parse_callback(&kb.rows[0][0].callback_data),
            Some(CallbackAction::OwnerCancel(TicketId(3)))
        );

        let kb = unlock_keyboard(UserId(42));
        assert_eq!(
            parse_callback(&kb.rows[0][0].callback_data),
            Some(CallbackAction::Unlock(UserId(42)))
        );
    }

    #[test]
    fn malformed_callback_data_is_rejected() {
        assert_eq!(parse_callback(""), None);
        assert_eq!(parse_callback("ticket:accept"), None);
        assert_eq!(parse_callback("ticket:accept:seven"), None);
        assert_eq!(parse_callback("ticket:promote:7"), None);
        assert_eq!(parse_callback("askuser:1:2"), None);
    }
}
