//! Telegram update handlers.
//!
//! `handle_message` gates everything on block status, then splits inbound
//! text into commands and dialog input; button presses land in
//! `handle_callback`.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, ChatMemberUpdated, Message},
};
use tracing::warn;

use tsb_core::{domain::UserId, Error};

use crate::router::AppState;

mod callback;
mod commands;
mod text;

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Only private chats carry commands; group joins are handled by
    // handle_my_chat_member.
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(user) = msg.from() else {
        return Ok(());
    };
    if user.is_bot {
        return Ok(());
    }
    let uid = UserId(user.id.0 as i64);
    let Some(message_text) = msg.text() else {
        return Ok(());
    };

    let command = commands::parse_command(message_text);

    // Blocked users are short-circuited everywhere; /help stays silent.
    match state.gate.is_blocked(uid) {
        Ok(true) => {
            if command.as_ref().map(|(cmd, _)| cmd.as_str()) != Some("help") {
                reply_text(&state, uid, "You are blocked. Contact the administrator.").await;
            }
            return Ok(());
        }
        Ok(false) => {}
        Err(e) => {
            warn!("blocked check failed: {e}");
            return Ok(());
        }
    }

    if let Some((cmd, args)) = command {
        // /confirm and /reject belong to an in-flight dialog.
        if matches!(cmd.as_str(), "confirm" | "reject") && state.sessions.is_active(uid).await {
            return text::handle_flow_input(state, uid, message_text).await;
        }
        return commands::handle_command(bot, msg.clone(), state, uid, cmd, args).await;
    }

    text::handle_flow_input(state, uid, message_text).await
}

pub async fn handle_my_chat_member(bot: Bot, upd: ChatMemberUpdated) -> ResponseResult<()> {
    if upd.chat.is_private() {
        return Ok(());
    }
    if upd.new_chat_member.kind.is_present() {
        let _ = bot.send_message(upd.chat.id, "I don't work in groups.").await;
        let _ = bot.leave_chat(upd.chat.id).await;
    }
    Ok(())
}

/// Best-effort plain-text reply to a user's private chat.
pub(crate) async fn reply_text(state: &AppState, uid: UserId, text: &str) {
    if let Err(e) = state.messenger.send_text(uid.chat(), text).await {
        warn!(uid = uid.0, "send failed: {e}");
    }
}

/// Best-effort HTML reply to a user's private chat.
pub(crate) async fn reply_html(state: &AppState, uid: UserId, html: &str) {
    if let Err(e) = state.messenger.send_html(uid.chat(), html).await {
        warn!(uid = uid.0, "send failed: {e}");
    }
}

/// User-visible text for a refused ticket action.
pub(crate) fn action_error_text(e: &Error) -> String {
    match e {
        Error::TicketNotFound(id) => format!("There is no ticket with number {id}."),
        Error::NotTicketOwner(id) => format!("Ticket {id} was created by another user."),
        Error::InvalidTransition { id, status, action } => {
            format!("Cannot {action} ticket {id}: it is {status}.")
        }
        other => {
            warn!("ticket action failed: {other}");
            "Something went wrong, try again later.".to_string()
        }
    }
}
