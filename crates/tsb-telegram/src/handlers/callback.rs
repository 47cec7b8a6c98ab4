use std::sync::Arc;

use teloxide::{prelude::*, types::CallbackQuery};
use tracing::warn;

use tsb_core::{
    buttons::{parse_callback, ticket_keyboard, CallbackAction, TicketKeyboard},
    domain::{ChatId, MessageId, MessageRef, UserId},
    render,
};

use crate::router::AppState;

use super::{action_error_text, reply_text};

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let actor = UserId(q.from.id.0 as i64);
    let data = q.data.clone().unwrap_or_default();

    // Acknowledge early returns too, so the client stops its spinner.
    let ack = |cb_id: String, state: Arc<AppState>| async move {
        if let Err(e) = state.messenger.answer_callback(&cb_id).await {
            warn!("answer_callback failed: {e}");
        }
    };

    let Some(message) = q.message.as_ref() else {
        ack(q.id.clone(), state).await;
        return Ok(());
    };
    let pressed = MessageRef {
        chat_id: ChatId(message.chat.id.0),
        message_id: MessageId(message.id.0),
    };

    let Some(action) = parse_callback(&data) else {
        ack(q.id.clone(), state).await;
        return Ok(());
    };

    let is_admin = state.cfg.is_admin(actor);

    match action {
        CallbackAction::Accept(id) if is_admin => {
            match state.lifecycle.accept(id).await {
                Ok(ticket) => {
                    let text = format!(
                        "Ticket {} accepted into work.\nDescription: {}",
                        ticket.id,
                        render::escape_html(&ticket.description)
                    );
                    if let Err(e) = state
                        .messenger
                        .edit_keyboard(pressed, &text, ticket_keyboard(TicketKeyboard::InWork, id))
                        .await
                    {
                        warn!("message edit failed: {e}");
                    }
                }
                Err(e) => reply_text(&state, actor, &action_error_text(&e)).await,
            }
        }
        CallbackAction::AdminCancel(id) if is_admin => {
            match state.lifecycle.cancel_by_admin(id).await {
                Ok(ticket) => {
                    let text = format!("Ticket {} cancelled.", ticket.id);
                    if let Err(e) = state.messenger.edit_html(pressed, &text).await {
                        warn!("message edit failed: {e}");
                    }
                }
                Err(e) => reply_text(&state, actor, &action_error_text(&e)).await,
            }
        }
        CallbackAction::Complete(id) if is_admin => {
            match state.lifecycle.complete_by_admin(id).await {
                Ok(ticket) => {
                    let text = format!("Ticket {} completed.", ticket.id);
                    if let Err(e) = state.messenger.edit_html(pressed, &text).await {
                        warn!("message edit failed: {e}");
                    }
                }
                Err(e) => reply_text(&state, actor, &action_error_text(&e)).await,
            }
        }
        CallbackAction::OwnerCancel(id) => match state.lifecycle.cancel_by_owner(actor, id).await {
            Ok(ticket) => {
                let text = format!("You cancelled ticket {}.", ticket.id);
                if let Err(e) = state.messenger.edit_html(pressed, &text).await {
                    warn!("message edit failed: {e}");
                }
            }
            Err(e) => reply_text(&state, actor, &action_error_text(&e)).await,
        },
        CallbackAction::Unlock(target) if is_admin => {
            match state.gate.is_blocked(target) {
                Ok(true) => {
                    if let Err(e) = state.gate.unblock(target).await {
                        warn!("unblock failed: {e}");
                    } else {
                        let text = format!("User {} is unblocked.", target.0);
                        if let Err(e) = state.messenger.edit_html(pressed, &text).await {
                            warn!("message edit failed: {e}");
                        }
                        reply_text(
                            &state,
                            target,
                            "You have been unblocked by the bot administrator.",
                        )
                        .await;
                    }
                }
                Ok(false) => {
                    let text = format!("User {} is not blocked.", target.0);
                    if let Err(e) = state.messenger.edit_html(pressed, &text).await {
                        warn!("message edit failed: {e}");
                    }
                }
                Err(e) => warn!("blocked check failed: {e}"),
            }
        }
        // Administrator-only buttons pressed by someone else: ignore.
        _ => {}
    }

    ack(q.id.clone(), state).await;
    Ok(())
}
