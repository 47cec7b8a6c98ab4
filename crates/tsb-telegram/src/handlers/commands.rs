use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{BotCommand, BotCommandScope, Recipient},
};
use tracing::warn;

use tsb_core::{
    access::AccessVerdict,
    buttons::unlock_keyboard,
    domain::{TicketId, TicketStatus, UserId},
    flows::{commit_registration, Flow, RegisterFlow, RegisterOutcome, Registration, TicketDraft},
    ports::TicketFilter,
    render,
};

use crate::router::AppState;

use super::{action_error_text, reply_html, reply_text};

/// Split `/cmd@botname arg1 ...` into a lowercase command name and its raw
/// argument string. Returns `None` for non-command text.
pub(crate) fn parse_command(text: &str) -> Option<(String, String)> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let args = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    if cmd.is_empty() {
        return None;
    }
    Some((cmd, args))
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    uid: UserId,
    cmd: String,
    args: String,
) -> ResponseResult<()> {
    match cmd.as_str() {
        "help" => reply_text(&state, uid, render::help_text()).await,
        "start" => cmd_start(bot, &msg, &state, uid, &args).await,
        "register" => cmd_register(&msg, &state, uid).await,
        "new_ticket" => cmd_new_ticket(&state, uid).await,
        "tickets" => cmd_tickets(&state, uid, &args).await,
        "cancel" => cmd_cancel(&state, uid, &args).await,
        "complete" => cmd_complete(&state, uid, &args).await,
        "check_admin" => cmd_check_admin(&msg, &state, uid).await,
        "block" => cmd_block(&state, uid, &args).await,
        "unblock" => cmd_unblock(&state, uid, &args).await,
        // Unknown commands (and stray /confirm, /reject outside a dialog)
        // are ignored.
        _ => {}
    }
    Ok(())
}

async fn cmd_start(bot: Bot, msg: &Message, state: &AppState, uid: UserId, args: &str) {
    if args == state.cfg.access_key {
        set_commands(&bot, state, uid).await;
        reply_text(
            state,
            uid,
            "Welcome to the bot!\nRegister with /register to continue, or see /help for the command reference.",
        )
        .await;
        return;
    }

    let username = msg
        .from()
        .and_then(|u| u.username.clone())
        .unwrap_or_else(|| uid.0.to_string());

    match state.gate.record_failed_access(uid, &username).await {
        Ok(AccessVerdict::AttemptsLeft(left)) => {
            reply_text(
                state,
                uid,
                &format!(
                    "You did not provide an access key, or your key is wrong. \
                     {left} attempts left before you are blocked."
                ),
            )
            .await;
        }
        Ok(AccessVerdict::NowBlocked) => {
            reply_text(
                state,
                uid,
                "You have been blocked. Contact the bot administrator to be unblocked.",
            )
            .await;
            let notice = format!(
                "User {} was blocked after {} start attempts without a key.",
                uid.0, state.cfg.access_attempts
            );
            if let Err(e) = state
                .messenger
                .send_keyboard(state.cfg.admin_id.chat(), &notice, unlock_keyboard(uid))
                .await
            {
                warn!("block notification failed: {e}");
            }
        }
        Err(e) => warn!("access attempt bookkeeping failed: {e}"),
    }
}

async fn cmd_register(msg: &Message, state: &AppState, uid: UserId) {
    let profile_name = msg.from().and_then(|u| {
        u.last_name
            .as_ref()
            .map(|last| (u.first_name.clone(), last.clone()))
    });

    let flow = RegisterFlow::begin(profile_name);
    let prompt = match &flow {
        RegisterFlow::CollectingName => "Send your first and last name.\nFor example: Ivan Petrov",
        _ => "Send your department.\nFor example: Development",
    };
    state.sessions.begin(uid, Flow::Register(flow)).await;
    reply_text(state, uid, prompt).await;
}

async fn cmd_new_ticket(state: &AppState, uid: UserId) {
    match state.store.user_by_uid(uid) {
        Ok(Some(_)) => {}
        Ok(None) => {
            reply_text(
                state,
                uid,
                "You are not registered with the bot; use /register first.",
            )
            .await;
            return;
        }
        Err(e) => {
            warn!("user lookup failed: {e}");
            return;
        }
    }

    state
        .sessions
        .begin(uid, Flow::NewTicket(TicketDraft::begin()))
        .await;
    reply_text(state, uid, "Briefly describe your problem:").await;
}

async fn cmd_tickets(state: &AppState, uid: UserId, args: &str) {
    match state.store.user_by_uid(uid) {
        Ok(Some(_)) => {}
        Ok(None) => {
            reply_text(state, uid, "You are not registered.").await;
            return;
        }
        Err(e) => {
            warn!("user lookup failed: {e}");
            return;
        }
    }

    let is_admin = state.cfg.is_admin(uid);
    if !is_admin && !args.is_empty() {
        reply_text(state, uid, "Arguments are ignored here; showing your tickets.").await;
    }

    let requested = match args {
        "new" if is_admin => Some(TicketStatus::New),
        _ => None,
    };

    let tickets = match state.lifecycle.list(uid, requested) {
        Ok(tickets) => tickets,
        Err(e) => {
            warn!("ticket listing failed: {e}");
            return;
        }
    };

    if tickets.is_empty() {
        let text = if is_admin {
            "There are no tickets in the database."
        } else {
            "You have not created any tickets yet."
        };
        reply_text(state, uid, text).await;
        return;
    }

    for ticket in tickets {
        match state.lifecycle.ticket_owner(&ticket) {
            Ok(owner) => {
                reply_html(state, uid, &render::ticket_listing(&owner, &ticket)).await;
            }
            Err(e) => warn!(id = ticket.id.0, "owner lookup failed: {e}"),
        }
    }
}

async fn cmd_cancel(state: &AppState, uid: UserId, args: &str) {
    let Some(id) = parse_ticket_id(args) else {
        reply_text(
            state,
            uid,
            "Usage: /cancel <ticket number>.\nCancelling means the problem will not be worked on \
             (for example, the ticket was created by mistake).",
        )
        .await;
        send_active_tickets(state, uid).await;
        return;
    };

    let result = if state.cfg.is_admin(uid) {
        state.lifecycle.cancel_by_admin(id).await
    } else {
        state.lifecycle.cancel_by_owner(uid, id).await
    };

    match result {
        Ok(ticket) => {
            reply_text(
                state,
                uid,
                &format!("Ticket {} has been cancelled.", ticket.id),
            )
            .await;
        }
        Err(e) => reply_text(state, uid, &action_error_text(&e)).await,
    }
}

async fn cmd_complete(state: &AppState, uid: UserId, args: &str) {
    let Some(id) = parse_ticket_id(args) else {
        reply_text(
            state,
            uid,
            "Usage: /complete <ticket number>.\nUse this when the problem is solved.",
        )
        .await;
        send_active_tickets(state, uid).await;
        return;
    };

    let result = if state.cfg.is_admin(uid) {
        state.lifecycle.complete_by_admin(id).await
    } else {
        state.lifecycle.complete_by_owner(uid, id).await
    };

    match result {
        Ok(ticket) => {
            reply_text(
                state,
                uid,
                &format!("Ticket {} has been completed.", ticket.id),
            )
            .await;
        }
        Err(e) => reply_text(state, uid, &action_error_text(&e)).await,
    }
}

async fn cmd_check_admin(msg: &Message, state: &AppState, uid: UserId) {
    if !state.cfg.is_admin(uid) {
        reply_text(state, uid, "No administrator rights.").await;
        return;
    }
    reply_text(state, uid, "Administrator rights confirmed.").await;

    // Self-register the administrator when the profile carries a full name.
    let already = matches!(state.store.user_by_uid(uid), Ok(Some(_)));
    let profile_name = msg.from().and_then(|u| {
        u.last_name
            .as_ref()
            .map(|last| (u.first_name.clone(), last.clone()))
    });
    let Some((first_name, last_name)) = profile_name else {
        return;
    };
    if already {
        return;
    }

    let registration = Registration {
        first_name,
        last_name,
        department: "Admin".to_string(),
    };
    match commit_registration(state.store.as_ref(), uid, registration, true) {
        Ok(RegisterOutcome::Created(_)) => {
            reply_text(state, uid, "You have been registered as the administrator.").await;
        }
        Ok(RegisterOutcome::AlreadyRegistered) => {}
        Err(e) => warn!("administrator self-registration failed: {e}"),
    }
}

async fn cmd_block(state: &AppState, uid: UserId, args: &str) {
    if !state.cfg.is_admin(uid) {
        return;
    }
    let Some(target) = parse_uid(args) else {
        reply_text(state, uid, "Provide the UID of the user to block.").await;
        return;
    };

    if let Err(e) = state.gate.block(target, "Added by admin.") {
        warn!("block failed: {e}");
        return;
    }
    reply_text(
        state,
        target,
        "You have been blocked by the bot administrator.",
    )
    .await;
    reply_text(state, uid, &format!("User {} is blocked.", target.0)).await;
}

async fn cmd_unblock(state: &AppState, uid: UserId, args: &str) {
    if !state.cfg.is_admin(uid) {
        return;
    }

    let Some(target) = parse_uid(args) else {
        reply_text(state, uid, "Provide the UID of the user to unblock.").await;
        match state.store.blocked_users() {
            Ok(blocked) if blocked.is_empty() => {
                reply_text(state, uid, "There are no blocked users right now.").await;
            }
            Ok(blocked) => {
                for user in blocked {
                    let line = render::blocked_user_line(&user);
                    if let Err(e) = state
                        .messenger
                        .send_keyboard(uid.chat(), &line, unlock_keyboard(user.user_uid))
                        .await
                    {
                        warn!("blocked-user listing failed: {e}");
                    }
                }
            }
            Err(e) => warn!("blocked-user listing failed: {e}"),
        }
        return;
    };

    match state.gate.is_blocked(target) {
        Ok(true) => {}
        Ok(false) => {
            reply_text(state, uid, &format!("User {} is not blocked.", target.0)).await;
            return;
        }
        Err(e) => {
            warn!("blocked check failed: {e}");
            return;
        }
    }

    if let Err(e) = state.gate.unblock(target).await {
        warn!("unblock failed: {e}");
        return;
    }
    reply_text(
        state,
        target,
        "You have been unblocked by the bot administrator.",
    )
    .await;
    reply_text(state, uid, &format!("User {} is unblocked.", target.0)).await;
}

async fn send_active_tickets(state: &AppState, uid: UserId) {
    match state.store.list_tickets(TicketFilter::Owner(uid)) {
        Ok(tickets) => reply_html(state, uid, &render::active_tickets(&tickets)).await,
        Err(e) => warn!("active ticket listing failed: {e}"),
    }
}

fn parse_ticket_id(args: &str) -> Option<TicketId> {
    args.trim().parse::<i64>().ok().map(TicketId)
}

fn parse_uid(args: &str) -> Option<UserId> {
    args.trim().parse::<i64>().ok().map(UserId)
}

/// Register the command menu with Telegram after a successful `/start`.
/// The administrator's private chat additionally sees the admin commands.
async fn set_commands(bot: &Bot, state: &AppState, uid: UserId) {
    let mut commands = vec![
        BotCommand::new("register", "Register with the bot"),
        BotCommand::new("new_ticket", "Open a new support ticket"),
        BotCommand::new("tickets", "List your tickets"),
        BotCommand::new("cancel", "Cancel a ticket"),
        BotCommand::new("complete", "Close a ticket yourself"),
        BotCommand::new("help", "Command reference"),
    ];

    if state.cfg.is_admin(uid) {
        commands.extend([
            BotCommand::new("check_admin", "Verify administrator status"),
            BotCommand::new("block", "Block a user"),
            BotCommand::new("unblock", "Unblock a user"),
        ]);
        let scope = BotCommandScope::Chat {
            chat_id: Recipient::Id(teloxide::types::ChatId(uid.0)),
        };
        if let Err(e) = bot.set_my_commands(commands).scope(scope).await {
            warn!("set_my_commands failed: {e}");
        }
    } else if let Err(e) = bot.set_my_commands(commands).await {
        warn!("set_my_commands failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_bot_suffix_and_args() {
        assert_eq!(
            parse_command("/start secret-key"),
            Some(("start".to_string(), "secret-key".to_string()))
        );
        assert_eq!(
            parse_command("/tickets@tsb_bot new"),
            Some(("tickets".to_string(), "new".to_string()))
        );
        assert_eq!(
            parse_command("/CANCEL 7"),
            Some(("cancel".to_string(), "7".to_string()))
        );
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command("/"), None);
    }

    #[test]
    fn ticket_id_parsing_rejects_garbage() {
        assert_eq!(parse_ticket_id(" 7 "), Some(TicketId(7)));
        assert_eq!(parse_ticket_id("seven"), None);
        assert_eq!(parse_ticket_id(""), None);
    }
}
