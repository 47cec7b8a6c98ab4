use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use tsb_core::{
    domain::UserId,
    flows::{
        commit_registration, Flow, RegisterAdvance, RegisterOutcome, TicketAdvance,
    },
};

use crate::router::AppState;

use super::reply_text;

/// Feed one non-command message into the user's in-flight dialog, if any.
pub async fn handle_flow_input(
    state: Arc<AppState>,
    uid: UserId,
    input: &str,
) -> ResponseResult<()> {
    let Some(flow) = state.sessions.take(uid).await else {
        return Ok(());
    };

    match flow {
        Flow::Register(flow) => {
            let (next, outcome) = flow.advance(input);
            if let Some(next) = next {
                state.sessions.put(uid, Flow::Register(next)).await;
            }
            register_outcome(&state, uid, outcome).await;
        }
        Flow::NewTicket(draft) => {
            let (next, outcome) = draft.advance(input);
            if let Some(next) = next {
                state.sessions.put(uid, Flow::NewTicket(next)).await;
            }
            ticket_outcome(&state, uid, outcome).await;
        }
    }

    Ok(())
}

async fn register_outcome(state: &AppState, uid: UserId, outcome: RegisterAdvance) {
    match outcome {
        RegisterAdvance::InvalidName => {
            reply_text(state, uid, "Invalid format. Send your first and last name.").await;
        }
        RegisterAdvance::NeedDepartment => {
            reply_text(state, uid, "Send your department.\nFor example: Development").await;
        }
        RegisterAdvance::InvalidDepartment => {
            reply_text(state, uid, "Invalid format. Send your department.").await;
        }
        RegisterAdvance::NeedConfirmation(registration) => {
            reply_text(
                state,
                uid,
                &format!(
                    "Check your details and confirm the registration.\n\
                     First name: {}\nLast name: {}\nDepartment: {}\n\n\
                     Send /confirm to confirm, or /reject to cancel.",
                    registration.first_name, registration.last_name, registration.department
                ),
            )
            .await;
        }
        RegisterAdvance::InvalidConfirmation => {
            reply_text(
                state,
                uid,
                "Unknown reply. Send /confirm to confirm, or /reject to cancel.",
            )
            .await;
        }
        RegisterAdvance::Rejected => {
            reply_text(state, uid, "Registration cancelled.").await;
        }
        RegisterAdvance::Confirmed(registration) => {
            let is_admin = state.cfg.is_admin(uid);
            match commit_registration(state.store.as_ref(), uid, registration, is_admin) {
                Ok(RegisterOutcome::Created(user)) => {
                    reply_text(
                        state,
                        uid,
                        &format!(
                            "{}, welcome to the bot!\nYou are registered.",
                            user.first_name
                        ),
                    )
                    .await;
                }
                Ok(RegisterOutcome::AlreadyRegistered) => {
                    reply_text(state, uid, "You are already registered!").await;
                }
                Err(e) => {
                    warn!("registration commit failed: {e}");
                    reply_text(state, uid, "Registration failed, please try again.").await;
                }
            }
        }
    }
}

async fn ticket_outcome(state: &AppState, uid: UserId, outcome: TicketAdvance) {
    match outcome {
        TicketAdvance::NeedDescription => {
            reply_text(state, uid, "Now describe your problem in detail:").await;
        }
        TicketAdvance::Submit { title, description } => {
            let owner = match state.store.user_by_uid(uid) {
                Ok(Some(owner)) => owner,
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
            };

            // submit() sends both the administrator notification and the
            // requester's own copy.
            if let Err(e) = state.lifecycle.submit(&owner, title, description).await {
                warn!("ticket submission failed: {e}");
                reply_text(state, uid, "Could not create the ticket, please try again.").await;
            }
        }
    }
}
