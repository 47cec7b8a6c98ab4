use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::{info, warn};

use tsb_core::{
    access::AccessGate,
    config::Config,
    flows::FlowSessions,
    lifecycle::TicketLifecycle,
    ports::{MessagingPort, Storage},
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub store: Arc<dyn Storage>,
    pub gate: Arc<AccessGate>,
    pub sessions: Arc<FlowSessions>,
    pub lifecycle: Arc<TicketLifecycle>,
    pub messenger: Arc<dyn MessagingPort>,
}

pub async fn run_polling(cfg: Arc<Config>, store: Arc<dyn Storage>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let gate = Arc::new(AccessGate::new(store.clone(), cfg.access_attempts));
    let sessions = Arc::new(FlowSessions::default());
    let lifecycle = Arc::new(TicketLifecycle::new(
        store.clone(),
        messenger.clone(),
        cfg.admin_id,
    ));

    // Startup notification with the invite deep link (best-effort).
    match bot.get_me().await {
        Ok(me) => {
            info!(username = me.username(), "bot started");
            let link = format!("https://t.me/{}?start={}", me.username(), cfg.access_key);
            if let Err(e) = messenger
                .send_text(
                    cfg.admin_id.chat(),
                    &format!("Bot started. Invite link: {link}"),
                )
                .await
            {
                warn!("startup notification failed: {e}");
            }
        }
        Err(e) => warn!("get_me failed: {e}"),
    }

    let state = Arc::new(AppState {
        cfg,
        store,
        gate,
        sessions,
        lifecycle,
        messenger,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_my_chat_member().endpoint(handlers::handle_my_chat_member))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
