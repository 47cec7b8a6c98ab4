use std::sync::Arc;

use tsb_core::{config::Config, ports::Storage};
use tsb_storage::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), tsb_core::Error> {
    tsb_core::logging::init("tsb");

    let cfg = Arc::new(Config::load()?);
    let store: Arc<dyn Storage> = Arc::new(SqliteStore::open(&cfg.database_path)?);

    tsb_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| tsb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
