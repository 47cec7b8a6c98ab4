use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{domain::UserId, errors::Error, Result};

/// Typed configuration, loaded from the environment (with `.env` fallback).
#[derive(Clone, Debug)]
pub struct Config {
    /// Telegram bot API token.
    pub bot_token: String,
    /// The single administrator identity.
    pub admin_id: UserId,
    /// Shared secret required once per user on `/start`.
    pub access_key: String,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Failed `/start` attempts before a user is blocked.
    pub access_attempts: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("BOT_TOKEN environment variable is required".to_string())
        })?;

        let admin_id = env_str("ADMIN_ID")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(UserId)
            .ok_or_else(|| {
                Error::Config("ADMIN_ID environment variable is required (numeric)".to_string())
            })?;

        let access_key = env_str("ACCESS_KEY").and_then(non_empty).ok_or_else(|| {
            Error::Config("ACCESS_KEY environment variable is required".to_string())
        })?;

        let database_path = env_path("DATABASE_PATH").unwrap_or_else(|| PathBuf::from("tsb.db"));
        let access_attempts = env_u32("ACCESS_ATTEMPTS").unwrap_or(5).max(1);

        Ok(Self {
            bot_token,
            admin_id,
            access_key,
            database_path,
            access_attempts,
        })
    }

    pub fn is_admin(&self, uid: UserId) -> bool {
        uid == self.admin_id
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
