use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    errors::Error,
    filter::{DEFAULT_LANGUAGE_MAX_CHARS, DEFAULT_LANGUAGE_MIN_CHARS},
    messaging::throttled::ThrottleConfig,
    Result,
};

/// Typed configuration, read from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    /// Accounts allowed to register as watchers. Empty means anyone.
    pub telegram_allowed_users: Vec<i64>,
    pub database_path: PathBuf,

    // Filtering
    pub language_min_chars: usize,
    pub language_max_chars: usize,

    // Telegram limits
    pub telegram_safe_limit: usize,
    pub throttle: ThrottleConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        let telegram_allowed_users = parse_csv_i64(env_str("TELEGRAM_ALLOWED_USERS"));

        let database_path = env_str("DATABASE_PATH")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tgm.db"));
        if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let language_min_chars =
            env_usize("LANGUAGE_MIN_CHARS").unwrap_or(DEFAULT_LANGUAGE_MIN_CHARS);
        let language_max_chars = env_usize("LANGUAGE_MAX_CHARS")
            .unwrap_or(DEFAULT_LANGUAGE_MAX_CHARS)
            .max(language_min_chars);

        let telegram_safe_limit = env_usize("TELEGRAM_SAFE_LIMIT").unwrap_or(4000);

        let defaults = ThrottleConfig::default();
        let throttle = ThrottleConfig {
            global_min_interval: env_u64("THROTTLE_GLOBAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.global_min_interval),
            per_chat_min_interval: env_u64("THROTTLE_PER_CHAT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.per_chat_min_interval),
        };

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_users,
            database_path,
            language_min_chars,
            language_max_chars,
            telegram_safe_limit,
            throttle,
        })
    }

    /// Whether `user_id` may register as a watcher.
    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.telegram_allowed_users.is_empty() || self.telegram_allowed_users.contains(&user_id)
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
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

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_parsing_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# comment\nTELEGRAM_BOT_TOKEN=\"abc:def\"\n\nDATABASE_PATH='/var/lib/tgm.db'\nBROKEN\n=novalue\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TELEGRAM_BOT_TOKEN".to_string(), "abc:def".to_string()),
                ("DATABASE_PATH".to_string(), "/var/lib/tgm.db".to_string()),
            ]
        );
    }

    #[test]
    fn csv_ids_ignore_garbage() {
        assert_eq!(
            parse_csv_i64(Some(" 1, x, 22 ,,-3".to_string())),
            vec![1, 22, -3]
        );
        assert!(parse_csv_i64(None).is_empty());
    }

    #[test]
    fn empty_allowlist_allows_everyone() {
        let mut cfg = Config {
            telegram_bot_token: "x".to_string(),
            telegram_allowed_users: Vec::new(),
            database_path: PathBuf::from(":memory:"),
            language_min_chars: 10,
            language_max_chars: 2000,
            telegram_safe_limit: 4000,
            throttle: ThrottleConfig::default(),
        };
        assert!(cfg.is_allowed(5));
        cfg.telegram_allowed_users = vec![1];
        assert!(!cfg.is_allowed(5));
        assert!(cfg.is_allowed(1));
    }
}
