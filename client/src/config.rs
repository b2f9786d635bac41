/// Configuration management
use crate::error::{DuetError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = ".duet";
const DEFAULT_MESSAGE_FETCH_LIMIT: usize = 100;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the store service
    pub store_url: String,

    /// Data directory for the local profile
    pub data_dir: PathBuf,

    /// Conversation-list polling interval
    pub conversation_poll_interval: Duration,

    /// Open-conversation message polling interval
    pub message_poll_interval: Duration,

    /// Maximum number of messages fetched per poll
    pub message_fetch_limit: usize,

    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: "http://127.0.0.1:4000".to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            conversation_poll_interval: Duration::from_secs(3),
            message_poll_interval: Duration::from_secs(2),
            message_fetch_limit: DEFAULT_MESSAGE_FETCH_LIMIT,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut store_url: Option<String> = None;
        let mut data_dir: Option<PathBuf> = None;
        let mut conversation_poll_secs: Option<u64> = None;
        let mut message_poll_secs: Option<u64> = None;
        let mut message_fetch_limit: Option<usize> = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--data-dir" => {
                    let path = args.get(i + 1).ok_or_else(|| {
                        DuetError::Config("--data-dir requires a path argument".to_string())
                    })?;
                    data_dir = Some(PathBuf::from(path));
                    i += 2;
                }
                "--poll-conversations" => {
                    let secs = args.get(i + 1).ok_or_else(|| {
                        DuetError::Config(
                            "--poll-conversations requires a seconds argument".to_string(),
                        )
                    })?;
                    conversation_poll_secs = Some(secs.parse::<u64>().map_err(|_| {
                        DuetError::Config("--poll-conversations must be a number".to_string())
                    })?);
                    i += 2;
                }
                "--poll-messages" => {
                    let secs = args.get(i + 1).ok_or_else(|| {
                        DuetError::Config(
                            "--poll-messages requires a seconds argument".to_string(),
                        )
                    })?;
                    message_poll_secs = Some(secs.parse::<u64>().map_err(|_| {
                        DuetError::Config("--poll-messages must be a number".to_string())
                    })?);
                    i += 2;
                }
                "--limit" => {
                    let n = args.get(i + 1).ok_or_else(|| {
                        DuetError::Config("--limit requires a count argument".to_string())
                    })?;
                    message_fetch_limit = Some(n.parse::<usize>().map_err(|_| {
                        DuetError::Config("--limit must be a number".to_string())
                    })?);
                    i += 2;
                }
                other => {
                    if store_url.is_some() {
                        return Err(DuetError::Config(format!(
                            "Unexpected argument: {}",
                            other
                        )));
                    }
                    store_url = Some(other.to_string());
                    i += 1;
                }
            }
        }

        // Env overrides (nice for scripts)
        if store_url.is_none() {
            store_url = std::env::var("DUET_STORE_URL").ok();
        }
        if let Ok(dir) = std::env::var("DUET_DATA_DIR") {
            data_dir = Some(PathBuf::from(dir));
        }

        let store_url = store_url.ok_or_else(|| {
            DuetError::Config(format!(
                "Usage: {} <store_url> [--data-dir <path>] [--poll-conversations <secs>] [--poll-messages <secs>] [--limit <n>]",
                args.first().map(|s| s.as_str()).unwrap_or("duet")
            ))
        })?;

        let defaults = Config::default();
        Ok(Self {
            store_url,
            data_dir: data_dir.unwrap_or(defaults.data_dir),
            conversation_poll_interval: conversation_poll_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.conversation_poll_interval),
            message_poll_interval: message_poll_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.message_poll_interval),
            message_fetch_limit: message_fetch_limit.unwrap_or(defaults.message_fetch_limit),
            request_timeout: defaults.request_timeout,
        })
    }
}
