use std::env;
use std::path::PathBuf;

pub const DIALOG_PAGE_SIZE: usize = 10;
pub const HISTORY_LIMIT: usize = 10;
const DEFAULT_COLUMNS: usize = 80;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub realtime_url: String,
    pub data_dir: PathBuf,
    pub session_path: PathBuf,
    pub media_dir: PathBuf,
    pub token_override: Option<String>,
    pub columns: usize,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = cfg!(debug_assertions);
        let api_base_url = lookup("RELAY_API_BASE_URL").unwrap_or_else(|| {
            if debug {
                "http://localhost:8000/v1".to_string()
            } else {
                "https://api.relay.chat/v1".to_string()
            }
        });
        let api_base_url = api_base_url.trim_end_matches('/').to_string();

        let realtime_url = lookup("RELAY_REALTIME_URL").unwrap_or_else(|| {
            if debug {
                "ws://localhost:8000/realtime".to_string()
            } else {
                "wss://api.relay.chat/realtime".to_string()
            }
        });
        let realtime_url = realtime_url.trim_end_matches('/').to_string();

        let data_dir = lookup("RELAY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(lookup("HOME"), debug));
        let session_path = lookup("RELAY_SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("session.json"));
        let media_dir = lookup("RELAY_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("usermedia"));
        let token_override = lookup("RELAY_TOKEN").filter(|token| !token.trim().is_empty());
        let columns = lookup("COLUMNS")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|columns| *columns >= 10)
            .unwrap_or(DEFAULT_COLUMNS);

        Self {
            api_base_url,
            realtime_url,
            data_dir,
            session_path,
            media_dir,
            token_override,
            columns,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            dialog_page_size: DIALOG_PAGE_SIZE,
            history_limit: HISTORY_LIMIT,
            media_dir: self.media_dir.clone(),
            columns: self.columns,
        }
    }
}

/// Knobs the interactive session needs, split from transport settings.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub dialog_page_size: usize,
    pub history_limit: usize,
    pub media_dir: PathBuf,
    pub columns: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            dialog_page_size: DIALOG_PAGE_SIZE,
            history_limit: HISTORY_LIMIT,
            media_dir: PathBuf::from("usermedia"),
            columns: DEFAULT_COLUMNS,
        }
    }
}

fn default_data_dir(home: Option<String>, debug: bool) -> PathBuf {
    let base = home.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let dir_name = if debug { "relay-dev" } else { "relay" };
    base.join(".local").join("share").join(dir_name)
}
