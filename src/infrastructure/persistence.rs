use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Address, AppId};

/// What survives a restart: the open marketplace and the connected account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub app_id: Option<AppId>,
    #[serde(default)]
    pub account: Option<Address>,
}

pub struct SessionRepository;

impl SessionRepository {
    pub fn save_session(session: &Session, path: &Path) -> Result<String, String> {
        match serde_json::to_string_pretty(session) {
            Ok(json) => match fs::write(path, &json) {
                Ok(_) => Ok(path.display().to_string()),
                Err(e) => Err(e.to_string()),
            },
            Err(e) => Err(format!("Serialization failed: {}", e)),
        }
    }

    pub fn load_session(path: &Path) -> Result<Session, String> {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Session>(&content) {
                Ok(session) => Ok(session),
                Err(e) => Err(format!("Invalid session file - {}", e)),
            },
            Err(e) => Err(e.to_string()),
        }
    }
}
