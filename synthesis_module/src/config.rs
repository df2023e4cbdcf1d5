use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SynthesisError;

pub const DEFAULT_REQUEST_MAX_CHARS: usize = 200;
pub const DEFAULT_RESPONSE_MAX_CHARS: usize = 300;
pub const DEFAULT_HISTORY_ENTRY_MAX_CHARS: usize = 300;

const DEFAULT_KNOWN_SYSTEMS: [&str; 3] = ["ESB", "IPS", "FICO"];

const DEFAULT_RESPONSIBLE: [(&str, &str); 4] = [
    ("oleksiy_sokolov@service-team.biz", "Олексій Соколов"),
    ("dmytro_sandul@service-team.biz", "Дмитро Сандул"),
    ("nikita_chychykalo@service-team.biz", "Нікіта Чичикало"),
    ("ihor_draha@service-team.biz", "Ігор Драга"),
];

/// Maps a support address (or a fragment of one) to the name shown in the
/// `responsible` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsibleEntry {
    pub address: String,
    pub name: String,
}

/// Immutable settings for one synthesis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub support_addresses: Vec<String>,
    pub keywords: Vec<String>,
    pub aggressive_clean: bool,
    pub known_systems: Vec<String>,
    pub responsible: Vec<ResponsibleEntry>,
    pub request_max_chars: usize,
    pub response_max_chars: usize,
    pub history_entry_max_chars: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            support_addresses: Vec::new(),
            keywords: Vec::new(),
            aggressive_clean: false,
            known_systems: DEFAULT_KNOWN_SYSTEMS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            responsible: default_responsible(),
            request_max_chars: DEFAULT_REQUEST_MAX_CHARS,
            response_max_chars: DEFAULT_RESPONSE_MAX_CHARS,
            history_entry_max_chars: DEFAULT_HISTORY_ENTRY_MAX_CHARS,
        }
    }
}

pub fn default_responsible() -> Vec<ResponsibleEntry> {
    DEFAULT_RESPONSIBLE
        .iter()
        .map(|(address, name)| ResponsibleEntry {
            address: address.to_string(),
            name: name.to_string(),
        })
        .collect()
}

impl SynthesisConfig {
    /// Loads a TOML file. Fields absent from the file keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, SynthesisError> {
        let content = std::fs::read_to_string(path)?;
        let mut config =
            toml::from_str::<SynthesisConfig>(&content).map_err(|source| {
                SynthesisError::ConfigParse {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        config.support_addresses = normalize_list(config.support_addresses, true);
        config.keywords = normalize_list(config.keywords, true);
        config.known_systems = normalize_list(config.known_systems, false);
        Ok(config)
    }

    /// Builds the config from `.env`, an optional `ISSUE_CONFIG_PATH` file and
    /// the `SUPPORT_EMAILS`, `KEYWORDS`, `KNOWN_SYSTEMS` and
    /// `AGGRESSIVE_CLEAN` overrides.
    pub fn from_env() -> Result<Self, SynthesisError> {
        dotenvy::dotenv().ok();

        let mut config = match env_var_non_empty("ISSUE_CONFIG_PATH") {
            Some(path) => {
                let path = PathBuf::from(path);
                debug!("loading issue config from {}", path.display());
                Self::from_toml_file(&path)?
            }
            None => Self::default(),
        };

        if let Some(value) = env_var_non_empty("SUPPORT_EMAILS") {
            config.support_addresses = split_list(&value, true);
        }
        if let Some(value) = env_var_non_empty("KEYWORDS") {
            config.keywords = split_list(&value, true);
        }
        if let Some(value) = env_var_non_empty("KNOWN_SYSTEMS") {
            config.known_systems = split_list(&value, false);
        }
        config.aggressive_clean = env_flag("AGGRESSIVE_CLEAN", config.aggressive_clean);

        Ok(config)
    }
}

fn split_list(value: &str, lowercase: bool) -> Vec<String> {
    normalize_list(value.split(',').map(str::to_string).collect(), lowercase)
}

fn normalize_list(items: Vec<String>, lowercase: bool) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                None
            } else if lowercase {
                Some(trimmed.to_lowercase())
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

fn env_var_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
