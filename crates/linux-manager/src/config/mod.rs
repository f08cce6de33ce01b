use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use toml::Value;

use crate::error::{Error, Result};

const APP_DIR: &str = "linuxmanager";
const CONFIG_FILE: &str = "config";

fn default_git_host() -> String {
    "github.com".into()
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

fn default_shell() -> String {
    "bash".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    #[serde(alias = "defaultfolder", skip_serializing_if = "Option::is_none")]
    pub default_folder: Option<String>,
    #[serde(alias = "gitfolder", skip_serializing_if = "Option::is_none")]
    pub git_folder: Option<String>,
    #[serde(alias = "gituser", skip_serializing_if = "Option::is_none")]
    pub git_user: Option<String>,
    #[serde(default = "default_git_host")]
    pub git_host: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_shell")]
    pub shell: String,
    pub sort_entries: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_folder: None,
            git_folder: None,
            git_user: None,
            git_host: default_git_host(),
            api_url: default_api_url(),
            shell: default_shell(),
            sort_entries: false,
        }
    }
}

/// Startup configuration. Built once and handed to every component that
/// needs it; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub path: PathBuf,
    pub home: String,
    pub settings: Settings,
}

impl Config {
    pub fn new(path: PathBuf, home: impl Into<String>, settings: Settings) -> Self {
        Self {
            path,
            home: home.into(),
            settings,
        }
    }

    pub fn load(path: &Path, home: &str) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| Error::msg(format!("failed to read config {}: {e}", path.display())))?;
        let settings = parse_settings(path, &data)?;
        Ok(Self::new(path.to_path_buf(), home, settings))
    }

    /// Folder the file browser opens in: `default_folder`, else home.
    pub fn start_folder(&self) -> String {
        match self.settings.default_folder.as_deref() {
            Some(p) if !p.trim().is_empty() => expand_tilde(p.trim(), &self.home),
            _ => self.home.clone(),
        }
    }

    pub fn git_folder(&self) -> Option<String> {
        self.settings
            .git_folder
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|p| expand_tilde(p, &self.home))
    }

    pub fn git_user(&self) -> Option<&str> {
        self.settings
            .git_user
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self.settings)?)
    }
}

pub fn default_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| Error::msg("could not resolve the user config directory"))?;
    Ok(dir.join(APP_DIR).join(CONFIG_FILE))
}

pub fn home_dir() -> Result<String> {
    let home =
        dirs::home_dir().ok_or_else(|| Error::msg("could not resolve the home directory"))?;
    home.to_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| Error::msg(format!("home directory is not UTF-8: {}", home.display())))
}

/// Resolve a leading `~` against `home`. Other paths come back unchanged.
pub fn expand_tilde(path: &str, home: &str) -> String {
    if path == "~" {
        return home.to_string();
    }
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = home.trim_end_matches('/');
            let rest = rest.trim_start_matches('/');
            if rest.is_empty() {
                home.to_string()
            } else {
                format!("{home}/{rest}")
            }
        }
        None => path.to_string(),
    }
}

// TOML first; the older `key=value` token format is the fallback.
fn parse_settings(path: &Path, data: &str) -> Result<Settings> {
    let value = match toml::from_str::<toml::Table>(data) {
        Ok(tbl) => Value::Table(tbl),
        Err(toml_err) => parse_legacy(data).map_err(|legacy_err| {
            Error::msg(format!(
                "config parse error in {}: {toml_err} ({legacy_err})",
                path.display()
            ))
        })?,
    };
    value
        .try_into()
        .map_err(|e| Error::msg(format!("invalid config in {}: {e}", path.display())))
}

fn parse_legacy(data: &str) -> Result<Value> {
    let mut tbl = toml::Table::new();
    for token in data.split_whitespace() {
        let Some((key, val)) = token.split_once('=') else {
            return Err(Error::msg(format!("legacy entry '{token}' has no '='")));
        };
        if key.is_empty() {
            return Err(Error::msg(format!("legacy entry '{token}' has an empty key")));
        }
        let val = match val {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            other => Value::String(other.to_string()),
        };
        tbl.insert(key.to_string(), val);
    }
    Ok(Value::Table(tbl))
}
