use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct RepoRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
}

/// Public repository names of `user`. One request, no retry, no cache.
pub fn list(config: &Config, user: &str) -> Result<Vec<String>> {
    let url = format!(
        "{}/users/{user}/repos",
        config.settings.api_url.trim_end_matches('/')
    );
    info!(%url, "fetching repository list");
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("linuxmanager/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()?;
    let resp = client.get(&url).send()?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::msg(format!("GET {url} returned {status}")));
    }
    let body = resp.text()?;
    parse_repo_names(&body)
}

/// Names from a repository-list JSON array. `full_name` ("owner/name") is
/// used when `name` is missing.
pub fn parse_repo_names(json: &str) -> Result<Vec<String>> {
    let records: Vec<RepoRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .filter_map(|r| {
            r.name.or_else(|| {
                r.full_name
                    .as_deref()
                    .and_then(|f| f.split_once('/'))
                    .map(|(_, n)| n.to_string())
            })
        })
        .filter(|n| !n.is_empty())
        .collect())
}
