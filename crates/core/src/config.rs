use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub remote: RemoteConfig,
    pub board: BoardConfig,
    #[serde(default)]
    pub credential: CredentialConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(
            File::open(path)
                .with_context(|| format!("Failed to open config file {}", path.display()))?,
        );
        serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    pub endpoint: Url,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Upper bound on pages fetched in one session. `None` disables the bound.
    #[serde(default = "default_max_pages")]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoardConfig {
    #[serde(default = "default_board_api_url")]
    pub api_url: Url,
    pub api_token: String,
    pub api_version: Option<String>,
    pub board_id: Option<u64>,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_job_name")]
    pub default_job_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialConfig {
    #[serde(default = "default_credential_path")]
    pub path: PathBuf,
}

impl Default for CredentialConfig {
    fn default() -> Self { Self { path: default_credential_path() } }
}

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 1000;

fn default_page_size() -> u32 { DEFAULT_PAGE_SIZE }

fn default_max_pages() -> Option<u32> { Some(DEFAULT_MAX_PAGES) }

fn default_board_api_url() -> Url {
    Url::parse("https://api.monday.com/v2").expect("static URL is valid")
}

fn default_country_code() -> String { "IL".to_string() }

fn default_job_name() -> String { "משרה חדשה".to_string() }

fn default_credential_path() -> PathBuf { PathBuf::from("credentials.json") }
