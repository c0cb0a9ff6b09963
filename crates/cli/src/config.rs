//! Configuration loading and management

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use time::Date;
use time::macros::format_description;

const XVI_FEED_URL: &str = "https://app.parlamento.pt/webutils/docs/doc.txt?path=JIf%2bfNEFTJ3dZjfk2SEgv7akbMN1hBC%2fl88Tim%2bRTzTnLS1tvsCi0B3Lm2ReYXUcazUcPcGvstFujlwAWizrbpdrEV%2fH%2fhIj%2boq49E1lcuhsGcEdXynUiqGK6wHUnTe3CehLsOI3aZj0hvjakE7sD8eDicdNpIuy5Xzd9e2yo6VnmuBjuq1jgLxTZCcBGK3KUc0taNvXf%2b816sIPNUK0K9QJiPgf%2bpXBOM3lZWBKTPlgPciZYyfHaRnuBzll7aLI57H6ADfms%2ffbK3HQlwRzhej64OLMKN8SG%2bJ89HZLGHfdzFBMupBH0czdzcua0A9jgWPVtIhoSbjW5Np5dsPusDHBaW2Zhg2W2rSsbQp9kPA%3d&fich=IniciativasXVI_json.txt&Inline=true";

const XV_FEED_URL: &str = "https://app.parlamento.pt/webutils/docs/doc.txt?path=9pmNwL6GoXv7I7%2b%2fqIbTfPny7HRpBWiyHiyClKcla8C2sa9EbIgDyIZa9rTsuI6jG3KgMosUtvKl%2fek7BtzUee6kPEU6gITunDOdPb0T7gMnfM5%2bUWWRn6r2t42DSM63%2fJ8az36bpRSJRpyggVhCBBQaOYNMwQPVFMNSkpSUQL2zczuCdhZgMg55hQZ%2fYBmuFwowZHRTHoSMFhd7ILx58tsqdWEWAdDti73T55KxYGPH6u80%2bQVLC9wvYuYm433%2bksaSYCLQ3J%2fUA5OZBrd4ixlscy1B%2b05uflW2PMAzAB8jsVMIoGk97YMNCzkxHccRMsmN2Ge2h6jIbN8uYcpbzRUUR0ImHSj1NHlc4Hq%2bcVc%3d&fich=IniciativasXV_json.txt&Inline=true";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub mastodon: MastodonConfig,

    #[serde(default)]
    pub mirror: MirrorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_legislature")]
    pub legislature: String,

    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default)]
    pub mark_all_as_published: bool,

    #[serde(default)]
    pub skip_all: bool,

    #[serde(default)]
    pub override_too_many_new_votes: bool,

    /// `YYYY-MM-DD`; with the override on, new votes up to this day are skipped
    #[serde(default)]
    pub override_cutoff_date: Option<String>,

    #[serde(default = "default_max_new_votes")]
    pub max_new_votes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Legislature id to initiatives feed location
    #[serde(default = "default_legislatures")]
    pub legislatures: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    #[serde(default = "default_mastodon_base_url")]
    pub base_url: String,

    #[serde(default = "default_mastodon_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_visibility")]
    pub visibility: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_github_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default = "default_variable_prefix")]
    pub variable_prefix: String,

    #[serde(default = "default_github_token_env")]
    pub token_env: String,
}

// Default value functions
fn default_legislature() -> String {
    "XVI".to_string()
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./state.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_new_votes() -> usize {
    100
}

fn default_legislatures() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("XVI".to_string(), XVI_FEED_URL.to_string()),
        ("XV".to_string(), XV_FEED_URL.to_string()),
    ])
}

fn default_mastodon_base_url() -> String {
    "https://masto.pt".to_string()
}

fn default_mastodon_token_env() -> String {
    "MASTODON_ACCESS_TOKEN".to_string()
}

fn default_visibility() -> String {
    "unlisted".to_string()
}

fn default_language() -> String {
    "pt".to_string()
}

fn default_max_chars() -> usize {
    500
}

fn default_github_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_variable_prefix() -> String {
    "VOTES_STATE_".to_string()
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            legislature: default_legislature(),
            state_path: default_state_path(),
            log_level: default_log_level(),
            dry_run: default_true(),
            mark_all_as_published: false,
            skip_all: false,
            override_too_many_new_votes: false,
            override_cutoff_date: None,
            max_new_votes: default_max_new_votes(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            legislatures: default_legislatures(),
        }
    }
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            base_url: default_mastodon_base_url(),
            access_token_env: default_mastodon_token_env(),
            visibility: default_visibility(),
            language: default_language(),
            max_chars: default_max_chars(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base_url: default_github_api_base_url(),
            owner: String::new(),
            repo: String::new(),
            variable_prefix: default_variable_prefix(),
            token_env: default_github_token_env(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("VOTE_HERALD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Feed locations keyed by upper-case legislature id.
    ///
    /// Keys coming from environment variables arrive lower-cased.
    pub fn legislature_feeds(&self) -> HashMap<String, String> {
        self.source
            .legislatures
            .iter()
            .map(|(id, location)| (id.to_uppercase(), location.clone()))
            .collect()
    }

    /// Parsed `override_cutoff_date`
    pub fn override_cutoff(&self) -> Result<Option<Date>> {
        self.general
            .override_cutoff_date
            .as_deref()
            .map(parse_date)
            .transpose()
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        format!(
            r#"# vote-herald configuration

[general]
legislature = "XVI"
state_path = "./state.json"
log_level = "info"
dry_run = true
mark_all_as_published = false
skip_all = false
# Safety valve: refuse runs with more new votes than this unless overridden
max_new_votes = 100
override_too_many_new_votes = false
# override_cutoff_date = "2024-03-26"

[source.legislatures]
XVI = "{xvi}"
XV = "{xv}"

[mastodon]
base_url = "https://masto.pt"
access_token_env = "MASTODON_ACCESS_TOKEN"
visibility = "unlisted"
language = "pt"
max_chars = 500

[mirror]
enabled = false
api_base_url = "https://api.github.com"
owner = "your-user"
repo = "your-repo"
variable_prefix = "VOTES_STATE_"
token_env = "GITHUB_TOKEN"
"#,
            xvi = XVI_FEED_URL,
            xv = XV_FEED_URL,
        )
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(raw: &str) -> Result<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw))
}
