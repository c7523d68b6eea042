//! Application configuration.

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot identity and link configuration.
    pub bot: BotConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Outbound dispatch tuning.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Update transport configuration.
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Bot API token.
    pub token: String,
    /// Base URL of the Bot API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Telegram user ids allowed to run operator commands.
    #[serde(default, deserialize_with = "deserialize_id_list")]
    pub admin_users: Vec<i64>,
    /// Local path of the welcome animation.
    pub media_path: PathBuf,
    /// File holding the uploaded animation reference.
    #[serde(default = "default_asset_cache_path")]
    pub asset_cache_path: PathBuf,
    /// Mini app URL opened by the "Open App" button.
    #[serde(default = "default_mini_app_url")]
    pub mini_app_url: String,
    /// Announcement channel URL.
    #[serde(default = "default_channel_url")]
    pub channel_url: String,
    /// Discussion group URL.
    #[serde(default = "default_discussion_url")]
    pub discussion_url: String,
    /// Partnerships and support contact URL.
    #[serde(default = "default_support_url")]
    pub support_url: String,
    /// Deep link used by group welcomes to open the bot privately.
    #[serde(default = "default_bot_link")]
    pub bot_link: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Dispatch pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Minimum interval between two outbound sends, in milliseconds.
    #[serde(default = "default_pacing_interval_ms")]
    pub pacing_interval_ms: u64,
    /// Attempts made by the retrying query executor.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Fixed wait between executor attempts, in seconds.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pacing_interval_ms: default_pacing_interval_ms(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

impl DispatchConfig {
    /// Pacing floor as a duration.
    #[must_use]
    pub const fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }

    /// Executor backoff as a duration.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

/// How updates reach the bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Long polling with `getUpdates`.
    #[default]
    Polling,
    /// HTTPS webhook served by this process.
    Webhook,
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Transport mode.
    #[serde(default)]
    pub mode: TransportMode,
    /// Long-poll timeout in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Public webhook URL registered with the Bot API.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Secret token echoed back by the Bot API on every webhook call.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// Host to bind the webhook server to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind the webhook server to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::default(),
            poll_timeout_secs: default_poll_timeout_secs(),
            webhook_url: None,
            webhook_secret: None,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_asset_cache_path() -> PathBuf {
    PathBuf::from("file_id_cache.json")
}

fn default_mini_app_url() -> String {
    "https://t.me/CoinbeatsMiniApp_bot/miniapp".to_string()
}

fn default_channel_url() -> String {
    "https://t.me/CoinBeats".to_string()
}

fn default_discussion_url() -> String {
    "https://t.me/CoinBeatsDiscuss".to_string()
}

fn default_support_url() -> String {
    "https://t.me/mikkmm".to_string()
}

fn default_bot_link() -> String {
    "https://t.me/CoinBeatsBunny_bot?start=fromgroup".to_string()
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_pacing_interval_ms() -> u64 {
    34
}

const fn default_retry_attempts() -> u32 {
    3
}

const fn default_retry_backoff_secs() -> u64 {
    5
}

const fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8443
}

/// Accepts `[1, 2]`, `1`, or `"1, 2"` (the environment variable form).
/// Entries that are not numeric are skipped.
fn deserialize_id_list<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<i64>),
        Single(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(ids) => ids,
        Raw::Single(id) => vec![id],
        Raw::Text(text) => parse_id_list(&text),
    })
}

/// Parse a comma separated list of numeric ids.
#[must_use]
pub fn parse_id_list(text: &str) -> Vec<i64> {
    text.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `BEACON_ENV`)
    /// 4. Environment variables with `BEACON__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("BEACON_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("BEACON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("BEACON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
