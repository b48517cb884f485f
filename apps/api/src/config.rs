use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.coze.cn";
pub const DEFAULT_INSTRUCTION: &str =
    "Generate a match analysis report between the résumé and the job description";

/// Application configuration loaded from environment variables.
/// Fails at startup if the vendor credentials are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub vendor: VendorConfig,
    pub poll: PollPolicy,
    pub body_limit_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

/// Everything the vendor client and the submitter need to address one workflow.
#[derive(Debug, Clone)]
pub struct VendorConfig {
    pub base_url: String,
    pub api_token: String,
    pub workflow_id: String,
    /// Fields of the upload response `data` object tried, in order, for the file id.
    pub file_id_fields: Vec<String>,
    pub slots: SlotNames,
    pub default_instruction: String,
    /// `None` leaves outbound requests without a client-side timeout.
    pub http_timeout: Option<Duration>,
}

/// Parameter names the vendor workflow expects.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotNames {
    pub resume: String,
    pub jd: String,
    pub instruction: String,
}

impl Default for SlotNames {
    fn default() -> Self {
        Self {
            resume: "file".to_string(),
            jd: "jd".to_string(),
            instruction: "content".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until a terminal state is observed.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    /// The default policy with any explicitly configured knobs applied.
    pub fn from_overrides(interval_ms: Option<u64>, max_attempts: Option<u32>) -> Self {
        let defaults = Self::default();
        Self {
            interval: interval_ms.map(Duration::from_millis).unwrap_or(defaults.interval),
            max_attempts: max_attempts.or(defaults.max_attempts),
        }
    }
}

impl VendorConfig {
    /// A config pointing at `base_url` with every optional knob at its default.
    pub fn new(base_url: &str, api_token: &str, workflow_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            workflow_id: workflow_id.to_string(),
            file_id_fields: vec!["id".to_string(), "file_id".to_string()],
            slots: SlotNames::default(),
            default_instruction: DEFAULT_INSTRUCTION.to_string(),
            http_timeout: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let api_token = require_env("COZE_API_TOKEN")
            .or_else(|_| require_env("COZE_API_KEY"))
            .context("Either COZE_API_TOKEN or COZE_API_KEY must be set")?;
        let workflow_id = require_env("COZE_WORKFLOW_ID")?;
        let base_url = optional_env("COZE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut vendor = VendorConfig::new(&base_url, &api_token, &workflow_id);
        if let Some(fields) = optional_env("COZE_FILE_ID_FIELDS") {
            vendor.file_id_fields = parse_list(&fields);
            if vendor.file_id_fields.is_empty() {
                anyhow::bail!("COZE_FILE_ID_FIELDS must name at least one field");
            }
        }
        if let Some(slot) = optional_env("COZE_RESUME_SLOT") {
            vendor.slots.resume = slot;
        }
        if let Some(slot) = optional_env("COZE_JD_SLOT") {
            vendor.slots.jd = slot;
        }
        if let Some(slot) = optional_env("COZE_INSTRUCTION_SLOT") {
            vendor.slots.instruction = slot;
        }
        if let Some(text) = optional_env("COZE_DEFAULT_INSTRUCTION") {
            vendor.default_instruction = text;
        }
        vendor.http_timeout = parse_optional::<u64>("COZE_HTTP_TIMEOUT_SECS")?.map(Duration::from_secs);

        let poll = PollPolicy::from_overrides(
            parse_optional::<u64>("POLL_INTERVAL_MS")?,
            parse_optional::<u32>("POLL_MAX_ATTEMPTS")?,
        );

        Ok(Config {
            vendor,
            poll,
            body_limit_bytes: parse_optional::<usize>("BODY_LIMIT_BYTES")?
                .unwrap_or(10 * 1024 * 1024),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_optional<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    optional_env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
        })
        .transpose()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
