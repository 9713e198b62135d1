use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use bloodlink_engine::CommitPolicy;
use bloodlink_types::models::UserHandle;

/// Values that must never guard a running server.
const PLACEHOLDER_TOKENS: &[&str] = &["change-me", "changeme", "dev-secret-change-me", "secret", "admin"];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub admin_handle: Option<UserHandle>,
    pub admin_token: String,
    pub send_pacing: Duration,
    pub commit_policy: CommitPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("BLOODLINK_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("BLOODLINK_PORT {:?}", raw))?,
            None => 3000,
        };

        let admin_handle = match get("BLOODLINK_ADMIN_HANDLE") {
            Some(raw) => Some(
                raw.parse::<UserHandle>()
                    .with_context(|| format!("BLOODLINK_ADMIN_HANDLE {:?}", raw))?,
            ),
            None => None,
        };

        let Some(admin_token) = get("BLOODLINK_ADMIN_TOKEN") else {
            bail!("BLOODLINK_ADMIN_TOKEN must be set");
        };
        if PLACEHOLDER_TOKENS
            .iter()
            .any(|p| admin_token.eq_ignore_ascii_case(p))
        {
            bail!("BLOODLINK_ADMIN_TOKEN is a placeholder value; set a real secret");
        }

        let send_pacing = match get("BLOODLINK_SEND_PACING_MS") {
            Some(raw) => Duration::from_millis(
                raw.parse()
                    .with_context(|| format!("BLOODLINK_SEND_PACING_MS {:?}", raw))?,
            ),
            None => bloodlink_engine::engine::DEFAULT_SEND_PACING,
        };

        let commit_policy = match get("BLOODLINK_COMMIT_POLICY") {
            Some(raw) => raw
                .parse::<CommitPolicy>()
                .map_err(anyhow::Error::msg)
                .context("BLOODLINK_COMMIT_POLICY")?,
            None => CommitPolicy::default(),
        };

        Ok(Self {
            db_path: PathBuf::from(get("BLOODLINK_DB_PATH").unwrap_or_else(|| "bloodlink.db".into())),
            host: get("BLOODLINK_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            admin_handle,
            admin_token,
            send_pacing,
            commit_policy,
        })
    }
}
