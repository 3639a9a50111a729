use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

const DEFAULT_API_URL: &str = "http://localhost:3001/graphql";
const DEFAULT_TOKEN_FILE: &str = ".feed_tokens.json";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub token_file: PathBuf,
    pub page_size: u32,
    pub http_timeout_secs: u64,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("FEED_API_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let token_file = lookup("FEED_TOKEN_FILE")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string())
            .into();
        let page_size = parse_u32_env(&lookup, "FEED_PAGE_SIZE", 20)?;
        let http_timeout_secs = parse_u64_env(&lookup, "FEED_HTTP_TIMEOUT_SECS", 15)?;
        let log_level = lookup("LOG_LEVEL")
            .or_else(|| lookup("RUST_LOG"))
            .unwrap_or_else(|| "warn".to_string());

        Ok(Self {
            api_url,
            token_file,
            page_size,
            http_timeout_secs,
            log_level,
        })
    }
}

fn parse_u32_env(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u32) -> Result<u32> {
    let value = lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?;

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}

fn parse_u64_env(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    let value = lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?;

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let s = settings(&[]).expect("defaults must be valid");
        assert_eq!(s.api_url, DEFAULT_API_URL);
        assert_eq!(s.token_file, PathBuf::from(DEFAULT_TOKEN_FILE));
        assert_eq!(s.page_size, 20);
        assert_eq!(s.http_timeout_secs, 15);
        assert_eq!(s.log_level, "warn");
    }

    #[test]
    fn log_level_falls_back_to_rust_log() {
        let s = settings(&[("RUST_LOG", "debug")]).expect("valid");
        assert_eq!(s.log_level, "debug");

        let s = settings(&[("RUST_LOG", "debug"), ("LOG_LEVEL", "info")]).expect("valid");
        assert_eq!(s.log_level, "info");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = settings(&[("FEED_PAGE_SIZE", "0")]).expect_err("must fail");
        assert!(err.to_string().contains("FEED_PAGE_SIZE"));
    }

    #[test]
    fn garbage_timeout_is_rejected() {
        assert!(settings(&[("FEED_HTTP_TIMEOUT_SECS", "soon")]).is_err());
    }
}
