// Runtime configuration, read once from environment variables with
// sensible defaults so the game runs without any setup.

use crate::api::DEFAULT_BASE_URL;
use crate::highscore::HighscoreStore;
use crate::menu::{DEFAULT_LABEL_WIDTH, MIN_LABEL_WIDTH};
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// `CATALOG_API_URL`
    pub catalog_url: String,
    /// `TASS_HIGHSCORE_FILE`
    pub highscore_file: PathBuf,
    /// `TASS_LABEL_WIDTH`
    pub label_width: usize,
    /// `TASS_READING_TIME_MS`: pause between lines of the intro text.
    pub reading_time: Duration,
    /// `TASS_SKIP_INTRO`
    pub skip_intro: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let catalog_url = lookup("CATALOG_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let highscore_file = lookup("TASS_HIGHSCORE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(HighscoreStore::default_path);
        let label_width = parse_or(&lookup, "TASS_LABEL_WIDTH", DEFAULT_LABEL_WIDTH)?;
        if label_width < MIN_LABEL_WIDTH {
            bail!(
                "Invalid value for TASS_LABEL_WIDTH: {} (must be at least {})",
                label_width,
                MIN_LABEL_WIDTH
            );
        }
        let reading_time_ms = parse_or(&lookup, "TASS_READING_TIME_MS", 1300u64)?;
        let skip_intro = lookup("TASS_SKIP_INTRO")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Config {
            catalog_url,
            highscore_file,
            label_width,
            reading_time: Duration::from_millis(reading_time_ms),
            skip_intro,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
