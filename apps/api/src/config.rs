use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::rubric::defaults;
use crate::rubric::models::ScoringConfig;
use crate::rubric::validation::validate_scoring_config;

const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres is used when set; otherwise everything lives in memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub batch_concurrency: usize,
    /// JSON file seeding the first scoring configuration.
    pub scoring_config_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let batch_concurrency = match non_empty("EVAL_BATCH_CONCURRENCY") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .context("EVAL_BATCH_CONCURRENCY must be a positive integer")?,
            None => DEFAULT_BATCH_CONCURRENCY,
        };
        if batch_concurrency == 0 {
            bail!("EVAL_BATCH_CONCURRENCY must be at least 1");
        }

        Ok(Config {
            database_url: non_empty("DATABASE_URL"),
            port: non_empty("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .trim()
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: non_empty("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            batch_concurrency,
            scoring_config_path: non_empty("SCORING_CONFIG_PATH").map(PathBuf::from),
        })
    }

    /// Configuration the provider starts from: the seed file if one is set, else the built-in rubric.
    pub fn initial_scoring_config(&self) -> Result<ScoringConfig> {
        match &self.scoring_config_path {
            Some(path) => load_scoring_config(path),
            None => Ok(defaults::scoring_config()),
        }
    }
}

pub fn load_scoring_config(path: &Path) -> Result<ScoringConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading scoring config {}", path.display()))?;
    let config: ScoringConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing scoring config {}", path.display()))?;

    let problems = validate_scoring_config(&config);
    if !problems.is_empty() {
        bail!(
            "scoring config {} is invalid: {}",
            path.display(),
            problems.join("; ")
        );
    }
    Ok(config)
}
