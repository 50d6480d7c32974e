//! Configuration Provider: owns the active scoring configuration and its version.
//!
//! Every successful `set_active` bumps the version, which makes every stored
//! evaluation stale. Nothing is recomputed here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use tokio::sync::RwLock;
use tracing::info;

use crate::errors::{EvaluationError, StoreError};
use crate::rubric::models::{ActiveConfig, ConfigVersion, ScoringConfig};
use crate::rubric::validation::validate_scoring_config;

#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn get_active(&self) -> Result<ActiveConfig, StoreError>;

    /// Validates and activates `config`, returning it with its new version.
    async fn set_active(&self, config: ScoringConfig) -> Result<ActiveConfig, EvaluationError>;
}

/// Rejects a configuration with every problem listed in one message.
pub fn checked(config: ScoringConfig) -> Result<ScoringConfig, EvaluationError> {
    let problems = validate_scoring_config(&config);
    if problems.is_empty() {
        Ok(config)
    } else {
        Err(EvaluationError::Configuration(problems.join("; ")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory provider
// ────────────────────────────────────────────────────────────────────────────

pub struct InMemoryConfigProvider {
    active: RwLock<ActiveConfig>,
}

impl InMemoryConfigProvider {
    pub fn new(initial: ScoringConfig) -> Self {
        Self {
            active: RwLock::new(ActiveConfig {
                version: ConfigVersion::INITIAL,
                activated_at: Utc::now(),
                config: initial,
            }),
        }
    }
}

#[async_trait]
impl ConfigProvider for InMemoryConfigProvider {
    async fn get_active(&self) -> Result<ActiveConfig, StoreError> {
        Ok(self.active.read().await.clone())
    }

    async fn set_active(&self, config: ScoringConfig) -> Result<ActiveConfig, EvaluationError> {
        let config = checked(config)?;
        let mut active = self.active.write().await;
        *active = ActiveConfig {
            version: active.version.next(),
            activated_at: Utc::now(),
            config,
        };
        info!(version = %active.version, "scoring configuration activated");
        Ok(active.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres provider
// ────────────────────────────────────────────────────────────────────────────

/// Every activation is a new row; the highest version is the active one.
pub struct PgConfigProvider {
    db: PgPool,
}

type ConfigRow = (i64, Json<ScoringConfig>, DateTime<Utc>);

impl PgConfigProvider {
    /// Seeds `initial` when no configuration has ever been stored.
    pub async fn bootstrap(db: PgPool, initial: ScoringConfig) -> Result<Self, StoreError> {
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM scoring_configs ORDER BY version DESC LIMIT 1")
                .fetch_optional(&db)
                .await?;

        if existing.is_none() {
            sqlx::query("INSERT INTO scoring_configs (config) VALUES ($1)")
                .bind(Json(&initial))
                .execute(&db)
                .await?;
            info!("seeded initial scoring configuration");
        }

        Ok(Self { db })
    }
}

#[async_trait]
impl ConfigProvider for PgConfigProvider {
    async fn get_active(&self) -> Result<ActiveConfig, StoreError> {
        let row: Option<ConfigRow> = sqlx::query_as(
            "SELECT version, config, created_at FROM scoring_configs ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.db)
        .await?;

        let (version, Json(config), activated_at) = row
            .ok_or_else(|| StoreError::Corrupt("no scoring configuration stored".to_string()))?;

        Ok(ActiveConfig {
            version: ConfigVersion(version),
            activated_at,
            config,
        })
    }

    async fn set_active(&self, config: ScoringConfig) -> Result<ActiveConfig, EvaluationError> {
        let config = checked(config)?;
        let (version, activated_at): (i64, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO scoring_configs (config) VALUES ($1) RETURNING version, created_at",
        )
        .bind(Json(&config))
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from)?;

        info!(version, "scoring configuration activated");
        Ok(ActiveConfig {
            version: ConfigVersion(version),
            activated_at,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::defaults;
    use crate::rubric::models::CategoryKey;

    #[tokio::test]
    async fn test_get_active_is_idempotent() {
        let provider = InMemoryConfigProvider::new(defaults::scoring_config());
        let first = provider.get_active().await.unwrap();
        let second = provider.get_active().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.version, ConfigVersion::INITIAL);
    }

    #[tokio::test]
    async fn test_set_active_bumps_version() {
        let provider = InMemoryConfigProvider::new(defaults::scoring_config());
        let mut next = defaults::scoring_config();
        if let Some(ops) = next.categories.get_mut(&CategoryKey::Ops) {
            ops.keywords.push("swift".to_string());
        }
        let activated = provider.set_active(next.clone()).await.unwrap();
        assert_eq!(activated.version, ConfigVersion(2));
        let active = provider.get_active().await.unwrap();
        assert_eq!(active.version, ConfigVersion(2));
        assert_eq!(active.config, next);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_and_version_kept() {
        let provider = InMemoryConfigProvider::new(defaults::scoring_config());
        let mut broken = defaults::scoring_config();
        broken.categories.clear();
        let err = provider.set_active(broken).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Configuration(_)));
        assert_eq!(
            provider.get_active().await.unwrap().version,
            ConfigVersion::INITIAL
        );
    }
}
