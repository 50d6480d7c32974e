use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Floor on pooled connections regardless of batch width.
const MIN_CONNECTIONS: u32 = 5;

/// Pool size for a given batch width: each in-flight evaluation holds at
/// most two connections (record read and evaluation upsert).
pub fn pool_size(batch_concurrency: usize) -> u32 {
    let wanted = u32::try_from(batch_concurrency.saturating_mul(2)).unwrap_or(u32::MAX);
    wanted.max(MIN_CONNECTIONS)
}

/// Connects to PostgreSQL and applies pending migrations.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!(max_connections, "Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("PostgreSQL schema up to date");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size_tracks_batch_width() {
        assert_eq!(pool_size(1), MIN_CONNECTIONS);
        assert_eq!(pool_size(4), 8);
        assert_eq!(pool_size(16), 32);
    }
}
