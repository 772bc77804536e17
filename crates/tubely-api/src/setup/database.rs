//! Database setup and initialization

use anyhow::Result;
use sqlx::PgPool;
use tubely_core::Config;

/// Connect the pool and apply pending migrations.
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    let pool = tubely_db::connect(config).await?;
    tubely_db::run_migrations(&pool).await?;
    Ok(pool)
}
