use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};

/// Connects to the shop database. The schema belongs to the bot process, so nothing is migrated here.
pub async fn init_db(database_url: &str) -> Result<PgPool> {
    if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
        return Err(anyhow::anyhow!(
            "DATABASE_URL must start with postgres:// or postgresql://"
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_postgres_urls() {
        let err = init_db("sqlite://shop.db").await.unwrap_err();
        assert!(err.to_string().contains("postgres://"));
    }
}
