use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Error, SqlitePool};

use crate::configs::schema::SchemaManager;
use crate::configs::settings::Database;

/// SQLite pool behind the repositories.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(database: &Database, schema_manager: SchemaManager) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(&database.url)?.foreign_keys(true);
        let connections = database.connections.max(1);

        // An in-memory database only lives as long as one of its connections,
        // so every connection is opened up front and never recycled
        let pool = SqlitePoolOptions::new()
            .min_connections(connections)
            .max_connections(connections)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .test_before_acquire(false)
            .connect_with(options)
            .await?;

        Self::create_schema(&pool, &schema_manager, database.clean_start).await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create_schema(
        pool: &SqlitePool,
        schema: &SchemaManager,
        clean_start: bool,
    ) -> Result<(), Error> {
        if clean_start {
            sqlx::query(&schema.dispose_schema().join("\n"))
                .execute(pool)
                .await?;

            tracing::warn!("perform a clean boot: dropped every table");
        }

        sqlx::query(&schema.create_schema().join("\n"))
            .execute(pool)
            .await?;

        Ok(())
    }
}
