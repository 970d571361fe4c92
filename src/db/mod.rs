use sqlx::{postgres::PgPoolOptions, Error, Executor, PgPool};
use thiserror::Error;

pub mod medications;
pub mod models;
pub mod users;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to parse database URL: {0}")]
    UrlParse(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] Error),
    #[error("Failed to create database: {0}")]
    CreateDb(String),
    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Stored data is invalid: {0}")]
    Corrupt(String),
}

/// Database handle. Owns the connection pool shared by the bot and the reminder job.
#[derive(Clone, Debug)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(url: &str) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Connects to the database named in `database_url`, creating it first if the
/// server does not have it yet, and applies pending migrations.
pub async fn init_db(database_url: &str) -> Result<Db, DatabaseError> {
    let (base_url, db_name) = parse_database_url(database_url)?;

    // Hosted servers may not expose the maintenance database; the target
    // database is then assumed to exist.
    match PgPoolOptions::new().max_connections(1).connect(&base_url).await {
        Ok(temp_pool) => ensure_database_exists(&temp_pool, &db_name).await?,
        Err(e) => log::warn!("Skipping database existence check: {}", e),
    }

    let db = Db::connect(database_url).await?;
    db.migrate().await?;
    log::info!("Database {} is ready", db_name);
    Ok(db)
}

fn parse_database_url(database_url: &str) -> Result<(String, String), DatabaseError> {
    let base_url = database_url
        .rsplit_once('/')
        .ok_or_else(|| DatabaseError::UrlParse("Invalid database URL format".to_string()))?
        .0
        .to_string();

    let db_name = database_url
        .split('/')
        .last()
        .and_then(|s| s.split('?').next())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DatabaseError::UrlParse("Failed to extract database name".to_string()))?
        .to_string();

    if base_url.ends_with('/') || !base_url.contains("://") {
        return Err(DatabaseError::UrlParse(
            "Database URL must include a host and a database name".to_string(),
        ));
    }

    Ok((base_url, db_name))
}

async fn ensure_database_exists(pool: &PgPool, db_name: &str) -> Result<(), DatabaseError> {
    let db_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(pool)
            .await
            .map_err(DatabaseError::Sqlx)?;

    if !db_exists {
        log::info!("Creating database {}", db_name);
        pool.execute(format!("CREATE DATABASE \"{}\"", db_name.replace('"', "")).as_str())
            .await
            .map_err(|e| DatabaseError::CreateDb(e.to_string()))?;
    }

    Ok(())
}
