pub mod models;
pub mod credentials;
pub mod sessions;
pub mod recipes;
pub mod engagement;

pub use models::{Comment, CredentialRecord, NewRecipe, Recipe, SectionLike, Session};
pub use credentials::CredentialRepository;
pub use sessions::SessionRepository;
pub use recipes::RecipeRepository;
pub use engagement::EngagementRepository;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::config::Config;
use crate::error::AppError;

/// Open the configured database, creating the file on first run
pub async fn connect(config: &Config) -> Result<Pool<Sqlite>, AppError> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Single-connection in-memory database; the connection must never be
/// recycled or the data goes with it.
pub async fn in_memory() -> Result<Pool<Sqlite>, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
