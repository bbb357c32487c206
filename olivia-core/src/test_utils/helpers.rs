// File: olivia-core/src/test_utils/helpers.rs

use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgConnection, Pool, Postgres};
use tracing::info;

use crate::db::Database;
use crate::Error;

const TEST_DB: &str = "olivia_test";

/// Create the test database if it does not exist yet.
pub async fn ensure_test_database_exists() -> Result<(), Error> {
    let admin_url = std::env::var("DATABASE_ADMIN_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost/postgres".to_string());
    let mut conn = PgConnection::connect(&admin_url).await?;

    let create_db_sql = format!("CREATE DATABASE {TEST_DB};");
    match sqlx::query(&create_db_sql).execute(&mut conn).await {
        Ok(_) => info!("Created test DB '{TEST_DB}'."),
        // 42P04 => duplicate_database
        Err(e) if e.as_database_error().and_then(|d| d.code()).as_deref() == Some("42P04") => {}
        Err(e) => return Err(Error::Database(e)),
    }
    Ok(())
}

/// Pool for `TEST_DATABASE_URL`, else `postgres://postgres@localhost/olivia_test`.
pub async fn create_test_db_pool() -> Result<Pool<Postgres>, Error> {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| format!("postgres://postgres@localhost/{TEST_DB}"));

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await?;
    Ok(pool)
}

/// Wipes out catalog and enrollment data so each test starts fresh.
pub async fn clean_database(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query(
        r#"
        TRUNCATE TABLE
            member_enrollments,
            enrollments,
            sessions,
            classes,
            branches
        RESTART IDENTITY CASCADE;
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns a migrated, empty test DB handle.
pub async fn setup_test_database() -> Result<Database, Error> {
    ensure_test_database_exists().await?;
    let pool = create_test_db_pool().await?;
    let db = Database::from_pool(pool);
    db.migrate().await?;
    clean_database(db.pool()).await?;
    Ok(db)
}
