use anyhow::Result;
use chrono::Utc;
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use std::sync::Arc;

// The database URL for the production database
const DATABASE_URL: &str = "sqlite:classbank.db";

/// Default configuration values, used when a key has never been stored.
/// (key, value, description)
pub const CONFIG_DEFAULTS: &[(&str, &str, &str)] = &[
    (
        "interest_rate",
        "2.0",
        "Weekly interest rate as percentage",
    ),
    (
        "interest_day",
        "sunday",
        "Day of week to calculate interest",
    ),
];

/// DbConnection manages database operations
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        // Connect to the database
        let pool = SqlitePool::connect(url).await?;

        // Setup database schema
        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize the standard database
    pub async fn init() -> Result<Self> {
        Self::new(DATABASE_URL).await
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // Generate a unique database name for tests
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL DEFAULT 'student',
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                class_name TEXT,
                created_at TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            );
            "#,
        )
        .execute(pool)
        .await?;

        // The ledger: append-only, balances are derived by summation.
        // There are deliberately no UPDATE/DELETE paths against this table.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                amount INTEGER NOT NULL,
                kind TEXT NOT NULL,
                category_id INTEGER,
                notes TEXT,
                created_at TEXT NOT NULL,
                created_by_id INTEGER REFERENCES users(id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transactions_user_id ON transactions(user_id);",
        )
        .execute(pool)
        .await?;

        // One snapshot per (account, calendar day). The UNIQUE constraint is
        // what makes the daily snapshot job safely re-runnable.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                date TEXT NOT NULL,
                balance_at_snapshot INTEGER NOT NULL DEFAULT 0,
                UNIQUE(user_id, date)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS system_config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Get the underlying SQLite pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Store a configuration value.
    /// This will overwrite any existing value for the same key.
    pub async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let description = CONFIG_DEFAULTS
            .iter()
            .find(|(k, _, _)| *k == key)
            .map(|(_, _, d)| *d);

        sqlx::query(
            "INSERT OR REPLACE INTO system_config (key, value, description, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(key)
        .bind(value)
        .bind(description)
        .bind(Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Retrieve a configuration value by its key, falling back to the
    /// documented default when the key has never been stored.
    pub async fn get_config(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM system_config WHERE key = ?")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await?;

        match row {
            Some(r) => {
                let value: String = r.get("value");
                Ok(Some(value))
            }
            None => Ok(CONFIG_DEFAULTS
                .iter()
                .find(|(k, _, _)| *k == key)
                .map(|(_, v, _)| v.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Setup a new test database for each test
    async fn setup_test() -> DbConnection {
        DbConnection::init_test().await.expect("Failed to create test database")
    }

    #[tokio::test]
    async fn test_config_defaults_when_unset() {
        let db = setup_test().await;

        let rate = db.get_config("interest_rate").await.expect("Query failed");
        assert_eq!(rate.as_deref(), Some("2.0"));

        let day = db.get_config("interest_day").await.expect("Query failed");
        assert_eq!(day.as_deref(), Some("sunday"));

        let unknown = db.get_config("no_such_key").await.expect("Query failed");
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_set_and_get_config() {
        let db = setup_test().await;

        db.set_config("interest_rate", "3.5").await.expect("Failed to set config");

        let rate = db.get_config("interest_rate").await.expect("Query failed");
        assert_eq!(rate.as_deref(), Some("3.5"));
    }

    #[tokio::test]
    async fn test_set_config_replaces_value() {
        let db = setup_test().await;

        db.set_config("interest_rate", "1.0").await.expect("Failed to set config");
        db.set_config("interest_rate", "4.0").await.expect("Failed to update config");

        let rate = db.get_config("interest_rate").await.expect("Query failed");
        assert_eq!(rate.as_deref(), Some("4.0"));
    }

    #[tokio::test]
    async fn test_schema_setup_is_idempotent() {
        let db = setup_test().await;

        // Running schema setup again must not fail or wipe stored values
        db.set_config("interest_rate", "5.0").await.expect("Failed to set config");
        DbConnection::setup_schema(db.pool()).await.expect("Second setup failed");

        let rate = db.get_config("interest_rate").await.expect("Query failed");
        assert_eq!(rate.as_deref(), Some("5.0"));
    }
}
