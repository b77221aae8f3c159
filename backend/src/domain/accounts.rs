//! Account directory: creation, lookup and soft-deactivation of account
//! holders, plus the active-student listing consumed by the snapshot and
//! interest jobs.

use chrono::Utc;
use sqlx::error::ErrorKind;
use tracing::info;

use crate::db::DbConnection;
use crate::domain::models::{Account, UserRole};
use crate::error::{DomainError, DomainResult};

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    /// Class label such as "5A", for students
    pub class_name: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    db: DbConnection,
}

impl AccountService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Create a new account. Usernames are unique across all roles.
    pub async fn create_account(&self, new: NewAccount) -> DomainResult<Account> {
        let username = new.username.trim().to_lowercase();
        if username.is_empty() {
            return Err(DomainError::Validation("username is required".to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, role, first_name, last_name, class_name, created_at, is_active)
            VALUES (?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(&username)
        .bind(new.role.as_str())
        .bind(new.first_name.trim())
        .bind(new.last_name.trim())
        .bind(&new.class_name)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.kind() == ErrorKind::UniqueViolation => {
                DomainError::Validation(format!("username already exists: {}", username))
            }
            other => DomainError::from(other),
        })?;

        let account = self.get_account(result.last_insert_rowid()).await?;
        info!("Created {} account {} ({})", account.role, account.id, account.username);
        Ok(account)
    }

    /// Look up an account by id.
    pub async fn get_account(&self, id: i64) -> DomainResult<Account> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, role, first_name, last_name, class_name, created_at, is_active
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("account {}", id)))
    }

    /// Look up an account that must be an active student; this is the check
    /// award and deposit operations perform on their target.
    pub async fn get_active_student(&self, id: i64) -> DomainResult<Account> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, role, first_name, last_name, class_name, created_at, is_active
            FROM users
            WHERE id = ? AND role = 'student' AND is_active = 1
            "#,
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("student {}", id)))
    }

    /// List all active student accounts, ordered by id. Only these accounts
    /// participate in snapshotting and interest.
    pub async fn list_active_students(&self) -> DomainResult<Vec<Account>> {
        let students = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, role, first_name, last_name, class_name, created_at, is_active
            FROM users
            WHERE role = 'student' AND is_active = 1
            ORDER BY id
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(students)
    }

    /// Soft-deactivate an account. The row stays (ledger entries reference
    /// it); the account just stops participating in snapshots and interest.
    pub async fn deactivate_account(&self, id: i64) -> DomainResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("account {}", id)));
        }

        info!("Deactivated account {}", id);
        Ok(())
    }
}
