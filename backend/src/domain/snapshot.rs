//! Daily balance snapshots.
//!
//! Once per calendar day, every active student's derived balance is
//! recorded as one `daily_snapshots` row. The per-(account, date)
//! uniqueness constraint makes the job idempotent: re-running it on the
//! same day only fills in whatever a previous (possibly crashed) run left
//! missing.

use chrono::NaiveDate;
use tracing::info;

use crate::db::DbConnection;
use crate::domain::accounts::AccountService;
use crate::domain::ledger::LedgerService;
use crate::error::DomainResult;

#[derive(Clone)]
pub struct SnapshotService {
    db: DbConnection,
    accounts: AccountService,
    ledger: LedgerService,
}

impl SnapshotService {
    pub fn new(db: DbConnection) -> Self {
        let accounts = AccountService::new(db.clone());
        let ledger = LedgerService::new(db.clone());
        Self { db, accounts, ledger }
    }

    /// Capture the daily balance snapshot for all active students.
    ///
    /// Returns the number of snapshot rows actually created. Accounts that
    /// already have a snapshot for `today` are skipped, so duplicate
    /// invocations (scheduler retry, crash-restart mid-batch) are safe and
    /// create zero extra rows.
    pub async fn take_daily_snapshot(&self, today: NaiveDate) -> DomainResult<u64> {
        let date = today.format("%Y-%m-%d").to_string();
        let students = self.accounts.list_active_students().await?;

        let mut snapshots_created = 0u64;
        for student in &students {
            let existing = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM daily_snapshots WHERE user_id = ? AND date = ?",
            )
            .bind(student.id)
            .bind(&date)
            .fetch_one(self.db.pool())
            .await?;
            if existing > 0 {
                continue;
            }

            let balance = self.ledger.balance(student.id).await?;

            // INSERT OR IGNORE: the UNIQUE(user_id, date) constraint turns a
            // duplicate into a store-level no-op rather than an error.
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO daily_snapshots (user_id, date, balance_at_snapshot)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(student.id)
            .bind(&date)
            .bind(balance)
            .execute(self.db.pool())
            .await?;

            snapshots_created += result.rows_affected();
        }

        info!(
            "Daily snapshot for {}: {} created ({} students active)",
            date,
            snapshots_created,
            students.len()
        );
        Ok(snapshots_created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::accounts::NewAccount;
    use crate::domain::models::UserRole;

    async fn setup() -> (SnapshotService, LedgerService, AccountService, DbConnection) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        (
            SnapshotService::new(db.clone()),
            LedgerService::new(db.clone()),
            AccountService::new(db.clone()),
            db,
        )
    }

    async fn create_account(accounts: &AccountService, username: &str, role: UserRole) -> i64 {
        accounts
            .create_account(NewAccount {
                username: username.to_string(),
                role,
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                class_name: None,
            })
            .await
            .unwrap()
            .id
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn snapshot_balance(db: &DbConnection, user_id: i64, date: &str) -> Option<i64> {
        sqlx::query_as::<_, crate::domain::models::DailySnapshot>(
            "SELECT id, user_id, date, balance_at_snapshot FROM daily_snapshots WHERE user_id = ? AND date = ?",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(db.pool())
        .await
        .unwrap()
        .map(|snapshot| snapshot.balance_at_snapshot)
    }

    #[tokio::test]
    async fn test_creates_one_snapshot_per_active_student() {
        let (snapshots, ledger, accounts, db) = setup().await;
        let s1 = create_account(&accounts, "s1", UserRole::Student).await;
        let s2 = create_account(&accounts, "s2", UserRole::Student).await;
        ledger.deposit(s1, 100, None, None).await.unwrap();

        let created = snapshots.take_daily_snapshot(day("2026-03-02")).await.unwrap();

        assert_eq!(created, 2);
        assert_eq!(snapshot_balance(&db, s1, "2026-03-02").await, Some(100));
        assert_eq!(snapshot_balance(&db, s2, "2026-03-02").await, Some(0));
    }

    #[tokio::test]
    async fn test_second_run_same_day_creates_nothing() {
        let (snapshots, ledger, accounts, _db) = setup().await;
        let s1 = create_account(&accounts, "s1", UserRole::Student).await;
        ledger.deposit(s1, 50, None, None).await.unwrap();

        let first = snapshots.take_daily_snapshot(day("2026-03-02")).await.unwrap();
        let second = snapshots.take_daily_snapshot(day("2026-03-02")).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn test_snapshot_keeps_first_value_for_the_day() {
        let (snapshots, ledger, accounts, db) = setup().await;
        let s1 = create_account(&accounts, "s1", UserRole::Student).await;
        ledger.deposit(s1, 50, None, None).await.unwrap();

        snapshots.take_daily_snapshot(day("2026-03-02")).await.unwrap();
        // Balance changes after the snapshot was taken
        ledger.deposit(s1, 25, None, None).await.unwrap();
        snapshots.take_daily_snapshot(day("2026-03-02")).await.unwrap();

        assert_eq!(snapshot_balance(&db, s1, "2026-03-02").await, Some(50));
    }

    #[tokio::test]
    async fn test_excludes_teachers_and_inactive_students() {
        let (snapshots, _ledger, accounts, db) = setup().await;
        let s1 = create_account(&accounts, "s1", UserRole::Student).await;
        let s2 = create_account(&accounts, "s2", UserRole::Student).await;
        let t1 = create_account(&accounts, "t1", UserRole::Teacher).await;
        accounts.deactivate_account(s2).await.unwrap();

        let created = snapshots.take_daily_snapshot(day("2026-03-02")).await.unwrap();

        assert_eq!(created, 1);
        assert!(snapshot_balance(&db, s1, "2026-03-02").await.is_some());
        assert!(snapshot_balance(&db, s2, "2026-03-02").await.is_none());
        assert!(snapshot_balance(&db, t1, "2026-03-02").await.is_none());
    }

    #[tokio::test]
    async fn test_resumes_after_partial_run() {
        let (snapshots, _ledger, accounts, db) = setup().await;
        let s1 = create_account(&accounts, "s1", UserRole::Student).await;
        let s2 = create_account(&accounts, "s2", UserRole::Student).await;

        // Simulate a crashed run that only got through the first student
        sqlx::query(
            "INSERT INTO daily_snapshots (user_id, date, balance_at_snapshot) VALUES (?, ?, ?)",
        )
        .bind(s1)
        .bind("2026-03-02")
        .bind(0_i64)
        .execute(db.pool())
        .await
        .unwrap();

        let created = snapshots.take_daily_snapshot(day("2026-03-02")).await.unwrap();

        assert_eq!(created, 1);
        assert!(snapshot_balance(&db, s2, "2026-03-02").await.is_some());
    }

    #[tokio::test]
    async fn test_distinct_days_get_distinct_rows() {
        let (snapshots, ledger, accounts, db) = setup().await;
        let s1 = create_account(&accounts, "s1", UserRole::Student).await;
        ledger.deposit(s1, 10, None, None).await.unwrap();

        snapshots.take_daily_snapshot(day("2026-03-02")).await.unwrap();
        ledger.deposit(s1, 5, None, None).await.unwrap();
        let created = snapshots.take_daily_snapshot(day("2026-03-03")).await.unwrap();

        assert_eq!(created, 1);
        assert_eq!(snapshot_balance(&db, s1, "2026-03-02").await, Some(10));
        assert_eq!(snapshot_balance(&db, s1, "2026-03-03").await, Some(15));
    }
}
