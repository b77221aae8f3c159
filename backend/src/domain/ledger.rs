//! The ledger: an append-only log of DB$ movements.
//!
//! Balance is never stored; it is derived by summing an account's entries
//! on every read. There are no update or delete operations on the ledger,
//! anywhere; corrections are modeled as compensating entries.

use tracing::info;

use crate::db::DbConnection;
use crate::domain::accounts::AccountService;
use crate::domain::models::{Transaction, TransactionKind};
use crate::error::{DomainError, DomainResult};

/// Upper bound on stored note length, matching the column's intent.
const MAX_NOTE_LEN: usize = 255;

/// Maximum page size for transaction listings.
const MAX_PAGE_SIZE: u32 = 200;

/// Fields for a new ledger entry.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub amount: i64,
    pub kind: TransactionKind,
    pub category_id: Option<i64>,
    pub notes: Option<String>,
    /// Creating account; None for system-generated entries
    pub created_by_id: Option<i64>,
}

/// Filter for transaction history listings.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: Option<i64>,
    pub kind: Option<TransactionKind>,
    pub limit: u32,
    pub offset: u32,
}

/// A page of transactions plus the total match count.
#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total: i64,
}

#[derive(Clone)]
pub struct LedgerService {
    db: DbConnection,
    accounts: AccountService,
}

impl LedgerService {
    pub fn new(db: DbConnection) -> Self {
        let accounts = AccountService::new(db.clone());
        Self { db, accounts }
    }

    /// Append one immutable entry to the ledger.
    ///
    /// The only validation here is referential integrity (the account must
    /// exist). Business rules like award amounts and deposit positivity
    /// belong to the calling operation.
    pub async fn append(&self, new: NewTransaction) -> DomainResult<Transaction> {
        // Referential integrity: never silently drop a write against a
        // missing account.
        self.accounts.get_account(new.user_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO transactions (user_id, amount, kind, category_id, notes, created_at, created_by_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.user_id)
        .bind(new.amount)
        .bind(new.kind.as_str())
        .bind(new.category_id)
        .bind(&new.notes)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(new.created_by_id)
        .execute(self.db.pool())
        .await?;

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, amount, kind, category_id, notes, created_at, created_by_id
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(result.last_insert_rowid())
        .fetch_one(self.db.pool())
        .await?;

        Ok(transaction)
    }

    /// Current balance for an account: the sum of all its entries,
    /// recomputed fresh on every call. An account with no entries has
    /// balance 0.
    pub async fn balance(&self, user_id: i64) -> DomainResult<i64> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(balance)
    }

    /// Lifetime interest credited to an account.
    pub async fn interest_earned(&self, user_id: i64) -> DomainResult<i64> {
        let earned = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE user_id = ? AND kind = ?",
        )
        .bind(user_id)
        .bind(TransactionKind::Interest.as_str())
        .fetch_one(self.db.pool())
        .await?;

        Ok(earned)
    }

    /// Award 1 DB$ to a student for positive behavior.
    ///
    /// Awards are always exactly 1 DB$; the target must be an active
    /// student.
    pub async fn award(
        &self,
        student_id: i64,
        category_id: Option<i64>,
        notes: Option<String>,
        created_by_id: Option<i64>,
    ) -> DomainResult<Transaction> {
        let student = self.accounts.get_active_student(student_id).await?;

        let transaction = self
            .append(NewTransaction {
                user_id: student.id,
                amount: 1,
                kind: TransactionKind::Award,
                category_id,
                notes: clean_notes(notes),
                created_by_id,
            })
            .await?;

        info!("Awarded 1 DB$ to student {}", student.id);
        Ok(transaction)
    }

    /// Deposit physical DB$ tokens into a student's account.
    pub async fn deposit(
        &self,
        student_id: i64,
        amount: i64,
        notes: Option<String>,
        created_by_id: Option<i64>,
    ) -> DomainResult<Transaction> {
        if amount <= 0 {
            return Err(DomainError::Validation(
                "deposit amount must be a positive integer".to_string(),
            ));
        }

        let student = self.accounts.get_active_student(student_id).await?;

        let transaction = self
            .append(NewTransaction {
                user_id: student.id,
                amount,
                kind: TransactionKind::Deposit,
                category_id: None,
                notes: clean_notes(notes),
                created_by_id,
            })
            .await?;

        info!("Deposited {} DB$ for student {}", amount, student.id);
        Ok(transaction)
    }

    /// Transaction history, newest first, with optional account and kind
    /// filters.
    pub async fn list(&self, filter: TransactionFilter) -> DomainResult<TransactionPage> {
        let limit = filter.limit.min(MAX_PAGE_SIZE);
        let kind = filter.kind.map(|k| k.as_str());

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR kind = ?2)
            "#,
        )
        .bind(filter.user_id)
        .bind(kind)
        .fetch_one(self.db.pool())
        .await?;

        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, amount, kind, category_id, notes, created_at, created_by_id
            FROM transactions
            WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR kind = ?2)
            ORDER BY created_at DESC, id DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(filter.user_id)
        .bind(kind)
        .bind(i64::from(limit))
        .bind(i64::from(filter.offset))
        .fetch_all(self.db.pool())
        .await?;

        Ok(TransactionPage { transactions, total })
    }
}

/// Trim notes, cap their length, and drop empty strings.
fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().chars().take(MAX_NOTE_LEN).collect::<String>())
        .filter(|n| !n.is_empty())
}
