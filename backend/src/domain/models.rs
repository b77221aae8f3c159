//! Domain models backing the reward bank: accounts, ledger entries and
//! daily balance snapshots.

use serde::{Deserialize, Serialize};
use shared::TransactionDto;
use sqlx::FromRow;

/// Role of an account holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "teacher" => Some(Self::Teacher),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Physical token cashed in
    Deposit,
    /// Behavioral reward (always 1 DB$)
    Award,
    /// In-app purchases
    Spend,
    /// Weekly interest credit
    Interest,
    /// Raffle prize winnings
    Raffle,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Award => "award",
            Self::Spend => "spend",
            Self::Interest => "interest",
            Self::Raffle => "raffle",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(Self::Deposit),
            "award" => Some(Self::Award),
            "spend" => Some(Self::Spend),
            "interest" => Some(Self::Interest),
            "raffle" => Some(Self::Raffle),
            _ => None,
        }
    }
}

/// An account holder: student, teacher or admin.
///
/// Accounts are never hard-deleted (ledger entries reference them);
/// deactivation flips `is_active` instead.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub class_name: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    pub is_active: bool,
}

impl Account {
    pub fn role(&self) -> Option<UserRole> {
        UserRole::from_str(&self.role)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One immutable ledger entry. Amounts are signed whole DB$; balance is
/// always derived by summing an account's entries, never stored.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub kind: String,
    pub category_id: Option<i64>,
    pub notes: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Creating account; None for system-generated entries
    pub created_by_id: Option<i64>,
}

impl Transaction {
    pub fn kind(&self) -> Option<TransactionKind> {
        TransactionKind::from_str(&self.kind)
    }
}

impl From<Transaction> for TransactionDto {
    fn from(tx: Transaction) -> Self {
        TransactionDto {
            id: tx.id,
            user_id: tx.user_id,
            amount: tx.amount,
            kind: tx.kind,
            category_id: tx.category_id,
            notes: tx.notes,
            created_at: tx.created_at,
            created_by_id: tx.created_by_id,
        }
    }
}

/// A recorded balance for one account on one calendar day.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub id: i64,
    pub user_id: i64,
    /// Calendar date (YYYY-MM-DD)
    pub date: String,
    pub balance_at_snapshot: i64,
}
