use serde::{Deserialize, Serialize};

/// A single ledger entry as it appears on the wire.
///
/// Amounts are whole DB$ (positive for credit, negative for debit); the
/// ledger never stores fractional points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDto {
    pub id: i64,
    /// Account the entry belongs to
    pub user_id: i64,
    /// Signed amount in DB$
    pub amount: i64,
    /// One of: deposit, award, spend, interest, raffle
    pub kind: String,
    /// Optional behavior category the entry was awarded under
    pub category_id: Option<i64>,
    pub notes: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Account that created the entry; None for system-generated entries
    pub created_by_id: Option<i64>,
}

/// Request to award 1 DB$ to a student for positive behavior.
///
/// Awards are always exactly 1 DB$; the amount is not part of the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardRequest {
    pub student_id: i64,
    /// Optional behavior category for the award
    pub category_id: Option<i64>,
    pub notes: Option<String>,
    /// Awarding teacher, recorded for audit
    pub created_by: Option<i64>,
}

/// Request to deposit physical DB$ tokens into a student's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub student_id: i64,
    /// Number of tokens deposited; must be a positive integer
    pub amount: i64,
    pub notes: Option<String>,
    /// Depositing teacher, recorded for audit
    pub created_by: Option<i64>,
}

/// Response for a newly created transaction, including the account's
/// freshly derived balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCreatedResponse {
    pub transaction: TransactionDto,
    pub new_balance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionDto>,
    /// Total number of matching transactions (ignoring pagination)
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

/// Balance lookup result for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: i64,
    /// Current balance, derived by summing the account's ledger entries
    pub balance: i64,
    /// Lifetime sum of interest-kind entries
    pub interest_earned: i64,
}

/// Result of a daily snapshot run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRunResponse {
    /// Calendar date the snapshots were taken for (YYYY-MM-DD)
    pub date: String,
    /// Number of snapshot rows actually created this run
    pub snapshots_created: u64,
}

/// Outcome of a weekly interest run.
///
/// A non-positive configured rate short-circuits the whole run; otherwise
/// the run reports how many accounts were credited and the total amount
/// distributed. The interest transactions themselves are the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InterestRun {
    /// Rate was zero or negative; no accounts were visited
    Skipped { rate: f64 },
    Applied {
        students_credited: u64,
        total_distributed: i64,
        rate: f64,
    },
}

/// One system configuration entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub config: Vec<ConfigEntry>,
}

/// Request to update system configuration. Only the provided fields are
/// written; each is validated before any write happens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfigRequest {
    /// Weekly interest rate as a percentage string, e.g. "2.0"
    pub interest_rate: Option<String>,
    /// Day of week the weekly interest job runs, e.g. "sunday"
    pub interest_day: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfigResponse {
    pub updated: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interest_run_serializes_with_outcome_tag() {
        let skipped = InterestRun::Skipped { rate: 0.0 };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["outcome"], "skipped");

        let applied = InterestRun::Applied {
            students_credited: 3,
            total_distributed: 12,
            rate: 2.0,
        };
        let json = serde_json::to_value(&applied).unwrap();
        assert_eq!(json["outcome"], "applied");
        assert_eq!(json["students_credited"], 3);
        assert_eq!(json["total_distributed"], 12);
    }

    #[test]
    fn update_config_request_accepts_partial_bodies() {
        let req: UpdateConfigRequest =
            serde_json::from_str(r#"{"interest_rate": "2.5"}"#).unwrap();
        assert_eq!(req.interest_rate.as_deref(), Some("2.5"));
        assert!(req.interest_day.is_none());
    }
}
