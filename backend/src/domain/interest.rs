//! Weekly interest on the minimum balance.
//!
//! Interest rewards sustained balance, not momentary balance: each
//! account's interest base is the smallest snapshot balance observed in
//! the trailing week, so depositing right before the run and withdrawing
//! right after earns nothing extra.

use chrono::{Duration, NaiveDate};
use shared::InterestRun;
use tracing::info;

use crate::db::DbConnection;
use crate::domain::accounts::AccountService;
use crate::domain::config::ConfigService;
use crate::domain::ledger::{LedgerService, NewTransaction};
use crate::domain::models::TransactionKind;
use crate::error::DomainResult;

/// Length of the trailing window, in days. The window is inclusive on both
/// ends: `[today - 7, today]`.
const WINDOW_DAYS: i64 = 7;

#[derive(Clone)]
pub struct InterestService {
    db: DbConnection,
    accounts: AccountService,
    ledger: LedgerService,
    config: ConfigService,
}

impl InterestService {
    pub fn new(db: DbConnection) -> Self {
        let accounts = AccountService::new(db.clone());
        let ledger = LedgerService::new(db.clone());
        let config = ConfigService::new(db.clone());
        Self { db, accounts, ledger, config }
    }

    /// Calculate and apply weekly interest for all active students.
    ///
    /// Per account: interest = min_weekly_balance × rate / 100, truncated
    /// toward zero. The minimum is taken over the account's daily
    /// snapshots in the trailing week; an account with no snapshots in the
    /// window falls back to its current derived balance as the proxy
    /// minimum (absence of history is treated as a constant balance, a
    /// known approximation that can overstate interest for accounts that
    /// recently lost balance). Accounts whose minimum is zero or
    /// negative, or whose computed interest truncates to zero, receive no
    /// entry at all.
    ///
    /// There is no "already credited this week" guard: invoking this twice
    /// within the same week credits interest twice. The scheduler running
    /// it at most once per week is a hard operational precondition.
    pub async fn calculate_weekly_interest(&self, today: NaiveDate) -> DomainResult<InterestRun> {
        let rate = self.config.interest_rate().await?;

        if rate <= 0.0 {
            info!("Interest rate is {}, skipping weekly interest run", rate);
            return Ok(InterestRun::Skipped { rate });
        }

        let week_start = today - Duration::days(WINDOW_DAYS);
        let students = self.accounts.list_active_students().await?;

        let mut students_credited = 0u64;
        let mut total_distributed = 0i64;

        for student in &students {
            let min_balance = match self.min_snapshot_balance(student.id, week_start, today).await? {
                Some(min) => min,
                // No snapshots in the window (new account, or the snapshot
                // job never ran): use the current balance as proxy minimum.
                None => self.ledger.balance(student.id).await?,
            };

            // No interest on zero or negative balances
            if min_balance <= 0 {
                continue;
            }

            let amount = (min_balance as f64 * rate / 100.0) as i64;
            if amount <= 0 {
                continue;
            }

            self.ledger
                .append(NewTransaction {
                    user_id: student.id,
                    amount,
                    kind: TransactionKind::Interest,
                    category_id: None,
                    notes: Some(format!(
                        "Weekly interest ({}% on min balance {})",
                        rate, min_balance
                    )),
                    // System-generated: no creator
                    created_by_id: None,
                })
                .await?;

            students_credited += 1;
            total_distributed += amount;
        }

        info!(
            "Weekly interest for {}: {} students credited, {} DB$ distributed at {}%",
            today, students_credited, total_distributed, rate
        );
        Ok(InterestRun::Applied { students_credited, total_distributed, rate })
    }

    /// Minimum snapshot balance for an account within the inclusive date
    /// range, or None when the account has no snapshots there.
    async fn min_snapshot_balance(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DomainResult<Option<i64>> {
        let min = sqlx::query_scalar::<_, Option<i64>>(
            r#"
            SELECT MIN(balance_at_snapshot)
            FROM daily_snapshots
            WHERE user_id = ? AND date >= ? AND date <= ?
            "#,
        )
        .bind(user_id)
        .bind(from.format("%Y-%m-%d").to_string())
        .bind(to.format("%Y-%m-%d").to_string())
        .fetch_one(self.db.pool())
        .await?;

        Ok(min)
    }
}
