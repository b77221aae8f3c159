use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use shared::{
    AwardRequest, BalanceResponse, ConfigResponse, DepositRequest, SnapshotRunResponse,
    TransactionCreatedResponse, TransactionListResponse, UpdateConfigRequest,
    UpdateConfigResponse,
};
use tracing::info;

use crate::db::DbConnection;
use crate::domain::accounts::AccountService;
use crate::domain::config::ConfigService;
use crate::domain::interest::InterestService;
use crate::domain::ledger::{LedgerService, TransactionFilter};
use crate::domain::models::TransactionKind;
use crate::domain::snapshot::SnapshotService;
use crate::error::DomainError;

/// Default page size for transaction listings.
const DEFAULT_PAGE_SIZE: u32 = 50;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub ledger: LedgerService,
    pub snapshots: SnapshotService,
    pub interest: InterestService,
    pub config: ConfigService,
}

impl AppState {
    /// Create new application state over one database connection
    pub fn new(db: DbConnection) -> Self {
        Self {
            accounts: AccountService::new(db.clone()),
            ledger: LedgerService::new(db.clone()),
            snapshots: SnapshotService::new(db.clone()),
            interest: InterestService::new(db.clone()),
            config: ConfigService::new(db),
        }
    }
}

/// Map a domain error onto an HTTP response.
fn error_response(e: DomainError) -> Response {
    let status = match &e {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Validation(_) | DomainError::Configuration(_) => StatusCode::BAD_REQUEST,
        DomainError::Database(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {:?}", e);
    }
    (status, e.to_string()).into_response()
}

/// Axum handler for POST /api/transactions/award
pub async fn award(
    State(state): State<AppState>,
    Json(request): Json<AwardRequest>,
) -> impl IntoResponse {
    info!("POST /api/transactions/award - student {}", request.student_id);

    let result = state
        .ledger
        .award(request.student_id, request.category_id, request.notes, request.created_by)
        .await;

    match result {
        Ok(transaction) => match state.ledger.balance(transaction.user_id).await {
            Ok(new_balance) => (
                StatusCode::CREATED,
                Json(TransactionCreatedResponse { transaction: transaction.into(), new_balance }),
            )
                .into_response(),
            Err(e) => error_response(e),
        },
        Err(e) => error_response(e),
    }
}

/// Axum handler for POST /api/transactions/deposit
pub async fn deposit(
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/transactions/deposit - student {}, amount {}",
        request.student_id, request.amount
    );

    let result = state
        .ledger
        .deposit(request.student_id, request.amount, request.notes, request.created_by)
        .await;

    match result {
        Ok(transaction) => match state.ledger.balance(transaction.user_id).await {
            Ok(new_balance) => (
                StatusCode::CREATED,
                Json(TransactionCreatedResponse { transaction: transaction.into(), new_balance }),
            )
                .into_response(),
            Err(e) => error_response(e),
        },
        Err(e) => error_response(e),
    }
}

/// Query parameters for the transaction list endpoint
#[derive(Deserialize, Debug)]
pub struct TransactionListQuery {
    pub user_id: Option<i64>,
    pub kind: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Axum handler for GET /api/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> impl IntoResponse {
    info!("GET /api/transactions - query: {:?}", query);

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);
    let filter = TransactionFilter {
        user_id: query.user_id,
        // An unknown kind string is ignored rather than rejected
        kind: query.kind.as_deref().and_then(TransactionKind::from_str),
        limit,
        offset,
    };

    match state.ledger.list(filter).await {
        Ok(page) => Json(TransactionListResponse {
            transactions: page.transactions.into_iter().map(Into::into).collect(),
            total: page.total,
            limit,
            offset,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Axum handler for GET /api/balance/:user_id
pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/balance/{}", user_id);

    if let Err(e) = state.accounts.get_account(user_id).await {
        return error_response(e);
    }

    let balance = match state.ledger.balance(user_id).await {
        Ok(balance) => balance,
        Err(e) => return error_response(e),
    };
    match state.ledger.interest_earned(user_id).await {
        Ok(interest_earned) => {
            Json(BalanceResponse { user_id, balance, interest_earned }).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Axum handler for POST /api/admin/snapshot/run
///
/// Manual trigger for the daily snapshot; safe to call repeatedly thanks
/// to the per-(account, date) uniqueness of snapshots.
pub async fn run_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    let today = Local::now().date_naive();
    info!("POST /api/admin/snapshot/run - date {}", today);

    match state.snapshots.take_daily_snapshot(today).await {
        Ok(snapshots_created) => Json(SnapshotRunResponse {
            date: today.format("%Y-%m-%d").to_string(),
            snapshots_created,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Axum handler for POST /api/admin/interest/run
///
/// Manual trigger for the weekly interest run. Like the scheduled run, it
/// carries no per-week guard: triggering it twice in one week credits
/// interest twice.
pub async fn run_interest(State(state): State<AppState>) -> impl IntoResponse {
    let today = Local::now().date_naive();
    info!("POST /api/admin/interest/run - date {}", today);

    match state.interest.calculate_weekly_interest(today).await {
        Ok(run) => Json(run).into_response(),
        Err(e) => error_response(e),
    }
}

/// Axum handler for GET /api/admin/config
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/admin/config");

    match state.config.list().await {
        Ok(config) => Json(ConfigResponse { config }).into_response(),
        Err(e) => error_response(e),
    }
}

/// Axum handler for PUT /api/admin/config
pub async fn update_config(
    State(state): State<AppState>,
    Json(request): Json<UpdateConfigRequest>,
) -> impl IntoResponse {
    info!("PUT /api/admin/config - request: {:?}", request);

    match state.config.update(&request).await {
        Ok(updated) => Json(UpdateConfigResponse { updated }).into_response(),
        Err(e) => error_response(e),
    }
}
