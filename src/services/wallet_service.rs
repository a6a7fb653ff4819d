use chrono::{Duration, Utc};
use password_hash::rand_core::{OsRng, RngCore};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::wallet::{
        StartWithdrawalRequest, TransactionList, VerifyWithdrawalRequest, WithdrawalChallenge,
    },
    entity::{
        enums::{TransactionKind, TransactionStatus, WithdrawalMethod, WithdrawalStatus},
        wallet_transactions::{
            ActiveModel as TransactionActive, Column as TransactionCol, Entity as WalletTransactions,
        },
        wallets::{ActiveModel as WalletActive, Entity as Wallets, Model as WalletModel},
        withdrawal_challenges::{ActiveModel as ChallengeActive, Entity as WithdrawalChallenges},
        withdrawal_requests::ActiveModel as WithdrawalActive,
    },
    error::{AppError, AppResult},
    events::StoreEvent,
    models::{PayoutDestination, Wallet, WalletTransaction, WithdrawalRequest},
    params::Pagination,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// How long a withdrawal OTP stays valid.
const OTP_TTL_MINUTES: i64 = 5;

pub async fn get_wallet(state: &AppState, user_id: Uuid) -> AppResult<ApiResponse<Wallet>> {
    let wallet = ensure_wallet(&state.orm, user_id).await?;
    Ok(ApiResponse::success(
        "Wallet",
        Wallet::from(wallet),
        Some(Meta::empty()),
    ))
}

pub async fn list_transactions(
    state: &AppState,
    user_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<TransactionList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = WalletTransactions::find()
        .filter(TransactionCol::UserId.eq(user_id))
        .order_by_desc(TransactionCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(WalletTransaction::from)
        .collect();

    Ok(ApiResponse::success(
        "Transactions",
        TransactionList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Step one of the withdrawal flow: validate amount and destination, then
/// issue a short-lived OTP challenge.
pub async fn start_withdrawal(
    state: &AppState,
    user_id: Uuid,
    payload: StartWithdrawalRequest,
) -> AppResult<ApiResponse<WithdrawalChallenge>> {
    let StartWithdrawalRequest {
        amount,
        method,
        destination,
    } = payload;

    if amount <= 0 {
        return Err(AppError::BadRequest("amount must be greater than 0".into()));
    }
    validate_destination(method, &destination)?;

    let wallet = ensure_wallet(&state.orm, user_id).await?;
    if amount > wallet.withdrawable {
        return Err(AppError::BadRequest(
            "Amount exceeds withdrawable balance".into(),
        ));
    }

    let now = Utc::now();
    let expires_at = now + Duration::minutes(OTP_TTL_MINUTES);
    let challenge = ChallengeActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        amount: Set(amount),
        method: Set(method),
        destination: Set(destination),
        code: Set(generate_code()),
        expires_at: Set(expires_at.into()),
        consumed: Set(false),
        created_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Verification code issued",
        WithdrawalChallenge {
            challenge_id: challenge.id,
            code: challenge.code,
            expires_at,
        },
        Some(Meta::empty()),
    ))
}

/// Step two: check the code, then debit the wallet, record the pending
/// transaction and file the withdrawal request as one atomic unit. The
/// transaction entry and the request share the same id.
pub async fn verify_withdrawal(
    state: &AppState,
    user_id: Uuid,
    payload: VerifyWithdrawalRequest,
) -> AppResult<ApiResponse<WithdrawalRequest>> {
    let txn = state.orm.begin().await?;

    let challenge = WithdrawalChallenges::find_by_id(payload.challenge_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if challenge.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    if challenge.consumed {
        return Err(AppError::BadRequest("Code already used".into()));
    }
    if Utc::now() > challenge.expires_at.with_timezone(&Utc) {
        return Err(AppError::BadRequest("Code expired".into()));
    }
    if challenge.code != payload.code.trim() {
        return Err(AppError::BadRequest("Invalid verification code".into()));
    }

    let wallet = ensure_wallet(&txn, user_id).await?;
    if challenge.amount > wallet.withdrawable {
        return Err(AppError::BadRequest(
            "Amount exceeds withdrawable balance".into(),
        ));
    }

    let now = Utc::now();
    let withdrawal_id = Uuid::new_v4();

    let withdrawable = wallet.withdrawable - challenge.amount;
    let mut wallet_active: WalletActive = wallet.into();
    wallet_active.withdrawable = Set(withdrawable);
    wallet_active.updated_at = Set(now.into());
    wallet_active.update(&txn).await?;

    TransactionActive {
        id: Set(withdrawal_id),
        user_id: Set(user_id),
        kind: Set(TransactionKind::Withdrawal),
        amount: Set(challenge.amount),
        status: Set(TransactionStatus::Pending),
        reference: Set(Some(withdrawal_id)),
        note: Set(None),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let request = WithdrawalActive {
        id: Set(withdrawal_id),
        user_id: Set(user_id),
        amount: Set(challenge.amount),
        method: Set(challenge.method),
        destination: Set(challenge.destination.clone()),
        status: Set(WithdrawalStatus::Pending),
        decided_at: Set(None),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut challenge_active: ChallengeActive = challenge.into();
    challenge_active.consumed = Set(true);
    challenge_active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user_id),
        "withdrawal_request",
        Some("withdrawal_requests"),
        Some(serde_json::json!({ "request_id": withdrawal_id, "amount": request.amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    state
        .events
        .publish(StoreEvent::WalletChanged { user_id });
    state.events.publish(StoreEvent::WithdrawalChanged {
        request_id: withdrawal_id,
    });

    Ok(ApiResponse::success(
        "Withdrawal requested",
        WithdrawalRequest::from(request),
        Some(Meta::empty()),
    ))
}

/// Wallets are created at signup, but credits can target accounts seeded
/// before that rule existed; creating on first touch keeps both paths safe.
pub(crate) async fn ensure_wallet<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<WalletModel> {
    if let Some(wallet) = Wallets::find_by_id(user_id).one(conn).await? {
        return Ok(wallet);
    }
    let wallet = WalletActive {
        user_id: Set(user_id),
        withdrawable: Set(0),
        usable: Set(0),
        updated_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(wallet)
}

fn validate_destination(
    method: WithdrawalMethod,
    destination: &PayoutDestination,
) -> AppResult<()> {
    let missing = match method {
        WithdrawalMethod::Upi => destination
            .upi_id
            .as_deref()
            .map_or(true, |v| v.trim().is_empty()),
        WithdrawalMethod::Bank => [
            destination.account_number.as_deref(),
            destination.ifsc.as_deref(),
            destination.holder_name.as_deref(),
        ]
        .iter()
        .any(|v| v.map_or(true, |s| s.trim().is_empty())),
    };
    if missing {
        return Err(AppError::BadRequest(
            "Payout destination is incomplete for the chosen method".into(),
        ));
    }
    Ok(())
}

fn generate_code() -> String {
    let mut bytes = [0u8; 4];
    OsRng.fill_bytes(&mut bytes);
    format!("{:06}", u32::from_le_bytes(bytes) % 1_000_000)
}
