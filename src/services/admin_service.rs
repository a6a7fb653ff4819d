use std::path::Path;

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    auth::{AuthUser, ensure_admin},
    dto::admin::{
        BlockUserRequest, CreditWalletRequest, ExportCollection, ExportFile,
        RemoveListingRequest, ResolveDisputeRequest, SetShutdownRequest, UserList,
    },
    dto::disputes::DisputeList,
    dto::wallet::WithdrawalList,
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        disputes::{ActiveModel as DisputeActive, Column as DisputeCol, Entity as Disputes},
        enums::{
            DisputeStatus, ListingStatus, TransactionKind, TransactionStatus, UserStatus,
            WithdrawalStatus,
        },
        listings::{ActiveModel as ListingActive, Column as ListingCol, Entity as Listings},
        offers::{Column as OfferCol, Entity as Offers},
        orders::{Column as OrderCol, Entity as Orders},
        platform_settings::{ActiveModel as SettingsActive, Entity as PlatformSettings},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
        wallet_transactions::{
            ActiveModel as TransactionActive, Column as TransactionCol, Entity as WalletTransactions,
        },
        wallets::{ActiveModel as WalletActive, Column as WalletCol, Entity as Wallets},
        withdrawal_requests::{
            ActiveModel as WithdrawalActive, Column as WithdrawalCol, Entity as WithdrawalRequests,
        },
    },
    error::{AppError, AppResult},
    events::StoreEvent,
    models::{
        AuditLog, Dispute, Listing, Offer, Order, User, Wallet, WalletTransaction,
        WithdrawalRequest,
    },
    notify::push_notification,
    params::{DisputeListQuery, UserListQuery, WithdrawalListQuery},
    response::{ApiResponse, Meta},
    services::wallet_service::ensure_wallet,
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    admin: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(admin)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(UserCol::Status.eq(status));
    }
    if let Some(blocked) = query.blocked {
        condition = condition.add(UserCol::IsBlocked.eq(blocked));
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(UserCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn approve_user(
    state: &AppState,
    admin: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<User>> {
    decide_approval(state, admin, user_id, UserStatus::Approved).await
}

pub async fn reject_user(
    state: &AppState,
    admin: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<User>> {
    decide_approval(state, admin, user_id, UserStatus::Rejected).await
}

async fn decide_approval(
    state: &AppState,
    admin: &AuthUser,
    user_id: Uuid,
    decision: UserStatus,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(admin)?;

    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if user.status != UserStatus::Pending {
        return Err(AppError::BadRequest("User is not pending approval".into()));
    }

    let mut active: UserActive = user.into();
    active.status = Set(decision);
    let user = active.update(&state.orm).await?;

    let action = match decision {
        UserStatus::Approved => "user_approve",
        _ => "user_reject",
    };
    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        action,
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let note = match decision {
        UserStatus::Approved => "Your account was approved. Welcome to GradKart!",
        _ => "Your account application was rejected.",
    };
    if let Err(err) = push_notification(state, user_id, "account_update", note).await {
        tracing::warn!(error = %err, "notification failed");
    }

    state.events.publish(StoreEvent::UserChanged { user_id });

    Ok(ApiResponse::success(
        "User updated",
        User::from(user),
        Some(Meta::empty()),
    ))
}

pub async fn block_user(
    state: &AppState,
    admin: &AuthUser,
    user_id: Uuid,
    payload: BlockUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(admin)?;

    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if user.role == "admin" {
        return Err(AppError::BadRequest("Cannot block an admin account".into()));
    }

    let mut active: UserActive = user.into();
    active.is_blocked = Set(true);
    active.block_reason = Set(Some(payload.reason));
    active.blocked_at = Set(Some(Utc::now().into()));
    let user = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "user_block",
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    state.events.publish(StoreEvent::UserChanged { user_id });

    Ok(ApiResponse::success(
        "User blocked",
        User::from(user),
        Some(Meta::empty()),
    ))
}

pub async fn unblock_user(
    state: &AppState,
    admin: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(admin)?;

    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = user.into();
    active.is_blocked = Set(false);
    active.block_reason = Set(None);
    active.blocked_at = Set(None);
    let user = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "user_unblock",
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) =
        push_notification(state, user_id, "account_update", "Your account was unblocked.").await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    state.events.publish(StoreEvent::UserChanged { user_id });

    Ok(ApiResponse::success(
        "User unblocked",
        User::from(user),
        Some(Meta::empty()),
    ))
}

pub async fn remove_listing(
    state: &AppState,
    admin: &AuthUser,
    listing_id: Uuid,
    payload: RemoveListingRequest,
) -> AppResult<ApiResponse<Listing>> {
    ensure_admin(admin)?;

    let listing = Listings::find_by_id(listing_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if listing.status == ListingStatus::Sold {
        return Err(AppError::BadRequest(
            "Sold listings cannot be removed".into(),
        ));
    }

    let seller_id = listing.seller_id;
    let version = listing.version;
    let mut active: ListingActive = listing.into();
    active.status = Set(ListingStatus::Removed);
    active.removed_reason = Set(Some(payload.reason));
    active.version = Set(version + 1);
    active.updated_at = Set(Utc::now().into());
    let listing = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "listing_remove",
        Some("listings"),
        Some(serde_json::json!({ "listing_id": listing_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) = push_notification(
        state,
        seller_id,
        "listing_update",
        "One of your listings was removed by moderation.",
    )
    .await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    state
        .events
        .publish(StoreEvent::ListingChanged { listing_id });

    Ok(ApiResponse::success(
        "Listing removed",
        Listing::from(listing),
        Some(Meta::empty()),
    ))
}

pub async fn restore_listing(
    state: &AppState,
    admin: &AuthUser,
    listing_id: Uuid,
) -> AppResult<ApiResponse<Listing>> {
    ensure_admin(admin)?;

    let listing = Listings::find_by_id(listing_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if listing.status != ListingStatus::Removed {
        return Err(AppError::BadRequest("Listing is not removed".into()));
    }

    let seller_id = listing.seller_id;
    let version = listing.version;
    let mut active: ListingActive = listing.into();
    active.status = Set(ListingStatus::Active);
    active.removed_reason = Set(None);
    active.version = Set(version + 1);
    active.updated_at = Set(Utc::now().into());
    let listing = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "listing_restore",
        Some("listings"),
        Some(serde_json::json!({ "listing_id": listing_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) = push_notification(
        state,
        seller_id,
        "listing_update",
        "One of your listings was restored.",
    )
    .await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    state
        .events
        .publish(StoreEvent::ListingChanged { listing_id });

    Ok(ApiResponse::success(
        "Listing restored",
        Listing::from(listing),
        Some(Meta::empty()),
    ))
}

/// Park an active listing out of the feed pending review.
pub async fn hold_listing(
    state: &AppState,
    admin: &AuthUser,
    listing_id: Uuid,
) -> AppResult<ApiResponse<Listing>> {
    ensure_admin(admin)?;

    let listing = Listings::find_by_id(listing_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if listing.status != ListingStatus::Active {
        return Err(AppError::BadRequest("Listing is not active".into()));
    }

    let version = listing.version;
    let mut active: ListingActive = listing.into();
    active.status = Set(ListingStatus::Pending);
    active.version = Set(version + 1);
    active.updated_at = Set(Utc::now().into());
    let listing = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "listing_hold",
        Some("listings"),
        Some(serde_json::json!({ "listing_id": listing_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    state
        .events
        .publish(StoreEvent::ListingChanged { listing_id });

    Ok(ApiResponse::success(
        "Listing held",
        Listing::from(listing),
        Some(Meta::empty()),
    ))
}

pub async fn list_disputes(
    state: &AppState,
    admin: &AuthUser,
    query: DisputeListQuery,
) -> AppResult<ApiResponse<DisputeList>> {
    ensure_admin(admin)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(DisputeCol::Status.eq(status));
    }
    if let Some(priority) = query.priority {
        condition = condition.add(DisputeCol::Priority.eq(priority));
    }

    let finder = Disputes::find()
        .filter(condition)
        .order_by_desc(DisputeCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Dispute::from)
        .collect();

    Ok(ApiResponse::success(
        "Disputes",
        DisputeList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn start_investigation(
    state: &AppState,
    admin: &AuthUser,
    dispute_id: Uuid,
) -> AppResult<ApiResponse<Dispute>> {
    ensure_admin(admin)?;

    let dispute = Disputes::find_by_id(dispute_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if dispute.status != DisputeStatus::Pending {
        return Err(AppError::BadRequest("Dispute is not pending".into()));
    }

    let mut active: DisputeActive = dispute.into();
    active.status = Set(DisputeStatus::Investigating);
    let dispute = active.update(&state.orm).await?;

    state
        .events
        .publish(StoreEvent::DisputeChanged { dispute_id });

    Ok(ApiResponse::success(
        "Dispute updated",
        Dispute::from(dispute),
        Some(Meta::empty()),
    ))
}

pub async fn resolve_dispute(
    state: &AppState,
    admin: &AuthUser,
    dispute_id: Uuid,
    payload: ResolveDisputeRequest,
) -> AppResult<ApiResponse<Dispute>> {
    ensure_admin(admin)?;
    if payload.resolution.trim().is_empty() {
        return Err(AppError::BadRequest("resolution text is required".into()));
    }

    let dispute = Disputes::find_by_id(dispute_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !matches!(
        dispute.status,
        DisputeStatus::Pending | DisputeStatus::Investigating
    ) {
        return Err(AppError::BadRequest("Dispute already resolved".into()));
    }

    let opener = dispute.user_id;
    let mut active: DisputeActive = dispute.into();
    active.status = Set(DisputeStatus::Resolved);
    active.resolution = Set(Some(payload.resolution));
    active.resolved_at = Set(Some(Utc::now().into()));
    let dispute = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "dispute_resolve",
        Some("disputes"),
        Some(serde_json::json!({ "dispute_id": dispute_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) =
        push_notification(state, opener, "dispute_update", "Your dispute was resolved.").await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    state
        .events
        .publish(StoreEvent::DisputeChanged { dispute_id });

    Ok(ApiResponse::success(
        "Dispute resolved",
        Dispute::from(dispute),
        Some(Meta::empty()),
    ))
}

pub async fn close_dispute(
    state: &AppState,
    admin: &AuthUser,
    dispute_id: Uuid,
) -> AppResult<ApiResponse<Dispute>> {
    ensure_admin(admin)?;

    let dispute = Disputes::find_by_id(dispute_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if dispute.status == DisputeStatus::Closed {
        return Err(AppError::BadRequest("Dispute already closed".into()));
    }

    let opener = dispute.user_id;
    let mut active: DisputeActive = dispute.into();
    active.status = Set(DisputeStatus::Closed);
    let dispute = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "dispute_close",
        Some("disputes"),
        Some(serde_json::json!({ "dispute_id": dispute_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) =
        push_notification(state, opener, "dispute_update", "Your dispute was closed.").await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    state
        .events
        .publish(StoreEvent::DisputeChanged { dispute_id });

    Ok(ApiResponse::success(
        "Dispute closed",
        Dispute::from(dispute),
        Some(Meta::empty()),
    ))
}

/// Manual balance adjustment: goodwill credits, restored funds, cashback.
pub async fn credit_wallet(
    state: &AppState,
    admin: &AuthUser,
    payload: CreditWalletRequest,
) -> AppResult<ApiResponse<Wallet>> {
    ensure_admin(admin)?;

    if payload.amount <= 0 {
        return Err(AppError::BadRequest("amount must be greater than 0".into()));
    }
    if !matches!(
        payload.kind,
        TransactionKind::AdminCredit | TransactionKind::AdminRestore | TransactionKind::Cashback
    ) {
        return Err(AppError::BadRequest(
            "kind must be an admin credit kind".into(),
        ));
    }

    Users::find_by_id(payload.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let txn = state.orm.begin().await?;
    let wallet = ensure_wallet(&txn, payload.user_id).await?;
    let now = Utc::now();

    // Restored funds go back where they came from: the withdrawable pot.
    let (withdrawable, usable) = match payload.kind {
        TransactionKind::AdminRestore => (wallet.withdrawable + payload.amount, wallet.usable),
        _ => (wallet.withdrawable, wallet.usable + payload.amount),
    };
    let mut active: WalletActive = wallet.into();
    active.withdrawable = Set(withdrawable);
    active.usable = Set(usable);
    active.updated_at = Set(now.into());
    let wallet = active.update(&txn).await?;

    TransactionActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(payload.user_id),
        kind: Set(payload.kind),
        amount: Set(payload.amount),
        status: Set(TransactionStatus::Completed),
        reference: Set(None),
        note: Set(payload.note.clone()),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "wallet_credit",
        Some("wallets"),
        Some(serde_json::json!({
            "user_id": payload.user_id,
            "amount": payload.amount,
            "kind": payload.kind,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) = push_notification(
        state,
        payload.user_id,
        "wallet_update",
        format!("Your wallet was credited {}.", payload.amount),
    )
    .await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    state.events.publish(StoreEvent::WalletChanged {
        user_id: payload.user_id,
    });

    Ok(ApiResponse::success(
        "Wallet credited",
        Wallet::from(wallet),
        Some(Meta::empty()),
    ))
}

pub async fn list_withdrawals(
    state: &AppState,
    admin: &AuthUser,
    query: WithdrawalListQuery,
) -> AppResult<ApiResponse<WithdrawalList>> {
    ensure_admin(admin)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(WithdrawalCol::Status.eq(status));
    }

    let finder = WithdrawalRequests::find()
        .filter(condition)
        .order_by_desc(WithdrawalCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(WithdrawalRequest::from)
        .collect();

    Ok(ApiResponse::success(
        "Withdrawal requests",
        WithdrawalList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn approve_withdrawal(
    state: &AppState,
    admin: &AuthUser,
    request_id: Uuid,
) -> AppResult<ApiResponse<WithdrawalRequest>> {
    ensure_admin(admin)?;

    let txn = state.orm.begin().await?;
    let request = WithdrawalRequests::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if request.status != WithdrawalStatus::Pending {
        return Err(AppError::BadRequest("Request already decided".into()));
    }

    let user_id = request.user_id;
    let now = Utc::now();
    let mut active: WithdrawalActive = request.into();
    active.status = Set(WithdrawalStatus::Approved);
    active.decided_at = Set(Some(now.into()));
    let request = active.update(&txn).await?;

    // Settle the paired ledger entry; it shares the request id.
    if let Some(entry) = WalletTransactions::find_by_id(request_id).one(&txn).await? {
        let mut entry_active: TransactionActive = entry.into();
        entry_active.status = Set(TransactionStatus::Completed);
        entry_active.update(&txn).await?;
    }
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "withdrawal_approve",
        Some("withdrawal_requests"),
        Some(serde_json::json!({ "request_id": request_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) = push_notification(
        state,
        user_id,
        "wallet_update",
        "Your withdrawal was approved and paid out.",
    )
    .await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    state
        .events
        .publish(StoreEvent::WithdrawalChanged { request_id });

    Ok(ApiResponse::success(
        "Withdrawal approved",
        WithdrawalRequest::from(request),
        Some(Meta::empty()),
    ))
}

pub async fn reject_withdrawal(
    state: &AppState,
    admin: &AuthUser,
    request_id: Uuid,
) -> AppResult<ApiResponse<WithdrawalRequest>> {
    ensure_admin(admin)?;

    let txn = state.orm.begin().await?;
    let request = WithdrawalRequests::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if request.status != WithdrawalStatus::Pending {
        return Err(AppError::BadRequest("Request already decided".into()));
    }

    let user_id = request.user_id;
    let amount = request.amount;
    let now = Utc::now();

    let mut active: WithdrawalActive = request.into();
    active.status = Set(WithdrawalStatus::Rejected);
    active.decided_at = Set(Some(now.into()));
    let request = active.update(&txn).await?;

    // Put the debited amount back and reverse the ledger entry.
    let wallet = ensure_wallet(&txn, user_id).await?;
    let withdrawable = wallet.withdrawable + amount;
    let mut wallet_active: WalletActive = wallet.into();
    wallet_active.withdrawable = Set(withdrawable);
    wallet_active.updated_at = Set(now.into());
    wallet_active.update(&txn).await?;

    if let Some(entry) = WalletTransactions::find_by_id(request_id).one(&txn).await? {
        let mut entry_active: TransactionActive = entry.into();
        entry_active.status = Set(TransactionStatus::Reversed);
        entry_active.update(&txn).await?;
    }
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "withdrawal_reject",
        Some("withdrawal_requests"),
        Some(serde_json::json!({ "request_id": request_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) = push_notification(
        state,
        user_id,
        "wallet_update",
        "Your withdrawal was rejected; the amount is back in your wallet.",
    )
    .await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    state
        .events
        .publish(StoreEvent::WithdrawalChanged { request_id });
    state
        .events
        .publish(StoreEvent::WalletChanged { user_id });

    Ok(ApiResponse::success(
        "Withdrawal rejected",
        WithdrawalRequest::from(request),
        Some(Meta::empty()),
    ))
}

/// Flip the marketplace-wide shutdown switch.
pub async fn set_shutdown(
    state: &AppState,
    admin: &AuthUser,
    payload: SetShutdownRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(admin)?;

    let now = Utc::now();
    match PlatformSettings::find_by_id(1).one(&state.orm).await? {
        Some(settings) => {
            let mut active: SettingsActive = settings.into();
            active.is_shutdown = Set(payload.enabled);
            active.message = Set(payload.message.clone());
            active.updated_at = Set(now.into());
            active.update(&state.orm).await?;
        }
        None => {
            SettingsActive {
                id: Set(1),
                is_shutdown: Set(payload.enabled),
                message: Set(payload.message.clone()),
                updated_at: Set(now.into()),
            }
            .insert(&state.orm)
            .await?;
        }
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "shutdown_update",
        Some("platform_settings"),
        Some(serde_json::json!({ "enabled": payload.enabled })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    state.events.publish(StoreEvent::SettingsChanged);

    Ok(ApiResponse::success(
        "Settings updated",
        serde_json::json!({ "enabled": payload.enabled }),
        Some(Meta::empty()),
    ))
}

/// Serialize a whole collection to a pretty-printed JSON file, the same
/// artifact the console's export buttons produce.
pub async fn export_collection(
    state: &AppState,
    admin: &AuthUser,
    collection: ExportCollection,
    export_dir: &str,
) -> AppResult<ApiResponse<ExportFile>> {
    ensure_admin(admin)?;

    let (records, bytes) = match collection {
        ExportCollection::Users => {
            let items: Vec<User> = Users::find()
                .order_by_asc(UserCol::CreatedAt)
                .all(&state.orm)
                .await?
                .into_iter()
                .map(User::from)
                .collect();
            (items.len(), serde_json::to_vec_pretty(&items).map_err(anyhow::Error::from)?)
        }
        ExportCollection::Listings => {
            let items: Vec<Listing> = Listings::find()
                .order_by_asc(ListingCol::CreatedAt)
                .all(&state.orm)
                .await?
                .into_iter()
                .map(Listing::from)
                .collect();
            (items.len(), serde_json::to_vec_pretty(&items).map_err(anyhow::Error::from)?)
        }
        ExportCollection::Offers => {
            let items: Vec<Offer> = Offers::find()
                .order_by_asc(OfferCol::CreatedAt)
                .all(&state.orm)
                .await?
                .into_iter()
                .map(Offer::from)
                .collect();
            (items.len(), serde_json::to_vec_pretty(&items).map_err(anyhow::Error::from)?)
        }
        ExportCollection::Orders => {
            let items: Vec<Order> = Orders::find()
                .order_by_asc(OrderCol::CreatedAt)
                .all(&state.orm)
                .await?
                .into_iter()
                .map(Order::from)
                .collect();
            (items.len(), serde_json::to_vec_pretty(&items).map_err(anyhow::Error::from)?)
        }
        ExportCollection::Disputes => {
            let items: Vec<Dispute> = Disputes::find()
                .order_by_asc(DisputeCol::CreatedAt)
                .all(&state.orm)
                .await?
                .into_iter()
                .map(Dispute::from)
                .collect();
            (items.len(), serde_json::to_vec_pretty(&items).map_err(anyhow::Error::from)?)
        }
        ExportCollection::Wallets => {
            let items: Vec<Wallet> = Wallets::find()
                .order_by_asc(WalletCol::UserId)
                .all(&state.orm)
                .await?
                .into_iter()
                .map(Wallet::from)
                .collect();
            (items.len(), serde_json::to_vec_pretty(&items).map_err(anyhow::Error::from)?)
        }
        ExportCollection::WalletTransactions => {
            let items: Vec<WalletTransaction> = WalletTransactions::find()
                .order_by_asc(TransactionCol::CreatedAt)
                .all(&state.orm)
                .await?
                .into_iter()
                .map(WalletTransaction::from)
                .collect();
            (items.len(), serde_json::to_vec_pretty(&items).map_err(anyhow::Error::from)?)
        }
        ExportCollection::WithdrawalRequests => {
            let items: Vec<WithdrawalRequest> = WithdrawalRequests::find()
                .order_by_asc(WithdrawalCol::CreatedAt)
                .all(&state.orm)
                .await?
                .into_iter()
                .map(WithdrawalRequest::from)
                .collect();
            (items.len(), serde_json::to_vec_pretty(&items).map_err(anyhow::Error::from)?)
        }
        ExportCollection::AuditLogs => {
            let items: Vec<AuditLog> = AuditLogs::find()
                .order_by_asc(AuditCol::CreatedAt)
                .all(&state.orm)
                .await?
                .into_iter()
                .map(AuditLog::from)
                .collect();
            (items.len(), serde_json::to_vec_pretty(&items).map_err(anyhow::Error::from)?)
        }
    };

    tokio::fs::create_dir_all(export_dir)
        .await
        .map_err(anyhow::Error::from)?;
    let path = Path::new(export_dir).join(format!("{}.json", collection.file_stem()));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(anyhow::Error::from)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(admin.user_id),
        "export",
        Some(collection.file_stem()),
        Some(serde_json::json!({ "records": records })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Export written",
        ExportFile {
            path: path.display().to_string(),
            records,
        },
        Some(Meta::empty()),
    ))
}
