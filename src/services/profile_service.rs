use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::profile::{AddAddressRequest, AddressList, NotificationList, SetLocationRequest},
    entity::{
        addresses::{ActiveModel as AddressActive, Column as AddressCol, Entity as Addresses},
        notifications::{
            ActiveModel as NotificationActive, Column as NotificationCol, Entity as Notifications,
        },
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::{AppError, AppResult},
    events::StoreEvent,
    models::{Address, Notification, User},
    params::Pagination,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn set_location(
    state: &AppState,
    user_id: Uuid,
    payload: SetLocationRequest,
) -> AppResult<ApiResponse<User>> {
    if payload.location.trim().is_empty() {
        return Err(AppError::BadRequest("location must not be empty".into()));
    }

    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = user.into();
    active.location = Set(Some(payload.location.trim().to_string()));
    active.location_skipped = Set(false);
    let user = active.update(&state.orm).await?;

    state.events.publish(StoreEvent::UserChanged { user_id });

    Ok(ApiResponse::success(
        "Location saved",
        User::from(user),
        Some(Meta::empty()),
    ))
}

pub async fn skip_location(state: &AppState, user_id: Uuid) -> AppResult<ApiResponse<User>> {
    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = user.into();
    active.location_skipped = Set(true);
    let user = active.update(&state.orm).await?;

    state.events.publish(StoreEvent::UserChanged { user_id });

    Ok(ApiResponse::success(
        "Location skipped",
        User::from(user),
        Some(Meta::empty()),
    ))
}

pub async fn add_address(
    state: &AppState,
    user_id: Uuid,
    payload: AddAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    if payload.detail.trim().is_empty() {
        return Err(AppError::BadRequest("address detail is required".into()));
    }

    let txn = state.orm.begin().await?;
    if payload.is_default {
        clear_default(&txn, user_id).await?;
    }
    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        label: Set(payload.label),
        detail: Set(payload.detail.trim().to_string()),
        is_default: Set(payload.is_default),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Address added",
        Address::from(address),
        Some(Meta::empty()),
    ))
}

pub async fn list_addresses(
    state: &AppState,
    user_id: Uuid,
) -> AppResult<ApiResponse<AddressList>> {
    let items = Addresses::find()
        .filter(AddressCol::UserId.eq(user_id))
        .order_by_desc(AddressCol::IsDefault)
        .order_by_asc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Address::from)
        .collect();

    Ok(ApiResponse::success(
        "Addresses",
        AddressList { items },
        Some(Meta::empty()),
    ))
}

pub async fn set_default_address(
    state: &AppState,
    user_id: Uuid,
    address_id: Uuid,
) -> AppResult<ApiResponse<Address>> {
    let txn = state.orm.begin().await?;

    let address = Addresses::find_by_id(address_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if address.user_id != user_id {
        return Err(AppError::Forbidden);
    }

    clear_default(&txn, user_id).await?;
    let mut active: AddressActive = address.into();
    active.is_default = Set(true);
    let address = active.update(&txn).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Default address set",
        Address::from(address),
        Some(Meta::empty()),
    ))
}

pub async fn list_notifications(
    state: &AppState,
    user_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Notifications::find()
        .filter(NotificationCol::UserId.eq(user_id))
        .order_by_desc(NotificationCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn mark_notification_read(
    state: &AppState,
    user_id: Uuid,
    notification_id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let notification = Notifications::find_by_id(notification_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if notification.user_id != user_id {
        return Err(AppError::Forbidden);
    }

    let mut active: NotificationActive = notification.into();
    active.read = Set(true);
    let notification = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "OK",
        Notification::from(notification),
        Some(Meta::empty()),
    ))
}

async fn clear_default<C: sea_orm::ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<()> {
    Addresses::update_many()
        .col_expr(AddressCol::IsDefault, Expr::value(false))
        .filter(
            Condition::all()
                .add(AddressCol::UserId.eq(user_id))
                .add(AddressCol::IsDefault.eq(true)),
        )
        .exec(conn)
        .await?;
    Ok(())
}
