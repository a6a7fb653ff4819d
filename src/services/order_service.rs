use chrono::{Duration, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CancelOrderRequest, CheckoutRequest, OrderList, OrderTotals, UpdateOrderStatusRequest,
    },
    entity::{
        enums::{
            DeliveryMethod, ListingStatus, OfferStatus, OrderStatus, PaymentMethod,
            TransactionKind, TransactionStatus,
        },
        listings::{Column as ListingCol, Entity as Listings},
        offers::{Column as OfferCol, Entity as Offers},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        users::Entity as Users,
        wallet_transactions::{
            ActiveModel as TransactionActive, Column as TransactionCol, Entity as WalletTransactions,
        },
        wallets::ActiveModel as WalletActive,
    },
    error::{AppError, AppResult},
    events::StoreEvent,
    models::Order,
    notify::push_notification,
    params::{OrderListQuery, SortOrder},
    response::{ApiResponse, Meta},
    services::{auth_service::require_active_member, wallet_service::ensure_wallet},
    state::AppState,
};

/// Flat fee for GradKart-managed delivery; pickup is free.
const GRADKART_DELIVERY_FEE: i64 = 99;
/// Buyers can cancel this long after placing an order.
const CANCEL_WINDOW_HOURS: i64 = 24;

/// 2% platform fee, rounded half-up to the nearest rupee.
fn platform_fee(item_price: i64) -> i64 {
    (item_price * 2 + 50) / 100
}

/// Public so the presentation layer can show the breakdown before checkout.
pub fn compute_totals(item_price: i64, delivery_method: DeliveryMethod) -> OrderTotals {
    let delivery_fee = match delivery_method {
        DeliveryMethod::Gradkart => GRADKART_DELIVERY_FEE,
        DeliveryMethod::Pickup => 0,
    };
    let platform_fee = platform_fee(item_price);
    OrderTotals {
        item_price,
        delivery_fee,
        platform_fee,
        total_amount: item_price + delivery_fee + platform_fee,
    }
}

pub async fn checkout(
    state: &AppState,
    buyer_id: Uuid,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<Order>> {
    require_active_member(&state.orm, buyer_id).await?;

    let txn = state.orm.begin().await?;

    let listing = Listings::find_by_id(payload.listing_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if listing.status != ListingStatus::Active {
        return Err(AppError::Conflict("Listing is no longer available".into()));
    }
    if listing.seller_id == buyer_id {
        return Err(AppError::BadRequest("You cannot buy your own listing".into()));
    }

    // An accepted offer buys at the negotiated price instead of list price.
    let item_price = match payload.offer_id {
        Some(offer_id) => {
            let offer = Offers::find_by_id(offer_id)
                .one(&txn)
                .await?
                .ok_or(AppError::NotFound)?;
            if offer.listing_id != listing.id
                || offer.buyer_id != buyer_id
                || offer.status != OfferStatus::Accepted
            {
                return Err(AppError::BadRequest(
                    "No accepted offer for this listing".into(),
                ));
            }
            offer.amount
        }
        None => listing.price,
    };

    let totals = compute_totals(item_price, payload.delivery_method);
    let order_id = Uuid::new_v4();
    let now = Utc::now();

    if payload.payment_method == PaymentMethod::Wallet {
        let wallet = ensure_wallet(&txn, buyer_id).await?;
        if wallet.usable < totals.total_amount {
            return Err(AppError::BadRequest("Insufficient wallet balance".into()));
        }
        let usable = wallet.usable - totals.total_amount;
        let mut active: WalletActive = wallet.into();
        active.usable = Set(usable);
        active.updated_at = Set(now.into());
        active.update(&txn).await?;

        TransactionActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(buyer_id),
            kind: Set(TransactionKind::Purchase),
            amount: Set(totals.total_amount),
            status: Set(TransactionStatus::Completed),
            reference: Set(Some(order_id)),
            note: Set(Some(listing.title.clone())),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
    }

    let order = OrderActive {
        id: Set(order_id),
        listing_id: Set(listing.id),
        buyer_id: Set(buyer_id),
        seller_id: Set(listing.seller_id),
        item_price: Set(totals.item_price),
        delivery_fee: Set(totals.delivery_fee),
        platform_fee: Set(totals.platform_fee),
        total_amount: Set(totals.total_amount),
        delivery_method: Set(payload.delivery_method),
        payment_method: Set(payload.payment_method),
        delivery_address: Set(payload.delivery_address),
        offer_id: Set(payload.offer_id),
        status: Set(OrderStatus::Confirmed),
        cancel_reason: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    // The one write that must not race: the same listing read above must
    // still be the active, unsold one. Losing the version check rolls the
    // whole checkout back, order row included.
    let result = Listings::update_many()
        .col_expr(ListingCol::Status, Expr::value(ListingStatus::Sold))
        .col_expr(ListingCol::SoldTo, Expr::value(Some(buyer_id)))
        .col_expr(ListingCol::SoldAt, Expr::value(Some(now)))
        .col_expr(ListingCol::UpdatedAt, Expr::value(now))
        .col_expr(ListingCol::Version, Expr::col(ListingCol::Version).add(1))
        .filter(ListingCol::Id.eq(listing.id))
        .filter(ListingCol::Version.eq(listing.version))
        .filter(ListingCol::Status.eq(ListingStatus::Active))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict("Listing was sold concurrently".into()));
    }

    // Offers still pending on a sold listing are dead; close them out.
    Offers::update_many()
        .col_expr(OfferCol::Status, Expr::value(OfferStatus::Rejected))
        .col_expr(OfferCol::UpdatedAt, Expr::value(now))
        .filter(
            Condition::all()
                .add(OfferCol::ListingId.eq(listing.id))
                .add(OfferCol::Status.eq(OfferStatus::Pending)),
        )
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(buyer_id),
        "order_checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total": order.total_amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) = push_notification(
        state,
        listing.seller_id,
        "order_placed",
        format!("\"{}\" was purchased", listing.title),
    )
    .await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    state.events.publish(StoreEvent::OrderChanged { order_id });
    state.events.publish(StoreEvent::ListingChanged {
        listing_id: listing.id,
    });
    if payload.payment_method == PaymentMethod::Wallet {
        state
            .events
            .publish(StoreEvent::WalletChanged { user_id: buyer_id });
    }

    Ok(ApiResponse::success(
        "Order placed",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    buyer_id: Uuid,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    list_by_column(state, OrderCol::BuyerId, buyer_id, query).await
}

pub async fn list_sales(
    state: &AppState,
    seller_id: Uuid,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    list_by_column(state, OrderCol::SellerId, seller_id, query).await
}

async fn list_by_column(
    state: &AppState,
    column: OrderCol,
    user_id: Uuid,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(column.eq(user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    requester_id: Uuid,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.buyer_id != requester_id && order.seller_id != requester_id {
        let requester = Users::find_by_id(requester_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::Forbidden)?;
        if requester.role != "admin" {
            return Err(AppError::Forbidden);
        }
    }

    Ok(ApiResponse::success(
        "Order",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

/// Buyer cancellation, only inside the 24-hour window and before shipping.
pub async fn cancel_order(
    state: &AppState,
    buyer_id: Uuid,
    order_id: Uuid,
    payload: CancelOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.buyer_id != buyer_id {
        return Err(AppError::Forbidden);
    }
    if !matches!(order.status, OrderStatus::Pending | OrderStatus::Confirmed) {
        return Err(AppError::BadRequest(
            "Order can no longer be cancelled".into(),
        ));
    }
    let age = Utc::now() - order.created_at.with_timezone(&Utc);
    if age >= Duration::hours(CANCEL_WINDOW_HOURS) {
        return Err(AppError::BadRequest(
            "Cancellation window has closed".into(),
        ));
    }

    let now = Utc::now();
    let mut active: OrderActive = order.clone().into();
    active.status = Set(OrderStatus::Cancelled);
    active.cancel_reason = Set(Some(payload.reason));
    active.updated_at = Set(now.into());
    let updated = active.update(&txn).await?;

    compensate_cancellation(&txn, &order).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(buyer_id),
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) = push_notification(
        state,
        order.seller_id,
        "order_update",
        "An order was cancelled by the buyer.",
    )
    .await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    publish_cancellation(state, &order);

    Ok(ApiResponse::success(
        "Order cancelled",
        Order::from(updated),
        Some(Meta::empty()),
    ))
}

/// Move an order along confirmed -> shipped -> delivered -> completed.
/// The seller drives fulfilment, the buyer confirms receipt, and an admin
/// can force any step (including a cancellation with compensation).
pub async fn update_order_status(
    state: &AppState,
    actor_id: Uuid,
    order_id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let actor = Users::find_by_id(actor_id)
        .one(&txn)
        .await?
        .ok_or(AppError::Forbidden)?;

    let is_admin = actor.role == "admin";
    let is_buyer = order.buyer_id == actor_id;
    let is_seller = order.seller_id == actor_id;
    if !is_admin && !is_buyer && !is_seller {
        return Err(AppError::Forbidden);
    }

    let to = payload.status;
    let from = order.status;
    let allowed = match (from, to) {
        (OrderStatus::Pending, OrderStatus::Confirmed) => is_seller || is_admin,
        (OrderStatus::Confirmed, OrderStatus::Shipped) => is_seller || is_admin,
        (OrderStatus::Shipped, OrderStatus::Delivered) => is_seller || is_admin,
        (OrderStatus::Delivered, OrderStatus::Completed) => is_buyer || is_admin,
        (_, OrderStatus::Cancelled) => {
            is_admin && !matches!(from, OrderStatus::Completed | OrderStatus::Cancelled)
        }
        _ => false,
    };
    if !allowed {
        return Err(AppError::BadRequest(format!(
            "Invalid status transition {from:?} -> {to:?}"
        )));
    }

    let now = Utc::now();
    let mut active: OrderActive = order.clone().into();
    active.status = Set(to);
    if to == OrderStatus::Cancelled {
        active.cancel_reason = Set(Some("Cancelled by admin".into()));
    }
    active.updated_at = Set(now.into());
    let updated = active.update(&txn).await?;

    let mut seller_credited = false;
    match to {
        // Completion releases the proceeds to the seller. The buyer already
        // paid the platform fee on top, so the seller gets the full item price.
        OrderStatus::Completed => {
            let wallet = ensure_wallet(&txn, order.seller_id).await?;
            let withdrawable = wallet.withdrawable + order.item_price;
            let mut wallet_active: WalletActive = wallet.into();
            wallet_active.withdrawable = Set(withdrawable);
            wallet_active.updated_at = Set(now.into());
            wallet_active.update(&txn).await?;

            TransactionActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(order.seller_id),
                kind: Set(TransactionKind::SaleCredit),
                amount: Set(order.item_price),
                status: Set(TransactionStatus::Completed),
                reference: Set(Some(order.id)),
                note: Set(None),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            seller_credited = true;
        }
        OrderStatus::Cancelled => {
            compensate_cancellation(&txn, &order).await?;
        }
        _ => {}
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(actor_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id, "status": to })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let (notify_target, note) = match to {
        OrderStatus::Completed => (order.seller_id, "Order completed; sale proceeds credited."),
        OrderStatus::Cancelled => (order.buyer_id, "Your order was cancelled."),
        _ => (order.buyer_id, "Your order status was updated."),
    };
    if let Err(err) = push_notification(state, notify_target, "order_update", note).await {
        tracing::warn!(error = %err, "notification failed");
    }

    state.events.publish(StoreEvent::OrderChanged { order_id });
    if seller_credited {
        state.events.publish(StoreEvent::WalletChanged {
            user_id: order.seller_id,
        });
    }
    if to == OrderStatus::Cancelled {
        publish_cancellation(state, &order);
    }

    Ok(ApiResponse::success(
        "Order updated",
        Order::from(updated),
        Some(Meta::empty()),
    ))
}

/// Undo what checkout did: put the listing back on the market and reverse a
/// wallet payment. Runs inside the caller's transaction.
async fn compensate_cancellation<C: ConnectionTrait>(conn: &C, order: &OrderModel) -> AppResult<()> {
    let now = Utc::now();

    // Only flip the listing back if this order is what sold it; an admin
    // removal in between is left alone.
    Listings::update_many()
        .col_expr(ListingCol::Status, Expr::value(ListingStatus::Active))
        .col_expr(ListingCol::SoldTo, Expr::value(None::<Uuid>))
        .col_expr(ListingCol::SoldAt, Expr::value(None::<chrono::DateTime<Utc>>))
        .col_expr(ListingCol::UpdatedAt, Expr::value(now))
        .col_expr(ListingCol::Version, Expr::col(ListingCol::Version).add(1))
        .filter(ListingCol::Id.eq(order.listing_id))
        .filter(ListingCol::Status.eq(ListingStatus::Sold))
        .filter(ListingCol::SoldTo.eq(order.buyer_id))
        .exec(conn)
        .await?;

    if order.payment_method == PaymentMethod::Wallet {
        let wallet = ensure_wallet(conn, order.buyer_id).await?;
        let usable = wallet.usable + order.total_amount;
        let mut active: WalletActive = wallet.into();
        active.usable = Set(usable);
        active.updated_at = Set(now.into());
        active.update(conn).await?;

        WalletTransactions::update_many()
            .col_expr(
                TransactionCol::Status,
                Expr::value(TransactionStatus::Reversed),
            )
            .filter(
                Condition::all()
                    .add(TransactionCol::Reference.eq(order.id))
                    .add(TransactionCol::Kind.eq(TransactionKind::Purchase)),
            )
            .exec(conn)
            .await?;
    }

    Ok(())
}

fn publish_cancellation(state: &AppState, order: &OrderModel) {
    state.events.publish(StoreEvent::ListingChanged {
        listing_id: order.listing_id,
    });
    if order.payment_method == PaymentMethod::Wallet {
        state.events.publish(StoreEvent::WalletChanged {
            user_id: order.buyer_id,
        });
    }
}
