use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::offers::{MakeOfferRequest, OfferDecision, OfferList},
    entity::{
        enums::{ListingStatus, OfferStatus},
        listings::Entity as Listings,
        offers::{ActiveModel as OfferActive, Column as OfferCol, Entity as Offers},
    },
    error::{AppError, AppResult},
    events::StoreEvent,
    models::Offer,
    notify::push_notification,
    params::Pagination,
    response::{ApiResponse, Meta},
    services::auth_service::require_active_member,
    state::AppState,
};

/// A buyer can park at most this many offers on one listing, counting
/// resolved ones; the original derived the same cap from the embedded array.
const MAX_OFFERS_PER_LISTING: u64 = 3;

/// Offers below 90% of the asking price are not stored.
fn meets_minimum(amount: i64, price: i64) -> bool {
    amount * 10 >= price * 9
}

pub async fn make_offer(
    state: &AppState,
    buyer_id: Uuid,
    payload: MakeOfferRequest,
) -> AppResult<ApiResponse<Offer>> {
    require_active_member(&state.orm, buyer_id).await?;

    let MakeOfferRequest {
        listing_id,
        amount,
        comment,
    } = payload;
    if amount <= 0 {
        return Err(AppError::BadRequest("amount must be greater than 0".into()));
    }

    let txn = state.orm.begin().await?;

    let listing = Listings::find_by_id(listing_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if listing.status != ListingStatus::Active {
        return Err(AppError::BadRequest("Listing is not open to offers".into()));
    }
    if listing.seller_id == buyer_id {
        return Err(AppError::BadRequest(
            "You cannot make an offer on your own listing".into(),
        ));
    }
    if !meets_minimum(amount, listing.price) {
        return Err(AppError::BadRequest(
            "Offer must be at least 90% of the listing price".into(),
        ));
    }

    let held = Offers::find()
        .filter(
            Condition::all()
                .add(OfferCol::ListingId.eq(listing_id))
                .add(OfferCol::BuyerId.eq(buyer_id)),
        )
        .count(&txn)
        .await?;
    if held >= MAX_OFFERS_PER_LISTING {
        return Err(AppError::BadRequest(
            "Offer limit reached for this listing".into(),
        ));
    }

    let now = Utc::now();
    let offer = OfferActive {
        id: Set(Uuid::new_v4()),
        listing_id: Set(listing_id),
        buyer_id: Set(buyer_id),
        amount: Set(amount),
        comment: Set(comment),
        status: Set(OfferStatus::Pending),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(buyer_id),
        "offer_make",
        Some("offers"),
        Some(serde_json::json!({ "offer_id": offer.id, "listing_id": listing_id, "amount": amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    if let Err(err) = push_notification(
        state,
        listing.seller_id,
        "offer_received",
        format!("New offer of {} on \"{}\"", amount, listing.title),
    )
    .await
    {
        tracing::warn!(error = %err, "notification failed");
    }

    state.events.publish(StoreEvent::OfferChanged {
        listing_id,
        offer_id: offer.id,
    });

    Ok(ApiResponse::success(
        "Offer submitted",
        Offer::from(offer),
        Some(Meta::empty()),
    ))
}

/// Offers on one of the seller's listings, newest first.
pub async fn list_offers(
    state: &AppState,
    seller_id: Uuid,
    listing_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<OfferList>> {
    let listing = Listings::find_by_id(listing_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if listing.seller_id != seller_id {
        return Err(AppError::Forbidden);
    }

    let (page, limit, offset) = pagination.normalize();
    let finder = Offers::find()
        .filter(OfferCol::ListingId.eq(listing_id))
        .order_by_desc(OfferCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Offer::from)
        .collect();

    Ok(ApiResponse::success(
        "Offers",
        OfferList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_my_offers(
    state: &AppState,
    buyer_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<OfferList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Offers::find()
        .filter(OfferCol::BuyerId.eq(buyer_id))
        .order_by_desc(OfferCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Offer::from)
        .collect();

    Ok(ApiResponse::success(
        "Offers",
        OfferList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Seller decision on a pending offer. Acceptance is terminal and clears
/// the other pending offers so a listing never carries two accepted ones.
pub async fn respond_to_offer(
    state: &AppState,
    seller_id: Uuid,
    offer_id: Uuid,
    decision: OfferDecision,
) -> AppResult<ApiResponse<Offer>> {
    let txn = state.orm.begin().await?;

    let offer = Offers::find_by_id(offer_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let listing = Listings::find_by_id(offer.listing_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if listing.seller_id != seller_id {
        return Err(AppError::Forbidden);
    }
    if offer.status != OfferStatus::Pending {
        return Err(AppError::BadRequest("Offer already resolved".into()));
    }

    let now = Utc::now();
    let listing_id = offer.listing_id;
    let buyer_id = offer.buyer_id;

    let mut outbid_buyers: Vec<Uuid> = Vec::new();
    let status = match decision {
        OfferDecision::Accept => {
            let competing = Offers::find()
                .filter(
                    Condition::all()
                        .add(OfferCol::ListingId.eq(listing_id))
                        .add(OfferCol::Status.eq(OfferStatus::Pending))
                        .add(OfferCol::Id.ne(offer_id)),
                )
                .all(&txn)
                .await?;
            outbid_buyers = competing.iter().map(|o| o.buyer_id).collect();

            Offers::update_many()
                .col_expr(OfferCol::Status, Expr::value(OfferStatus::Rejected))
                .col_expr(OfferCol::UpdatedAt, Expr::value(now))
                .filter(
                    Condition::all()
                        .add(OfferCol::ListingId.eq(listing_id))
                        .add(OfferCol::Status.eq(OfferStatus::Pending))
                        .add(OfferCol::Id.ne(offer_id)),
                )
                .exec(&txn)
                .await?;

            OfferStatus::Accepted
        }
        OfferDecision::Reject => OfferStatus::Rejected,
    };

    let mut active: OfferActive = offer.into();
    active.status = Set(status);
    active.updated_at = Set(now.into());
    let offer = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(seller_id),
        "offer_respond",
        Some("offers"),
        Some(serde_json::json!({ "offer_id": offer_id, "status": status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let note = match status {
        OfferStatus::Accepted => "Your offer was accepted. You can now check out.",
        _ => "Your offer was declined.",
    };
    if let Err(err) = push_notification(state, buyer_id, "offer_update", note).await {
        tracing::warn!(error = %err, "notification failed");
    }
    for outbid in outbid_buyers {
        if let Err(err) = push_notification(
            state,
            outbid,
            "offer_update",
            "Another offer was accepted on this listing.",
        )
        .await
        {
            tracing::warn!(error = %err, "notification failed");
        }
    }

    state.events.publish(StoreEvent::OfferChanged {
        listing_id,
        offer_id,
    });

    Ok(ApiResponse::success(
        "Offer updated",
        Offer::from(offer),
        Some(Meta::empty()),
    ))
}
