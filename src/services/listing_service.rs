use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::listings::{AddCommentRequest, CreateListingRequest, LikeState, ListingDetail, ListingList},
    entity::{
        enums::ListingStatus,
        listing_comments::{
            ActiveModel as CommentActive, Column as CommentCol, Entity as ListingComments,
        },
        listing_likes::{ActiveModel as LikeActive, Column as LikeCol, Entity as ListingLikes},
        listings::{Column as ListingCol, Entity as Listings, Model as ListingModel},
    },
    error::{AppError, AppResult},
    events::StoreEvent,
    models::{ImageList, Listing, ListingComment},
    notify::push_notification,
    params::{ListingQuery, ListingSortBy, MyListingQuery, SortOrder},
    response::{ApiResponse, Meta},
    services::auth_service::require_active_member,
    state::AppState,
};

const MAX_IMAGES: usize = 8;

pub async fn create_listing(
    state: &AppState,
    seller_id: Uuid,
    payload: CreateListingRequest,
) -> AppResult<ApiResponse<Listing>> {
    require_active_member(&state.orm, seller_id).await?;

    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    if payload.price <= 0 {
        return Err(AppError::BadRequest("price must be greater than 0".into()));
    }
    if payload.images.len() > MAX_IMAGES {
        return Err(AppError::BadRequest(format!(
            "at most {MAX_IMAGES} images per listing"
        )));
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    let listing = crate::entity::listings::ActiveModel {
        id: Set(id),
        seller_id: Set(seller_id),
        title: Set(payload.title.trim().to_string()),
        category: Set(payload.category),
        price: Set(payload.price),
        condition: Set(payload.condition),
        description: Set(payload.description),
        images: Set(ImageList(payload.images)),
        status: Set(ListingStatus::Active),
        views: Set(0),
        sold_to: Set(None),
        sold_at: Set(None),
        removed_reason: Set(None),
        version: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(seller_id),
        "listing_create",
        Some("listings"),
        Some(serde_json::json!({ "listing_id": listing.id, "price": listing.price })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    state
        .events
        .publish(StoreEvent::ListingChanged { listing_id: id });

    Ok(ApiResponse::success(
        "Listing created",
        Listing::from(listing),
        Some(Meta::empty()),
    ))
}

/// Marketplace browse feed; only active listings are visible here.
pub async fn list_listings(
    state: &AppState,
    query: ListingQuery,
) -> AppResult<ApiResponse<ListingList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all().add(ListingCol::Status.eq(ListingStatus::Active));
    if let Some(q) = query.q.as_ref().filter(|q| !q.is_empty()) {
        condition = condition.add(ListingCol::Title.contains(q.as_str()));
    }
    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(ListingCol::Category.eq(category.clone()));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(ListingCol::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(ListingCol::Price.lte(max_price));
    }

    let mut finder = Listings::find().filter(condition);

    let sort_by = query.sort_by.unwrap_or(ListingSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let column = match sort_by {
        ListingSortBy::CreatedAt => ListingCol::CreatedAt,
        ListingSortBy::Price => ListingCol::Price,
        ListingSortBy::Views => ListingCol::Views,
    };
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(column),
        SortOrder::Desc => finder.order_by_desc(column),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Listing::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Listings", ListingList { items }, Some(meta)))
}

pub async fn list_my_listings(
    state: &AppState,
    seller_id: Uuid,
    query: MyListingQuery,
) -> AppResult<ApiResponse<ListingList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all().add(ListingCol::SellerId.eq(seller_id));
    if let Some(status) = query.status {
        condition = condition.add(ListingCol::Status.eq(status));
    }

    let finder = Listings::find()
        .filter(condition)
        .order_by_desc(ListingCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Listing::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Listings", ListingList { items }, Some(meta)))
}

pub async fn get_listing(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ListingDetail>> {
    let listing = Listings::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let likes = ListingLikes::find()
        .filter(LikeCol::ListingId.eq(id))
        .count(&state.orm)
        .await? as i64;

    let comments = ListingComments::find()
        .filter(CommentCol::ListingId.eq(id))
        .order_by_asc(CommentCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ListingComment::from)
        .collect();

    Ok(ApiResponse::success(
        "Listing",
        ListingDetail {
            listing: Listing::from(listing),
            likes,
            comments,
        },
        Some(Meta::empty()),
    ))
}

/// Bump the view counter in place; no full read-modify-write cycle.
pub async fn record_view(state: &AppState, id: Uuid) -> AppResult<()> {
    let result = Listings::update_many()
        .col_expr(ListingCol::Views, Expr::col(ListingCol::Views).add(1))
        .filter(ListingCol::Id.eq(id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn toggle_like(
    state: &AppState,
    user_id: Uuid,
    listing_id: Uuid,
) -> AppResult<ApiResponse<LikeState>> {
    require_active_member(&state.orm, user_id).await?;
    Listings::find_by_id(listing_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let existing = ListingLikes::find()
        .filter(
            Condition::all()
                .add(LikeCol::ListingId.eq(listing_id))
                .add(LikeCol::UserId.eq(user_id)),
        )
        .one(&state.orm)
        .await?;

    let liked = match existing {
        Some(like) => {
            ListingLikes::delete_by_id(like.id).exec(&state.orm).await?;
            false
        }
        None => {
            LikeActive {
                id: Set(Uuid::new_v4()),
                listing_id: Set(listing_id),
                user_id: Set(user_id),
                created_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?;
            true
        }
    };

    let likes = ListingLikes::find()
        .filter(LikeCol::ListingId.eq(listing_id))
        .count(&state.orm)
        .await? as i64;

    state
        .events
        .publish(StoreEvent::ListingChanged { listing_id });

    Ok(ApiResponse::success(
        "OK",
        LikeState { liked, likes },
        Some(Meta::empty()),
    ))
}

pub async fn add_comment(
    state: &AppState,
    user_id: Uuid,
    listing_id: Uuid,
    payload: AddCommentRequest,
) -> AppResult<ApiResponse<ListingComment>> {
    require_active_member(&state.orm, user_id).await?;
    if payload.body.trim().is_empty() {
        return Err(AppError::BadRequest("comment must not be empty".into()));
    }

    let listing = Listings::find_by_id(listing_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let comment = CommentActive {
        id: Set(Uuid::new_v4()),
        listing_id: Set(listing_id),
        user_id: Set(user_id),
        body: Set(payload.body.trim().to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    if listing.seller_id != user_id {
        if let Err(err) = push_notification(
            state,
            listing.seller_id,
            "listing_comment",
            format!("New comment on \"{}\"", listing.title),
        )
        .await
        {
            tracing::warn!(error = %err, "notification failed");
        }
    }

    state
        .events
        .publish(StoreEvent::ListingChanged { listing_id });

    Ok(ApiResponse::success(
        "Comment added",
        ListingComment::from(comment),
        Some(Meta::empty()),
    ))
}

/// Seller short-circuit for sales that closed outside the app.
pub async fn mark_sold(
    state: &AppState,
    seller_id: Uuid,
    listing_id: Uuid,
) -> AppResult<ApiResponse<Listing>> {
    let listing = owned_listing(state, seller_id, listing_id).await?;
    let now = Utc::now();

    let result = Listings::update_many()
        .col_expr(ListingCol::Status, Expr::value(ListingStatus::Sold))
        .col_expr(ListingCol::SoldAt, Expr::value(Some(now)))
        .col_expr(ListingCol::UpdatedAt, Expr::value(now))
        .col_expr(ListingCol::Version, Expr::col(ListingCol::Version).add(1))
        .filter(ListingCol::Id.eq(listing_id))
        .filter(ListingCol::Version.eq(listing.version))
        .filter(ListingCol::Status.eq(ListingStatus::Active))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict("Listing changed concurrently".into()));
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(seller_id),
        "listing_mark_sold",
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

    let updated = Listings::find_by_id(listing_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Listing marked sold",
        Listing::from(updated),
        Some(Meta::empty()),
    ))
}

/// Seller-side delete; the record stays for orders that reference it.
pub async fn remove_listing(
    state: &AppState,
    seller_id: Uuid,
    listing_id: Uuid,
) -> AppResult<ApiResponse<Listing>> {
    let listing = owned_listing(state, seller_id, listing_id).await?;
    if !matches!(listing.status, ListingStatus::Active | ListingStatus::Pending) {
        return Err(AppError::BadRequest(
            "only active listings can be removed".into(),
        ));
    }

    let now = Utc::now();
    let result = Listings::update_many()
        .col_expr(ListingCol::Status, Expr::value(ListingStatus::Removed))
        .col_expr(ListingCol::UpdatedAt, Expr::value(now))
        .col_expr(ListingCol::Version, Expr::col(ListingCol::Version).add(1))
        .filter(ListingCol::Id.eq(listing_id))
        .filter(ListingCol::Version.eq(listing.version))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict("Listing changed concurrently".into()));
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(seller_id),
        "listing_remove",
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

    let updated = Listings::find_by_id(listing_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Listing removed",
        Listing::from(updated),
        Some(Meta::empty()),
    ))
}

async fn owned_listing(
    state: &AppState,
    seller_id: Uuid,
    listing_id: Uuid,
) -> AppResult<ListingModel> {
    let listing = Listings::find_by_id(listing_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if listing.seller_id != seller_id {
        return Err(AppError::Forbidden);
    }
    Ok(listing)
}
