use chrono::{Duration, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, EntityTrait};
use uuid::Uuid;

use gradkart_core::{
    auth::AuthUser,
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::admin::CreditWalletRequest,
    dto::listings::CreateListingRequest,
    dto::orders::{CancelOrderRequest, CheckoutRequest, UpdateOrderStatusRequest},
    entity,
    entity::enums::{
        DeliveryMethod, ListingStatus, OrderStatus, PaymentMethod, TransactionKind,
        TransactionStatus, VerificationType,
    },
    error::AppError,
    events::EventBus,
    models::Listing,
    params::Pagination,
    services::{admin_service, auth_service, listing_service, order_service, wallet_service},
    state::AppState,
};

#[tokio::test]
async fn totals_add_delivery_and_platform_fee() {
    // The worked example: 45000 on pickup.
    let totals = order_service::compute_totals(45000, DeliveryMethod::Pickup);
    assert_eq!(totals.platform_fee, 900);
    assert_eq!(totals.delivery_fee, 0);
    assert_eq!(totals.total_amount, 45900);

    let totals = order_service::compute_totals(45000, DeliveryMethod::Gradkart);
    assert_eq!(totals.delivery_fee, 99);
    assert_eq!(totals.total_amount, 45999);

    // 2% of 75 is 1.5; rounds half-up.
    let totals = order_service::compute_totals(75, DeliveryMethod::Pickup);
    assert_eq!(totals.platform_fee, 2);
}

#[tokio::test]
async fn checkout_sells_the_listing_exactly_once() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let seller = create_member(&state, &admin, "seller@example.com").await?;
    let buyer_a = create_member(&state, &admin, "buyer-a@example.com").await?;
    let buyer_b = create_member(&state, &admin, "buyer-b@example.com").await?;
    let listing = create_listing(&state, seller, 45000).await?;

    let order = order_service::checkout(
        &state,
        buyer_a,
        CheckoutRequest {
            listing_id: listing.id,
            offer_id: None,
            delivery_method: DeliveryMethod::Pickup,
            payment_method: PaymentMethod::Upi,
            delivery_address: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(order.total_amount, 45900);
    assert_eq!(order.status, OrderStatus::Confirmed);

    let sold = entity::Listings::find_by_id(listing.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);
    assert_eq!(sold.sold_to, Some(buyer_a));
    assert_eq!(sold.version, listing.version + 1);

    // The listing is gone from the market; a second buyer conflicts.
    let second = order_service::checkout(
        &state,
        buyer_b,
        CheckoutRequest {
            listing_id: listing.id,
            offer_id: None,
            delivery_method: DeliveryMethod::Pickup,
            payment_method: PaymentMethod::Upi,
            delivery_address: None,
        },
    )
    .await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    Ok(())
}

#[tokio::test]
async fn cancellation_window_is_24_hours() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let seller = create_member(&state, &admin, "seller@example.com").await?;
    let buyer = create_member(&state, &admin, "buyer@example.com").await?;

    // Fresh order cancels fine and puts the listing back on the market.
    let listing = create_listing(&state, seller, 5000).await?;
    let order = checkout_simple(&state, buyer, &listing).await?;
    order_service::cancel_order(
        &state,
        buyer,
        order.id,
        CancelOrderRequest {
            reason: "found it cheaper".into(),
        },
    )
    .await?;
    let restored = entity::Listings::find_by_id(listing.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(restored.status, ListingStatus::Active);
    assert_eq!(restored.sold_to, None);

    // An order older than the window is stuck.
    let listing = create_listing(&state, seller, 5000).await?;
    let order = checkout_simple(&state, buyer, &listing).await?;
    let record = entity::Orders::find_by_id(order.id)
        .one(&state.orm)
        .await?
        .unwrap();
    let mut active: entity::orders::ActiveModel = record.into();
    active.created_at = Set((Utc::now() - Duration::hours(25)).into());
    active.update(&state.orm).await?;

    let late = order_service::cancel_order(
        &state,
        buyer,
        order.id,
        CancelOrderRequest {
            reason: "too late".into(),
        },
    )
    .await;
    assert!(matches!(late, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn shipped_orders_cannot_be_cancelled() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let seller = create_member(&state, &admin, "seller@example.com").await?;
    let buyer = create_member(&state, &admin, "buyer@example.com").await?;
    let listing = create_listing(&state, seller, 5000).await?;
    let order = checkout_simple(&state, buyer, &listing).await?;

    order_service::update_order_status(
        &state,
        seller,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await?;

    let cancel = order_service::cancel_order(
        &state,
        buyer,
        order.id,
        CancelOrderRequest {
            reason: "changed my mind".into(),
        },
    )
    .await;
    assert!(matches!(cancel, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn completion_credits_the_seller() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let seller = create_member(&state, &admin, "seller@example.com").await?;
    let buyer = create_member(&state, &admin, "buyer@example.com").await?;
    let listing = create_listing(&state, seller, 5000).await?;
    let order = checkout_simple(&state, buyer, &listing).await?;

    // Buyer cannot ship, seller cannot complete.
    let wrong_actor = order_service::update_order_status(
        &state,
        buyer,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await;
    assert!(wrong_actor.is_err());

    for status in [OrderStatus::Shipped, OrderStatus::Delivered] {
        order_service::update_order_status(
            &state,
            seller,
            order.id,
            UpdateOrderStatusRequest { status },
        )
        .await?;
    }
    let skip_ahead = order_service::update_order_status(
        &state,
        seller,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Completed,
        },
    )
    .await;
    assert!(skip_ahead.is_err(), "only the buyer confirms receipt");

    order_service::update_order_status(
        &state,
        buyer,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Completed,
        },
    )
    .await?;

    let wallet = wallet_service::get_wallet(&state, seller).await?.data.unwrap();
    assert_eq!(wallet.withdrawable, 5000);

    let entries = wallet_service::list_transactions(&state, seller, Pagination::default())
        .await?
        .data
        .unwrap()
        .items;
    assert!(entries.iter().any(|t| {
        t.kind == TransactionKind::SaleCredit
            && t.amount == 5000
            && t.status == TransactionStatus::Completed
            && t.reference == Some(order.id)
    }));

    Ok(())
}

#[tokio::test]
async fn wallet_payment_debits_and_refunds_usable_balance() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let seller = create_member(&state, &admin, "seller@example.com").await?;
    let buyer = create_member(&state, &admin, "buyer@example.com").await?;
    let listing = create_listing(&state, seller, 5000).await?;

    // 5000 + 2% fee on pickup = 5100; fund the buyer just past it.
    admin_service::credit_wallet(
        &state,
        &admin,
        CreditWalletRequest {
            user_id: buyer,
            amount: 6000,
            kind: TransactionKind::AdminCredit,
            note: None,
        },
    )
    .await?;

    let order = order_service::checkout(
        &state,
        buyer,
        CheckoutRequest {
            listing_id: listing.id,
            offer_id: None,
            delivery_method: DeliveryMethod::Pickup,
            payment_method: PaymentMethod::Wallet,
            delivery_address: Some("Hostel 4, IIT Bombay".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(order.total_amount, 5100);

    let wallet = wallet_service::get_wallet(&state, buyer).await?.data.unwrap();
    assert_eq!(wallet.usable, 900);

    order_service::cancel_order(
        &state,
        buyer,
        order.id,
        CancelOrderRequest {
            reason: "ordered twice".into(),
        },
    )
    .await?;

    let wallet = wallet_service::get_wallet(&state, buyer).await?.data.unwrap();
    assert_eq!(wallet.usable, 6000);

    let entries = wallet_service::list_transactions(&state, buyer, Pagination::default())
        .await?
        .data
        .unwrap()
        .items;
    assert!(entries.iter().any(|t| {
        t.kind == TransactionKind::Purchase && t.status == TransactionStatus::Reversed
    }));

    Ok(())
}

#[tokio::test]
async fn wallet_checkout_requires_funds() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let seller = create_member(&state, &admin, "seller@example.com").await?;
    let buyer = create_member(&state, &admin, "buyer@example.com").await?;
    let listing = create_listing(&state, seller, 5000).await?;

    let broke = order_service::checkout(
        &state,
        buyer,
        CheckoutRequest {
            listing_id: listing.id,
            offer_id: None,
            delivery_method: DeliveryMethod::Pickup,
            payment_method: PaymentMethod::Wallet,
            delivery_address: None,
        },
    )
    .await;
    assert!(matches!(broke, Err(AppError::BadRequest(_))));

    // The failed attempt left no order and no sold flag behind.
    let listing = entity::Listings::find_by_id(listing.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(listing.status, ListingStatus::Active);
    let orders = order_service::list_orders(&state, buyer, Default::default())
        .await?
        .data
        .unwrap()
        .items;
    assert!(orders.is_empty());

    Ok(())
}

async fn setup_state() -> anyhow::Result<AppState> {
    let db_path = std::env::temp_dir().join(format!("gradkart-test-{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = create_pool(&url).await?;
    let orm = create_orm_conn(&pool);
    run_migrations(&orm).await?;
    Ok(AppState {
        pool,
        orm,
        events: EventBus::new(),
    })
}

async fn admin_auth(state: &AppState) -> anyhow::Result<AuthUser> {
    let config = AppConfig {
        database_url: String::new(),
        admin_email: "admin@gradkart.app".into(),
        admin_password: "gradkart2024".into(),
        export_dir: "exports".into(),
    };
    let admin_id = auth_service::ensure_admin_account(state, &config).await?;
    Ok(AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    })
}

async fn create_member(
    state: &AppState,
    admin: &AuthUser,
    email: &str,
) -> anyhow::Result<Uuid> {
    let user = auth_service::sign_up(
        state,
        gradkart_core::dto::auth::SignUpRequest {
            name: "Test Student".into(),
            email: email.into(),
            phone: "9000000000".into(),
            college: "IIT Bombay".into(),
            verification_type: VerificationType::Email,
        },
    )
    .await?
    .data
    .unwrap();
    admin_service::approve_user(state, admin, user.id).await?;
    Ok(user.id)
}

async fn create_listing(state: &AppState, seller: Uuid, price: i64) -> anyhow::Result<Listing> {
    let listing = listing_service::create_listing(
        state,
        seller,
        CreateListingRequest {
            title: "Mini fridge 50L".into(),
            category: "appliances".into(),
            price,
            condition: "Good".into(),
            description: None,
            images: vec![],
        },
    )
    .await?
    .data
    .unwrap();
    Ok(listing)
}

async fn checkout_simple(
    state: &AppState,
    buyer: Uuid,
    listing: &Listing,
) -> anyhow::Result<gradkart_core::models::Order> {
    let order = order_service::checkout(
        state,
        buyer,
        CheckoutRequest {
            listing_id: listing.id,
            offer_id: None,
            delivery_method: DeliveryMethod::Pickup,
            payment_method: PaymentMethod::Upi,
            delivery_address: None,
        },
    )
    .await?
    .data
    .unwrap();
    Ok(order)
}
