use uuid::Uuid;

use gradkart_core::{
    auth::AuthUser,
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::admin::{ExportCollection, RemoveListingRequest, ResolveDisputeRequest},
    dto::disputes::OpenDisputeRequest,
    dto::listings::CreateListingRequest,
    entity::enums::{
        DisputeKind, DisputePriority, DisputeStatus, ListingStatus, VerificationType,
    },
    error::AppError,
    events::EventBus,
    params::{DisputeListQuery, ListingQuery},
    services::{admin_service, auth_service, dispute_service, listing_service},
    state::AppState,
};

#[tokio::test]
async fn moderation_removes_and_restores_listings() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let seller = create_member(&state, &admin, "seller@example.com").await?;

    let listing = listing_service::create_listing(
        &state,
        seller,
        CreateListingRequest {
            title: "Scientific calculator".into(),
            category: "electronics".into(),
            price: 900,
            condition: "Good".into(),
            description: None,
            images: vec![],
        },
    )
    .await?
    .data
    .unwrap();

    admin_service::remove_listing(
        &state,
        &admin,
        listing.id,
        RemoveListingRequest {
            reason: "prohibited item".into(),
        },
    )
    .await?;

    // Removed listings drop out of the browse feed.
    let feed = listing_service::list_listings(&state, ListingQuery::default())
        .await?
        .data
        .unwrap()
        .items;
    assert!(feed.iter().all(|l| l.id != listing.id));

    let restored = admin_service::restore_listing(&state, &admin, listing.id)
        .await?
        .data
        .unwrap();
    assert_eq!(restored.status, ListingStatus::Active);
    assert_eq!(restored.removed_reason, None);

    // Moderation is admin-only.
    let not_admin = AuthUser {
        user_id: seller,
        role: "user".into(),
    };
    let denied = admin_service::restore_listing(&state, &not_admin, listing.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    Ok(())
}

#[tokio::test]
async fn dispute_priority_derives_from_kind() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let user = create_member(&state, &admin, "student@example.com").await?;

    let fraud = open(&state, user, DisputeKind::Fraud).await?;
    let payment = open(&state, user, DisputeKind::Payment).await?;
    let delivery = open(&state, user, DisputeKind::Delivery).await?;

    assert_eq!(fraud.priority, DisputePriority::High);
    assert_eq!(payment.priority, DisputePriority::Medium);
    assert_eq!(delivery.priority, DisputePriority::Low);

    Ok(())
}

#[tokio::test]
async fn disputes_resolve_once() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let user = create_member(&state, &admin, "student@example.com").await?;

    let dispute = open(&state, user, DisputeKind::Payment).await?;

    admin_service::start_investigation(&state, &admin, dispute.id).await?;
    let resolved = admin_service::resolve_dispute(
        &state,
        &admin,
        dispute.id,
        ResolveDisputeRequest {
            resolution: "refund issued to wallet".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(resolved.status, DisputeStatus::Resolved);
    assert!(resolved.resolved_at.is_some());

    let again = admin_service::resolve_dispute(
        &state,
        &admin,
        dispute.id,
        ResolveDisputeRequest {
            resolution: "duplicate".into(),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    // High-priority queue filter sees only what it should.
    let fraud = open(&state, user, DisputeKind::Fraud).await?;
    let high = admin_service::list_disputes(
        &state,
        &admin,
        DisputeListQuery {
            priority: Some(DisputePriority::High),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].id, fraud.id);

    Ok(())
}

#[tokio::test]
async fn export_writes_the_collection_file() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    create_member(&state, &admin, "student@example.com").await?;

    let dir = std::env::temp_dir().join(format!("gradkart-export-{}", Uuid::new_v4()));
    let export = admin_service::export_collection(
        &state,
        &admin,
        ExportCollection::Users,
        &dir.display().to_string(),
    )
    .await?
    .data
    .unwrap();

    // Admin + the student.
    assert_eq!(export.records, 2);
    let raw = tokio::fs::read_to_string(&export.path).await?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(parsed.as_array().map(|a| a.len()), Some(2));
    // The password hash never leaves the store boundary.
    assert!(!raw.contains("password_hash"));

    Ok(())
}

async fn open(
    state: &AppState,
    user: Uuid,
    kind: DisputeKind,
) -> anyhow::Result<gradkart_core::models::Dispute> {
    let dispute = dispute_service::open_dispute(
        state,
        user,
        OpenDisputeRequest {
            order_id: None,
            kind,
            subject: "Something went wrong".into(),
            description: "Details of what happened".into(),
            evidence: vec![],
        },
    )
    .await?
    .data
    .unwrap();
    Ok(dispute)
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
