use uuid::Uuid;

use gradkart_core::{
    auth::AuthUser,
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::admin::{BlockUserRequest, SetShutdownRequest},
    dto::auth::SignUpRequest,
    dto::profile::SetLocationRequest,
    entity::enums::VerificationType,
    events::{EventBus, StoreEvent},
    models::AccessGate,
    services::{admin_service, auth_service, profile_service},
    state::AppState,
};

#[tokio::test]
async fn gate_follows_approval_lifecycle() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;

    let resp = auth_service::sign_up(
        &state,
        SignUpRequest {
            name: "Asha Nair".into(),
            email: "asha@example.com".into(),
            phone: "9000000001".into(),
            college: "NIT Calicut".into(),
            verification_type: VerificationType::Email,
        },
    )
    .await?;
    let user = resp.data.unwrap();

    let gate = auth_service::get_access_gate(&state, user.id).await?.data.unwrap();
    assert_eq!(gate, AccessGate::PendingApproval);

    let mut rx = state.events.subscribe();
    admin_service::approve_user(&state, &admin, user.id).await?;
    assert!(
        drain_for_user_change(&mut rx, user.id),
        "expected a UserChanged event after approval"
    );

    // Approved but no location yet.
    let gate = auth_service::get_access_gate(&state, user.id).await?.data.unwrap();
    assert_eq!(gate, AccessGate::LocationSetup);

    profile_service::set_location(
        &state,
        user.id,
        SetLocationRequest {
            location: "Kochi".into(),
        },
    )
    .await?;
    let gate = auth_service::get_access_gate(&state, user.id).await?.data.unwrap();
    assert_eq!(gate, AccessGate::Ready);

    Ok(())
}

#[tokio::test]
async fn block_outranks_approval_status() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;

    let user = auth_service::sign_up(
        &state,
        SignUpRequest {
            name: "Rahul Mehta".into(),
            email: "rahul@example.com".into(),
            phone: "9000000002".into(),
            college: "IIT Bombay".into(),
            verification_type: VerificationType::Id,
        },
    )
    .await?
    .data
    .unwrap();

    admin_service::approve_user(&state, &admin, user.id).await?;
    profile_service::skip_location(&state, user.id).await?;

    admin_service::block_user(
        &state,
        &admin,
        user.id,
        BlockUserRequest {
            reason: "spam listings".into(),
        },
    )
    .await?;

    let gate = auth_service::get_access_gate(&state, user.id).await?.data.unwrap();
    assert_eq!(
        gate,
        AccessGate::Blocked {
            reason: Some("spam listings".into())
        }
    );

    admin_service::unblock_user(&state, &admin, user.id).await?;
    let gate = auth_service::get_access_gate(&state, user.id).await?.data.unwrap();
    assert_eq!(gate, AccessGate::Ready);

    Ok(())
}

#[tokio::test]
async fn rejected_user_sees_rejection() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;

    let user = auth_service::sign_up(
        &state,
        SignUpRequest {
            name: "Vikram Singh".into(),
            email: "vikram@example.com".into(),
            phone: "9000000003".into(),
            college: "BITS Pilani".into(),
            verification_type: VerificationType::Email,
        },
    )
    .await?
    .data
    .unwrap();

    admin_service::reject_user(&state, &admin, user.id).await?;
    let gate = auth_service::get_access_gate(&state, user.id).await?.data.unwrap();
    assert_eq!(gate, AccessGate::Rejected);

    // Approve/reject only applies to pending users.
    let err = admin_service::approve_user(&state, &admin, user.id).await;
    assert!(err.is_err());

    Ok(())
}

#[tokio::test]
async fn shutdown_gates_everyone() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;

    let user = auth_service::sign_up(
        &state,
        SignUpRequest {
            name: "Meera Iyer".into(),
            email: "meera@example.com".into(),
            phone: "9000000004".into(),
            college: "Anna University".into(),
            verification_type: VerificationType::Email,
        },
    )
    .await?
    .data
    .unwrap();
    admin_service::approve_user(&state, &admin, user.id).await?;
    profile_service::skip_location(&state, user.id).await?;

    let mut rx = state.events.subscribe();
    admin_service::set_shutdown(
        &state,
        &admin,
        SetShutdownRequest {
            enabled: true,
            message: Some("back after exams".into()),
        },
    )
    .await?;
    assert!(
        drain_for_settings_change(&mut rx),
        "expected a SettingsChanged event"
    );

    let gate = auth_service::get_access_gate(&state, user.id).await?.data.unwrap();
    assert_eq!(
        gate,
        AccessGate::Shutdown {
            message: Some("back after exams".into())
        }
    );

    admin_service::set_shutdown(
        &state,
        &admin,
        SetShutdownRequest {
            enabled: false,
            message: None,
        },
    )
    .await?;
    let gate = auth_service::get_access_gate(&state, user.id).await?.data.unwrap();
    assert_eq!(gate, AccessGate::Ready);

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

fn drain_for_user_change(
    rx: &mut tokio::sync::broadcast::Receiver<StoreEvent>,
    expected: Uuid,
) -> bool {
    while let Ok(event) = rx.try_recv() {
        if matches!(event, StoreEvent::UserChanged { user_id } if user_id == expected) {
            return true;
        }
    }
    false
}

fn drain_for_settings_change(rx: &mut tokio::sync::broadcast::Receiver<StoreEvent>) -> bool {
    while let Ok(event) = rx.try_recv() {
        if matches!(event, StoreEvent::SettingsChanged) {
            return true;
        }
    }
    false
}
