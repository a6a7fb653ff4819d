use sea_orm::EntityTrait;
use uuid::Uuid;

use gradkart_core::{
    auth::AuthUser,
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::admin::CreditWalletRequest,
    dto::wallet::{StartWithdrawalRequest, VerifyWithdrawalRequest},
    entity,
    entity::enums::{
        TransactionKind, TransactionStatus, VerificationType, WithdrawalMethod, WithdrawalStatus,
    },
    error::AppError,
    events::EventBus,
    models::PayoutDestination,
    params::Pagination,
    services::{admin_service, auth_service, wallet_service},
    state::AppState,
};

fn upi_destination() -> PayoutDestination {
    PayoutDestination {
        upi_id: Some("student@upi".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn withdrawal_cannot_exceed_withdrawable_balance() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let user = create_member(&state, &admin, "student@example.com").await?;

    fund_withdrawable(&state, &admin, user, 1000).await?;

    let over = wallet_service::start_withdrawal(
        &state,
        user,
        StartWithdrawalRequest {
            amount: 1001,
            method: WithdrawalMethod::Upi,
            destination: upi_destination(),
        },
    )
    .await;
    assert!(matches!(over, Err(AppError::BadRequest(_))));

    // Usable balance does not count toward withdrawals.
    admin_service::credit_wallet(
        &state,
        &admin,
        CreditWalletRequest {
            user_id: user,
            amount: 5000,
            kind: TransactionKind::AdminCredit,
            note: None,
        },
    )
    .await?;
    let still_over = wallet_service::start_withdrawal(
        &state,
        user,
        StartWithdrawalRequest {
            amount: 1001,
            method: WithdrawalMethod::Upi,
            destination: upi_destination(),
        },
    )
    .await;
    assert!(matches!(still_over, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn otp_flow_debits_and_files_request_atomically() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let user = create_member(&state, &admin, "student@example.com").await?;
    fund_withdrawable(&state, &admin, user, 2000).await?;

    let challenge = wallet_service::start_withdrawal(
        &state,
        user,
        StartWithdrawalRequest {
            amount: 1500,
            method: WithdrawalMethod::Upi,
            destination: upi_destination(),
        },
    )
    .await?
    .data
    .unwrap();

    // A wrong code changes nothing.
    let wrong_code = if challenge.code == "000000" { "111111" } else { "000000" };
    let wrong = wallet_service::verify_withdrawal(
        &state,
        user,
        VerifyWithdrawalRequest {
            challenge_id: challenge.challenge_id,
            code: wrong_code.into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::BadRequest(_))));
    let wallet = wallet_service::get_wallet(&state, user).await?.data.unwrap();
    assert_eq!(wallet.withdrawable, 2000);

    let request = wallet_service::verify_withdrawal(
        &state,
        user,
        VerifyWithdrawalRequest {
            challenge_id: challenge.challenge_id,
            code: challenge.code.clone(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(request.status, WithdrawalStatus::Pending);
    assert_eq!(request.amount, 1500);

    let wallet = wallet_service::get_wallet(&state, user).await?.data.unwrap();
    assert_eq!(wallet.withdrawable, 500);

    // The ledger entry shares the request id and is pending alongside it.
    let entries = wallet_service::list_transactions(&state, user, Pagination::default())
        .await?
        .data
        .unwrap()
        .items;
    assert!(entries.iter().any(|t| {
        t.id == request.id
            && t.kind == TransactionKind::Withdrawal
            && t.status == TransactionStatus::Pending
    }));

    // A consumed challenge cannot be replayed.
    let replay = wallet_service::verify_withdrawal(
        &state,
        user,
        VerifyWithdrawalRequest {
            challenge_id: challenge.challenge_id,
            code: challenge.code,
        },
    )
    .await;
    assert!(matches!(replay, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn admin_decisions_settle_or_refund() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let user = create_member(&state, &admin, "student@example.com").await?;
    fund_withdrawable(&state, &admin, user, 3000).await?;

    let approved_req = request_withdrawal(&state, user, 1000).await?;
    admin_service::approve_withdrawal(&state, &admin, approved_req).await?;
    let entry = entity::WalletTransactions::find_by_id(approved_req)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(entry.status, TransactionStatus::Completed);

    let rejected_req = request_withdrawal(&state, user, 1000).await?;
    admin_service::reject_withdrawal(&state, &admin, rejected_req).await?;
    let entry = entity::WalletTransactions::find_by_id(rejected_req)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(entry.status, TransactionStatus::Reversed);

    // 3000 - 1000 paid out, the rejected 1000 came back.
    let wallet = wallet_service::get_wallet(&state, user).await?.data.unwrap();
    assert_eq!(wallet.withdrawable, 2000);

    // Decisions are final.
    let again = admin_service::approve_withdrawal(&state, &admin, rejected_req).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn destination_shape_matches_method() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let admin = admin_auth(&state).await?;
    let user = create_member(&state, &admin, "student@example.com").await?;
    fund_withdrawable(&state, &admin, user, 1000).await?;

    let missing_upi = wallet_service::start_withdrawal(
        &state,
        user,
        StartWithdrawalRequest {
            amount: 500,
            method: WithdrawalMethod::Upi,
            destination: PayoutDestination::default(),
        },
    )
    .await;
    assert!(matches!(missing_upi, Err(AppError::BadRequest(_))));

    let missing_ifsc = wallet_service::start_withdrawal(
        &state,
        user,
        StartWithdrawalRequest {
            amount: 500,
            method: WithdrawalMethod::Bank,
            destination: PayoutDestination {
                account_number: Some("1234567890".into()),
                holder_name: Some("Asha Nair".into()),
                ..Default::default()
            },
        },
    )
    .await;
    assert!(matches!(missing_ifsc, Err(AppError::BadRequest(_))));

    let bank_ok = wallet_service::start_withdrawal(
        &state,
        user,
        StartWithdrawalRequest {
            amount: 500,
            method: WithdrawalMethod::Bank,
            destination: PayoutDestination {
                account_number: Some("1234567890".into()),
                ifsc: Some("SBIN0001234".into()),
                holder_name: Some("Asha Nair".into()),
                ..Default::default()
            },
        },
    )
    .await?;
    assert!(bank_ok.data.is_some());

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

/// Sale proceeds without running a whole order through: an admin restore
/// credit lands in the withdrawable pot.
async fn fund_withdrawable(
    state: &AppState,
    admin: &AuthUser,
    user: Uuid,
    amount: i64,
) -> anyhow::Result<()> {
    admin_service::credit_wallet(
        state,
        admin,
        CreditWalletRequest {
            user_id: user,
            amount,
            kind: TransactionKind::AdminRestore,
            note: Some("test funding".into()),
        },
    )
    .await?;
    Ok(())
}

async fn request_withdrawal(state: &AppState, user: Uuid, amount: i64) -> anyhow::Result<Uuid> {
    let challenge = wallet_service::start_withdrawal(
        state,
        user,
        StartWithdrawalRequest {
            amount,
            method: WithdrawalMethod::Upi,
            destination: upi_destination(),
        },
    )
    .await?
    .data
    .unwrap();
    let request = wallet_service::verify_withdrawal(
        state,
        user,
        VerifyWithdrawalRequest {
            challenge_id: challenge.challenge_id,
            code: challenge.code,
        },
    )
    .await?
    .data
    .unwrap();
    Ok(request.id)
}
