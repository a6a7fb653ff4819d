use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    auth::AuthUser,
    config::AppConfig,
    dto::auth::{AdminLoginRequest, SessionResponse, SignUpRequest},
    entity::{
        enums::{UserStatus, VerificationType},
        platform_settings::{Entity as PlatformSettings, Model as SettingsModel},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
        wallets::ActiveModel as WalletActive,
    },
    error::{AppError, AppResult},
    events::StoreEvent,
    models::{AccessGate, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn sign_up(state: &AppState, payload: SignUpRequest) -> AppResult<ApiResponse<User>> {
    let SignUpRequest {
        name,
        email,
        phone,
        college,
        verification_type,
    } = payload;

    let email = email.trim().to_lowercase();
    if name.trim().is_empty() || email.is_empty() || college.trim().is_empty() {
        return Err(AppError::BadRequest(
            "name, email and college are required".into(),
        ));
    }

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let id = Uuid::new_v4();
    let now = Utc::now();

    let txn = state.orm.begin().await?;
    let user = UserActive {
        id: Set(id),
        name: Set(name.trim().to_string()),
        email: Set(email),
        phone: Set(phone),
        college: Set(college.trim().to_string()),
        role: Set("user".into()),
        status: Set(UserStatus::Pending),
        verification_type: Set(verification_type),
        is_blocked: Set(false),
        block_reason: Set(None),
        blocked_at: Set(None),
        password_hash: Set(None),
        location: Set(None),
        location_skipped: Set(false),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    // Every account gets a zeroed wallet up front so later credits never
    // have to special-case a missing row.
    WalletActive {
        user_id: Set(id),
        withdrawable: Set(0),
        usable: Set(0),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_signup",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "college": user.college })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    state.events.publish(StoreEvent::UserChanged { user_id: id });

    Ok(ApiResponse::success(
        "Account created, awaiting approval",
        User::from(user),
        None,
    ))
}

pub async fn login(state: &AppState, email: &str) -> AppResult<ApiResponse<SessionResponse>> {
    let email = email.trim().to_lowercase();
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::BadRequest("No account for this email".into())),
    };

    let settings = load_settings(&state.orm).await?;
    let gate = access_gate(&user, settings.as_ref());

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Logged in",
        SessionResponse {
            user: User::from(user),
            gate,
        },
        Some(Meta::empty()),
    ))
}

pub async fn admin_login(
    state: &AppState,
    payload: AdminLoginRequest,
) -> AppResult<ApiResponse<AuthUser>> {
    let AdminLoginRequest { email, password } = payload;
    let user = Users::find()
        .filter(UserCol::Email.eq(email.trim().to_lowercase().as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) if u.role == "admin" => u,
        _ => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    let stored_hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Admin account has no credential")))?;

    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "admin_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Logged in",
        AuthUser {
            user_id: user.id,
            role: user.role,
        },
        Some(Meta::empty()),
    ))
}

/// Idempotently create the admin account with the configured credential.
pub async fn ensure_admin_account(state: &AppState, config: &AppConfig) -> AppResult<Uuid> {
    let email = config.admin_email.trim().to_lowercase();
    let existing = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if let Some(user) = existing {
        return Ok(user.id);
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(config.admin_password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();

    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set("GradKart Admin".into()),
        email: Set(email),
        phone: Set(String::new()),
        college: Set(String::new()),
        role: Set("admin".into()),
        status: Set(UserStatus::Approved),
        verification_type: Set(VerificationType::Email),
        is_blocked: Set(false),
        block_reason: Set(None),
        blocked_at: Set(None),
        password_hash: Set(Some(password_hash)),
        location: Set(None),
        location_skipped: Set(true),
        created_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

/// Routing decision for the approval gate, in priority order.
pub fn access_gate(user: &UserModel, settings: Option<&SettingsModel>) -> AccessGate {
    if let Some(settings) = settings {
        if settings.is_shutdown {
            return AccessGate::Shutdown {
                message: settings.message.clone(),
            };
        }
    }

    // A block outranks approval status.
    if user.is_blocked {
        return AccessGate::Blocked {
            reason: user.block_reason.clone(),
        };
    }

    match user.status {
        UserStatus::Pending => AccessGate::PendingApproval,
        UserStatus::Rejected => AccessGate::Rejected,
        UserStatus::Approved => {
            if user.location.is_none() && !user.location_skipped {
                AccessGate::LocationSetup
            } else {
                AccessGate::Ready
            }
        }
    }
}

pub async fn get_access_gate(state: &AppState, user_id: Uuid) -> AppResult<ApiResponse<AccessGate>> {
    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let settings = load_settings(&state.orm).await?;
    Ok(ApiResponse::success(
        "OK",
        access_gate(&user, settings.as_ref()),
        Some(Meta::empty()),
    ))
}

pub(crate) async fn load_settings<C: ConnectionTrait>(
    conn: &C,
) -> AppResult<Option<SettingsModel>> {
    Ok(PlatformSettings::find_by_id(1).one(conn).await?)
}

/// Marketplace actions require an approved, unblocked account.
pub(crate) async fn require_active_member<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<UserModel> {
    let user = Users::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    if user.is_blocked || user.status != UserStatus::Approved {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}
