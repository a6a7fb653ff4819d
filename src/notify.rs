use chrono::Utc;
use sea_orm::ActiveModelTrait;
use sea_orm::ActiveValue::Set;
use uuid::Uuid;

use crate::{
    entity::notifications::ActiveModel as NotificationActive,
    error::AppResult,
    events::StoreEvent,
    state::AppState,
};

/// In-app inbox entry. Fire-and-forget like the audit log: callers warn and
/// move on if this fails, a lost notification must never abort the mutation
/// it narrates.
pub async fn push_notification(
    state: &AppState,
    user_id: Uuid,
    kind: &str,
    body: impl Into<String>,
) -> AppResult<()> {
    NotificationActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        kind: Set(kind.to_string()),
        body: Set(body.into()),
        read: Set(false),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    state.events.publish(StoreEvent::NotificationAdded { user_id });
    Ok(())
}
