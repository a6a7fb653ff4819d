use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::disputes::{DisputeList, OpenDisputeRequest},
    entity::{
        disputes::{ActiveModel as DisputeActive, Column as DisputeCol, Entity as Disputes},
        enums::{DisputeKind, DisputePriority, DisputeStatus},
        orders::Entity as Orders,
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    events::StoreEvent,
    models::{Dispute, EvidenceList},
    params::Pagination,
    response::{ApiResponse, Meta},
    state::AppState,
};

const MAX_EVIDENCE: usize = 8;

/// Fraud reports jump the queue, payment issues come next.
fn priority_for(kind: DisputeKind) -> DisputePriority {
    match kind {
        DisputeKind::Fraud => DisputePriority::High,
        DisputeKind::Payment => DisputePriority::Medium,
        _ => DisputePriority::Low,
    }
}

/// Blocked users may still open disputes; their block is what an account
/// dispute would be about.
pub async fn open_dispute(
    state: &AppState,
    user_id: Uuid,
    payload: OpenDisputeRequest,
) -> AppResult<ApiResponse<Dispute>> {
    Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let OpenDisputeRequest {
        order_id,
        kind,
        subject,
        description,
        evidence,
    } = payload;

    if subject.trim().is_empty() || description.trim().is_empty() {
        return Err(AppError::BadRequest(
            "subject and description are required".into(),
        ));
    }
    if evidence.len() > MAX_EVIDENCE {
        return Err(AppError::BadRequest(format!(
            "at most {MAX_EVIDENCE} evidence attachments"
        )));
    }

    if let Some(order_id) = order_id {
        let order = Orders::find_by_id(order_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        if order.buyer_id != user_id && order.seller_id != user_id {
            return Err(AppError::BadRequest(
                "Referenced order does not belong to you".into(),
            ));
        }
    }

    let dispute = DisputeActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        order_id: Set(order_id),
        kind: Set(kind),
        subject: Set(subject.trim().to_string()),
        description: Set(description),
        evidence: Set(EvidenceList(evidence)),
        status: Set(DisputeStatus::Pending),
        priority: Set(priority_for(kind)),
        resolution: Set(None),
        resolved_at: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user_id),
        "dispute_open",
        Some("disputes"),
        Some(serde_json::json!({ "dispute_id": dispute.id, "kind": kind })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    state.events.publish(StoreEvent::DisputeChanged {
        dispute_id: dispute.id,
    });

    Ok(ApiResponse::success(
        "Dispute opened",
        Dispute::from(dispute),
        Some(Meta::empty()),
    ))
}

pub async fn list_my_disputes(
    state: &AppState,
    user_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<DisputeList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Disputes::find()
        .filter(DisputeCol::UserId.eq(user_id))
        .order_by_desc(DisputeCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Dispute::from)
        .collect();

    Ok(ApiResponse::success(
        "Disputes",
        DisputeList { items },
        Some(Meta::new(page, limit, total)),
    ))
}
