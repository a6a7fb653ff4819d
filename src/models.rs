use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::entity;
use crate::entity::enums::{
    DeliveryMethod, DisputeKind, DisputePriority, DisputeStatus, ListingStatus, OfferStatus,
    OrderStatus, PaymentMethod, TransactionKind, TransactionStatus, UserStatus, VerificationType,
    WithdrawalMethod, WithdrawalStatus,
};

/// Image URLs attached to a listing, stored as one JSON column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ImageList(pub Vec<String>);

/// Evidence URLs attached to a dispute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct EvidenceList(pub Vec<String>);

/// Where a withdrawal pays out. Which fields are required depends on the
/// withdrawal method; `wallet_service` validates the shape before storing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct PayoutDestination {
    pub upi_id: Option<String>,
    pub account_number: Option<String>,
    pub ifsc: Option<String>,
    pub holder_name: Option<String>,
}

/// Where the approval gate routes a user. Checked in priority order:
/// shutdown first, then block, then approval status, then location setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AccessGate {
    Shutdown { message: Option<String> },
    Blocked { reason: Option<String> },
    PendingApproval,
    Rejected,
    LocationSetup,
    Ready,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub college: String,
    pub role: String,
    pub status: UserStatus,
    pub verification_type: VerificationType,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub location_skipped: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub category: String,
    pub price: i64,
    pub condition: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub status: ListingStatus,
    pub views: i64,
    pub sold_to: Option<Uuid>,
    pub sold_at: Option<DateTime<Utc>>,
    pub removed_reason: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingComment {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub amount: i64,
    pub comment: Option<String>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub item_price: i64,
    pub delivery_fee: i64,
    pub platform_fee: i64,
    pub total_amount: i64,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub delivery_address: Option<String>,
    pub offer_id: Option<Uuid>,
    pub status: OrderStatus,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub kind: DisputeKind,
    pub subject: String,
    pub description: String,
    pub evidence: Vec<String>,
    pub status: DisputeStatus,
    pub priority: DisputePriority,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: Uuid,
    pub withdrawable: i64,
    pub usable: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: i64,
    pub status: TransactionStatus,
    pub reference: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub method: WithdrawalMethod,
    pub destination: PayoutDestination,
    pub status: WithdrawalStatus,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub detail: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl From<entity::users::Model> for User {
    fn from(model: entity::users::Model) -> Self {
        User {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            college: model.college,
            role: model.role,
            status: model.status,
            verification_type: model.verification_type,
            is_blocked: model.is_blocked,
            block_reason: model.block_reason,
            blocked_at: model.blocked_at.map(|dt| dt.with_timezone(&Utc)),
            location: model.location,
            location_skipped: model.location_skipped,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::listings::Model> for Listing {
    fn from(model: entity::listings::Model) -> Self {
        Listing {
            id: model.id,
            seller_id: model.seller_id,
            title: model.title,
            category: model.category,
            price: model.price,
            condition: model.condition,
            description: model.description,
            images: model.images.0,
            status: model.status,
            views: model.views,
            sold_to: model.sold_to,
            sold_at: model.sold_at.map(|dt| dt.with_timezone(&Utc)),
            removed_reason: model.removed_reason,
            version: model.version,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::listing_comments::Model> for ListingComment {
    fn from(model: entity::listing_comments::Model) -> Self {
        ListingComment {
            id: model.id,
            listing_id: model.listing_id,
            user_id: model.user_id,
            body: model.body,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::offers::Model> for Offer {
    fn from(model: entity::offers::Model) -> Self {
        Offer {
            id: model.id,
            listing_id: model.listing_id,
            buyer_id: model.buyer_id,
            amount: model.amount,
            comment: model.comment,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::orders::Model> for Order {
    fn from(model: entity::orders::Model) -> Self {
        Order {
            id: model.id,
            listing_id: model.listing_id,
            buyer_id: model.buyer_id,
            seller_id: model.seller_id,
            item_price: model.item_price,
            delivery_fee: model.delivery_fee,
            platform_fee: model.platform_fee,
            total_amount: model.total_amount,
            delivery_method: model.delivery_method,
            payment_method: model.payment_method,
            delivery_address: model.delivery_address,
            offer_id: model.offer_id,
            status: model.status,
            cancel_reason: model.cancel_reason,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::disputes::Model> for Dispute {
    fn from(model: entity::disputes::Model) -> Self {
        Dispute {
            id: model.id,
            user_id: model.user_id,
            order_id: model.order_id,
            kind: model.kind,
            subject: model.subject,
            description: model.description,
            evidence: model.evidence.0,
            status: model.status,
            priority: model.priority,
            resolution: model.resolution,
            resolved_at: model.resolved_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::wallets::Model> for Wallet {
    fn from(model: entity::wallets::Model) -> Self {
        Wallet {
            user_id: model.user_id,
            withdrawable: model.withdrawable,
            usable: model.usable,
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::wallet_transactions::Model> for WalletTransaction {
    fn from(model: entity::wallet_transactions::Model) -> Self {
        WalletTransaction {
            id: model.id,
            user_id: model.user_id,
            kind: model.kind,
            amount: model.amount,
            status: model.status,
            reference: model.reference,
            note: model.note,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::withdrawal_requests::Model> for WithdrawalRequest {
    fn from(model: entity::withdrawal_requests::Model) -> Self {
        WithdrawalRequest {
            id: model.id,
            user_id: model.user_id,
            amount: model.amount,
            method: model.method,
            destination: model.destination,
            status: model.status,
            decided_at: model.decided_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::addresses::Model> for Address {
    fn from(model: entity::addresses::Model) -> Self {
        Address {
            id: model.id,
            user_id: model.user_id,
            label: model.label,
            detail: model.detail,
            is_default: model.is_default,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::notifications::Model> for Notification {
    fn from(model: entity::notifications::Model) -> Self {
        Notification {
            id: model.id,
            user_id: model.user_id,
            kind: model.kind,
            body: model.body,
            read: model.read,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::audit_logs::Model> for AuditLog {
    fn from(model: entity::audit_logs::Model) -> Self {
        AuditLog {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            resource: model.resource,
            metadata: model.metadata,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
