use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::enums::TransactionKind;
use crate::models::User;

#[derive(Debug, Deserialize)]
pub struct BlockUserRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveListingRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveDisputeRequest {
    pub resolution: String,
}

#[derive(Debug, Deserialize)]
pub struct CreditWalletRequest {
    pub user_id: Uuid,
    pub amount: i64,
    pub kind: TransactionKind,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetShutdownRequest {
    pub enabled: bool,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub items: Vec<User>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportCollection {
    Users,
    Listings,
    Offers,
    Orders,
    Disputes,
    Wallets,
    WalletTransactions,
    WithdrawalRequests,
    AuditLogs,
}

impl ExportCollection {
    pub fn file_stem(&self) -> &'static str {
        match self {
            ExportCollection::Users => "users",
            ExportCollection::Listings => "listings",
            ExportCollection::Offers => "offers",
            ExportCollection::Orders => "orders",
            ExportCollection::Disputes => "disputes",
            ExportCollection::Wallets => "wallets",
            ExportCollection::WalletTransactions => "wallet_transactions",
            ExportCollection::WithdrawalRequests => "withdrawal_requests",
            ExportCollection::AuditLogs => "audit_logs",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportFile {
    pub path: String,
    pub records: usize,
}
