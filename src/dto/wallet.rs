use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::enums::WithdrawalMethod;
use crate::models::{PayoutDestination, WalletTransaction, WithdrawalRequest};

#[derive(Debug, Deserialize)]
pub struct StartWithdrawalRequest {
    pub amount: i64,
    pub method: WithdrawalMethod,
    pub destination: PayoutDestination,
}

/// The issued OTP challenge. There is no server to deliver the code out of
/// band, so it is returned to the caller; unlike the original flow it is
/// actually checked on verification.
#[derive(Debug, Serialize)]
pub struct WithdrawalChallenge {
    pub challenge_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyWithdrawalRequest {
    pub challenge_id: Uuid,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionList {
    pub items: Vec<WalletTransaction>,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalList {
    pub items: Vec<WithdrawalRequest>,
}
