use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::enums::DisputeKind;
use crate::models::Dispute;

#[derive(Debug, Deserialize)]
pub struct OpenDisputeRequest {
    pub order_id: Option<Uuid>,
    pub kind: DisputeKind,
    pub subject: String,
    pub description: String,
    pub evidence: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DisputeList {
    pub items: Vec<Dispute>,
}
