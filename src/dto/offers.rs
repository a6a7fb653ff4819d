use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Offer;

#[derive(Debug, Deserialize)]
pub struct MakeOfferRequest {
    pub listing_id: Uuid,
    pub amount: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferDecision {
    Accept,
    Reject,
}

#[derive(Debug, Serialize)]
pub struct OfferList {
    pub items: Vec<Offer>,
}
