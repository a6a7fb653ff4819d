use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::enums::{DeliveryMethod, OrderStatus, PaymentMethod};
use crate::models::Order;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub listing_id: Uuid,
    /// Accepted offer to buy at the negotiated price instead of list price.
    pub offer_id: Option<Uuid>,
    pub delivery_method: DeliveryMethod,
    pub payment_method: PaymentMethod,
    pub delivery_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub item_price: i64,
    pub delivery_fee: i64,
    pub platform_fee: i64,
    pub total_amount: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub items: Vec<Order>,
}
