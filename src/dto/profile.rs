use serde::{Deserialize, Serialize};

use crate::models::{Address, Notification};

#[derive(Debug, Deserialize)]
pub struct SetLocationRequest {
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct AddAddressRequest {
    pub label: String,
    pub detail: String,
    pub is_default: bool,
}

#[derive(Debug, Serialize)]
pub struct AddressList {
    pub items: Vec<Address>,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub items: Vec<Notification>,
}
