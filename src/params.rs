use serde::Deserialize;

use crate::entity::enums::{
    DisputePriority, DisputeStatus, ListingStatus, OrderStatus, UserStatus, WithdrawalStatus,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSortBy {
    CreatedAt,
    Price,
    Views,
}

/// Browse query for the marketplace feed.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<ListingSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MyListingQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<ListingStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<OrderStatus>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<UserStatus>,
    pub blocked: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DisputeListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<DisputeStatus>,
    pub priority: Option<DisputePriority>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WithdrawalListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<WithdrawalStatus>,
}
