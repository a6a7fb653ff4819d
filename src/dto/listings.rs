use serde::{Deserialize, Serialize};

use crate::models::{Listing, ListingComment};

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub category: String,
    pub price: i64,
    pub condition: String,
    pub description: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct ListingList {
    pub items: Vec<Listing>,
}

#[derive(Debug, Serialize)]
pub struct ListingDetail {
    pub listing: Listing,
    pub likes: i64,
    pub comments: Vec<ListingComment>,
}

#[derive(Debug, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes: i64,
}
