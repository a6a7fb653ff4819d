pub mod admin_service;
pub mod auth_service;
pub mod dispute_service;
pub mod listing_service;
pub mod offer_service;
pub mod order_service;
pub mod profile_service;
pub mod wallet_service;
