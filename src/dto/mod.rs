pub mod admin;
pub mod auth;
pub mod disputes;
pub mod listings;
pub mod offers;
pub mod orders;
pub mod profile;
pub mod wallet;
