pub mod enums;

pub mod addresses;
pub mod audit_logs;
pub mod disputes;
pub mod listing_comments;
pub mod listing_likes;
pub mod listings;
pub mod notifications;
pub mod offers;
pub mod orders;
pub mod platform_settings;
pub mod users;
pub mod wallet_transactions;
pub mod wallets;
pub mod withdrawal_challenges;
pub mod withdrawal_requests;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use disputes::Entity as Disputes;
pub use listing_comments::Entity as ListingComments;
pub use listing_likes::Entity as ListingLikes;
pub use listings::Entity as Listings;
pub use notifications::Entity as Notifications;
pub use offers::Entity as Offers;
pub use orders::Entity as Orders;
pub use platform_settings::Entity as PlatformSettings;
pub use users::Entity as Users;
pub use wallet_transactions::Entity as WalletTransactions;
pub use wallets::Entity as Wallets;
pub use withdrawal_challenges::Entity as WithdrawalChallenges;
pub use withdrawal_requests::Entity as WithdrawalRequests;
