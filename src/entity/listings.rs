use sea_orm::entity::prelude::*;

use super::enums::ListingStatus;
use crate::models::ImageList;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub category: String,
    pub price: i64,
    pub condition: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub images: ImageList,
    pub status: ListingStatus,
    pub views: i64,
    pub sold_to: Option<Uuid>,
    pub sold_at: Option<DateTimeWithTimeZone>,
    pub removed_reason: Option<String>,
    /// Optimistic-concurrency token; bumped on every lifecycle change.
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::SellerId",
        to = "super::users::Column::Id"
    )]
    Seller,
    #[sea_orm(has_many = "super::offers::Entity")]
    Offers,
    #[sea_orm(has_many = "super::listing_likes::Entity")]
    Likes,
    #[sea_orm(has_many = "super::listing_comments::Entity")]
    Comments,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl Related<super::offers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offers.def()
    }
}

impl Related<super::listing_likes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::listing_comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
