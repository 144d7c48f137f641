use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::{ItemKind, ItemPriority, ItemStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub kind: ItemKind,
    pub status: ItemStatus,
    pub priority: ItemPriority,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

// Many-to-many through `item_tags`.
impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::item_tag::Relation::Tag.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::item_tag::Relation::Item.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
