//! SeaORM entities for the tracker's tables.
//!
//! Relationships are plain foreign-key columns; cross-entity lookups go
//! through the repositories rather than embedded back-references.

pub mod item;
pub mod item_tag;
pub mod tag;
pub mod user;

pub mod prelude {
    pub use super::user::Entity as User;
    pub use super::user::Model as UserModel;

    pub use super::item::Entity as Item;
    pub use super::item::Model as ItemModel;

    pub use super::tag::Entity as Tag;
    pub use super::tag::Model as TagModel;

    pub use super::item_tag::Entity as ItemTag;
    pub use super::item_tag::Model as ItemTagModel;
}
