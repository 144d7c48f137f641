use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;

use crate::db::entities::{item, tag};
use crate::db::enums::{ItemKind, ItemPriority, ItemStatus};

/// An item together with the tags currently attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemWithTags {
    #[serde(flatten)]
    pub item: item::Model,
    pub tags: Vec<tag::Model>,
}

impl ItemWithTags {
    pub fn tag_ids(&self) -> Vec<i32> {
        self.tags.iter().map(|t| t.id).collect()
    }
}

/// Fields for a new item. Unset status/priority take the model defaults.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub title: String,
    pub kind: ItemKind,
    pub status: Option<ItemStatus>,
    pub priority: Option<ItemPriority>,
    pub notes: Option<String>,
    pub tag_ids: Option<Vec<i32>>,
}

impl NewItem {
    pub fn new(title: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            title: title.into(),
            kind,
            status: None,
            priority: None,
            notes: None,
            tag_ids: None,
        }
    }
}

/// Partial item update; `None` leaves a field untouched.
/// `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub title: Option<String>,
    pub kind: Option<ItemKind>,
    pub status: Option<ItemStatus>,
    pub priority: Option<ItemPriority>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub display_name: Option<Option<String>>,
}

/// Optional predicates for item listing. Every field that is set narrows
/// the result; unset fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub status: Option<ItemStatus>,
    pub kind: Option<ItemKind>,
    pub priority: Option<ItemPriority>,
    pub title_contains: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub tags_any: Option<Vec<i32>>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseSortError {
    #[error("Unknown sort field: {0}")]
    Field(String),
    #[error("Unknown sort direction: {0}")]
    Direction(String),
}

/// Columns an item listing can be ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemSortField {
    Id,
    UserId,
    Title,
    Kind,
    Status,
    Priority,
    Notes,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl ItemSortField {
    pub fn column(self) -> item::Column {
        match self {
            ItemSortField::Id => item::Column::Id,
            ItemSortField::UserId => item::Column::UserId,
            ItemSortField::Title => item::Column::Title,
            ItemSortField::Kind => item::Column::Kind,
            ItemSortField::Status => item::Column::Status,
            ItemSortField::Priority => item::Column::Priority,
            ItemSortField::Notes => item::Column::Notes,
            ItemSortField::CreatedAt => item::Column::CreatedAt,
            ItemSortField::UpdatedAt => item::Column::UpdatedAt,
        }
    }
}

impl FromStr for ItemSortField {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(ItemSortField::Id),
            "user_id" => Ok(ItemSortField::UserId),
            "title" => Ok(ItemSortField::Title),
            "kind" => Ok(ItemSortField::Kind),
            "status" => Ok(ItemSortField::Status),
            "priority" => Ok(ItemSortField::Priority),
            "notes" => Ok(ItemSortField::Notes),
            "created_at" => Ok(ItemSortField::CreatedAt),
            "updated_at" => Ok(ItemSortField::UpdatedAt),
            other => Err(ParseSortError::Field(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ParseSortError::Direction(s.to_string())),
        }
    }
}

impl From<SortDirection> for sea_orm::Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => sea_orm::Order::Asc,
            SortDirection::Desc => sea_orm::Order::Desc,
        }
    }
}

/// Defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemSort {
    pub field: ItemSortField,
    pub direction: SortDirection,
}

impl ItemSort {
    pub fn new(field: ItemSortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u64 = 20;

    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}
