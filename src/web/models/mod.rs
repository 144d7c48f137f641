use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::enums::{ItemKind, ItemPriority, ItemStatus};
use crate::db::models::{
    ItemChanges, ItemFilter, ItemSort, NewItem, NewUser, Pagination, UserChanges,
};
use crate::web::error::AppError;

/// Default page size for `GET /items`; larger than the repository default.
pub const DEFAULT_LIST_LIMIT: u64 = 50;
pub const MAX_LIST_LIMIT: u64 = 200;

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) for nullable patch fields.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn require_non_blank(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{field} must not be blank")));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let mut parts = email.split('@');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    );
    if !valid {
        return Err(AppError::InvalidInput(format!("Invalid email address: {email}")));
    }
    Ok(())
}

/// Caller identity for owner-scoped routes.
#[derive(Debug, Deserialize)]
pub struct UserScope {
    pub user_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: Option<String>,
}

impl CreateUserRequest {
    pub fn into_new_user(self) -> Result<NewUser, AppError> {
        validate_email(&self.email)?;
        Ok(NewUser {
            email: self.email,
            display_name: self.display_name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub display_name: Option<Option<String>>,
}

impl UpdateUserRequest {
    pub fn into_changes(self) -> Result<UserChanges, AppError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(UserChanges {
            email: self.email,
            display_name: self.display_name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

impl CreateTagRequest {
    pub fn validated_name(self) -> Result<String, AppError> {
        require_non_blank(&self.name, "Tag name")?;
        Ok(self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    pub kind: ItemKind,
    pub status: Option<ItemStatus>,
    pub priority: Option<ItemPriority>,
    pub notes: Option<String>,
    pub tag_ids: Option<Vec<i32>>,
}

impl CreateItemRequest {
    pub fn into_new_item(self) -> Result<NewItem, AppError> {
        require_non_blank(&self.title, "Title")?;
        Ok(NewItem {
            title: self.title,
            kind: self.kind,
            status: self.status,
            priority: self.priority,
            notes: self.notes,
            tag_ids: self.tag_ids,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub kind: Option<ItemKind>,
    pub status: Option<ItemStatus>,
    pub priority: Option<ItemPriority>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
    pub tag_ids: Option<Vec<i32>>,
}

impl UpdateItemRequest {
    pub fn into_changes(self) -> Result<(ItemChanges, Option<Vec<i32>>), AppError> {
        if let Some(title) = &self.title {
            require_non_blank(title, "Title")?;
        }
        let changes = ItemChanges {
            title: self.title,
            kind: self.kind,
            status: self.status,
            priority: self.priority,
            notes: self.notes,
        };
        Ok((changes, self.tag_ids))
    }
}

#[derive(Debug, Deserialize)]
pub struct ReplaceTagsRequest {
    pub tag_ids: Vec<i32>,
}

/// Query string of `GET /items`. `tags` may repeat.
#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub user_id: i32,
    pub status: Option<ItemStatus>,
    pub kind: Option<ItemKind>,
    pub priority: Option<ItemPriority>,
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<i32>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub order_by: Option<String>,
    pub direction: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ListItemsQuery {
    pub fn filter(&self) -> ItemFilter {
        ItemFilter {
            status: self.status,
            kind: self.kind,
            priority: self.priority,
            title_contains: self.title.clone(),
            created_from: self.created_from,
            created_to: self.created_to,
            tags_any: (!self.tags.is_empty()).then(|| self.tags.clone()),
        }
    }

    /// Fails on an unknown `order_by` or `direction`.
    pub fn sort(&self) -> Result<ItemSort, AppError> {
        let mut sort = ItemSort::default();
        if let Some(field) = &self.order_by {
            sort.field = field.parse()?;
        }
        if let Some(direction) = &self.direction {
            sort.direction = direction.parse()?;
        }
        Ok(sort)
    }

    /// Fails when `offset` does not fit a signed 64-bit SQL parameter.
    pub fn pagination(&self) -> Result<Pagination, AppError> {
        let offset = self.offset.unwrap_or(0);
        if i64::try_from(offset).is_err() {
            return Err(AppError::InvalidInput(format!(
                "offset must be at most {}",
                i64::MAX
            )));
        }
        let limit = self
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        Ok(Pagination::new(limit, offset))
    }
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ItemSortField, SortDirection};

    fn list_query(raw: &str) -> ListItemsQuery {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn email_needs_exactly_one_at_with_both_sides() {
        assert!(validate_email("alice@example.com").is_ok());
        for bad in ["alice", "@example.com", "alice@", "a@b@c"] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn notes_null_is_distinct_from_absent() {
        let cleared: UpdateItemRequest = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));

        let untouched: UpdateItemRequest = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        assert_eq!(untouched.notes, None);
    }

    #[test]
    fn blank_title_is_rejected() {
        let request = CreateItemRequest {
            title: "   ".to_string(),
            kind: ItemKind::Book,
            status: None,
            priority: None,
            notes: None,
            tag_ids: None,
        };
        assert!(matches!(request.into_new_item(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn list_query_defaults_and_clamping() {
        let query = list_query(r#"{"user_id": 1}"#);
        assert_eq!(query.pagination().unwrap(), Pagination::new(50, 0));
        assert_eq!(query.sort().unwrap(), ItemSort::default());
        assert!(query.filter().tags_any.is_none());

        let query = list_query(r#"{"user_id": 1, "limit": 10000, "offset": 5}"#);
        assert_eq!(query.pagination().unwrap(), Pagination::new(200, 5));
        let query = list_query(r#"{"user_id": 1, "limit": 0}"#);
        assert_eq!(query.pagination().unwrap().limit, 1);

        let query = list_query(r#"{"user_id": 1, "offset": 9223372036854775808}"#);
        assert!(matches!(query.pagination(), Err(AppError::InvalidInput(_))));
        let query = list_query(r#"{"user_id": 1, "offset": 9223372036854775807}"#);
        assert_eq!(query.pagination().unwrap().offset, i64::MAX as u64);
    }

    #[test]
    fn list_query_sort_parsing() {
        let query = list_query(r#"{"user_id": 1, "order_by": "title", "direction": "asc"}"#);
        assert_eq!(
            query.sort().unwrap(),
            ItemSort::new(ItemSortField::Title, SortDirection::Asc)
        );

        let query = list_query(r#"{"user_id": 1, "order_by": "hash"}"#);
        assert!(matches!(query.sort(), Err(AppError::InvalidInput(_))));
    }
}
