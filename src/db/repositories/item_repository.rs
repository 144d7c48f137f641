use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    LoaderTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use tracing::debug;

use crate::db::entities::prelude::{Item, ItemTag, Tag};
use crate::db::entities::{item, item_tag, tag};
use crate::db::error::StorageError;
use crate::db::models::{
    ItemChanges, ItemFilter, ItemSort, ItemSortField, ItemWithTags, NewItem, Pagination,
};
use crate::db::repositories::TagRepository;
use crate::db::timestamp_now;

const MAX_BIND_INT: u64 = i64::MAX as u64;

pub struct ItemRepository;

impl ItemRepository {
    /// Inserts a new item owned by `user_id`. Any `tag_ids` are filtered to
    /// the user's own tags before being attached.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        new_item: NewItem,
    ) -> Result<ItemWithTags, StorageError> {
        let now = timestamp_now();
        let model = item::ActiveModel {
            user_id: Set(user_id),
            title: Set(new_item.title),
            kind: Set(new_item.kind),
            status: Set(new_item.status.unwrap_or_default()),
            priority: Set(new_item.priority.unwrap_or_default()),
            notes: Set(new_item.notes),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let tags = match new_item.tag_ids {
            Some(tag_ids) => Self::replace_tags(db, model.id, user_id, &tag_ids).await?,
            None => Vec::new(),
        };

        debug!(item_id = model.id, user_id, tag_count = tags.len(), "Item created.");
        Ok(ItemWithTags { item: model, tags })
    }

    /// Missing and foreign-owned items are both `None`.
    pub async fn get<C: ConnectionTrait>(
        db: &C,
        item_id: i32,
        user_id: i32,
    ) -> Result<Option<ItemWithTags>, StorageError> {
        let Some(model) = Self::find_owned(db, item_id, user_id).await? else {
            return Ok(None);
        };
        let tags = Self::tags_of(db, &model).await?;
        Ok(Some(ItemWithTags { item: model, tags }))
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        filter: &ItemFilter,
        sort: ItemSort,
        page: Pagination,
    ) -> Result<Vec<ItemWithTags>, StorageError> {
        // Bound parameters are signed 64-bit; no row sits past that offset.
        if page.offset > MAX_BIND_INT {
            return Ok(Vec::new());
        }

        let mut query =
            Self::filtered(user_id, filter).order_by(sort.field.column(), sort.direction.into());
        if sort.field != ItemSortField::Id {
            // Tiebreak so equal sort keys page deterministically.
            query = query.order_by(item::Column::Id, sort.direction.into());
        }

        let items = query
            .limit(page.limit.min(MAX_BIND_INT))
            .offset(page.offset)
            .all(db)
            .await?;

        Self::attach_tags(db, items).await
    }

    /// Applies `changes` and, when `tag_ids` is `Some`, replaces the item's
    /// tags with the subset of `tag_ids` owned by `user_id`. `updated_at`
    /// always moves forward, even for an empty change set.
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        item_id: i32,
        user_id: i32,
        changes: ItemChanges,
        tag_ids: Option<Vec<i32>>,
    ) -> Result<Option<ItemWithTags>, StorageError> {
        let Some(existing) = Self::find_owned(db, item_id, user_id).await? else {
            return Ok(None);
        };
        let previous_update = existing.updated_at;

        let mut active = existing.into_active_model();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(kind) = changes.kind {
            active.kind = Set(kind);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(priority) = changes.priority {
            active.priority = Set(priority);
        }
        if let Some(notes) = changes.notes {
            active.notes = Set(notes);
        }
        active.updated_at = Set(next_update_stamp(previous_update));

        let model = match Item::update(active)
            .filter(item::Column::UserId.eq(user_id))
            .exec(db)
            .await
        {
            Ok(model) => model,
            // Removed between the lookup and the write.
            Err(DbErr::RecordNotUpdated) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let tags = match tag_ids {
            Some(tag_ids) => Self::replace_tags(db, model.id, user_id, &tag_ids).await?,
            None => Self::tags_of(db, &model).await?,
        };

        Ok(Some(ItemWithTags { item: model, tags }))
    }

    /// Replaces the whole tag set of an item. Same ownership filtering as
    /// [`ItemRepository::update`].
    pub async fn update_tags<C: ConnectionTrait>(
        db: &C,
        item_id: i32,
        user_id: i32,
        tag_ids: &[i32],
    ) -> Result<Option<ItemWithTags>, StorageError> {
        Self::update(db, item_id, user_id, ItemChanges::default(), Some(tag_ids.to_vec())).await
    }

    /// Returns whether a row was removed; deleting twice reports `false`.
    pub async fn delete<C: ConnectionTrait>(
        db: &C,
        item_id: i32,
        user_id: i32,
    ) -> Result<bool, StorageError> {
        let result = Item::delete_many()
            .filter(item::Column::Id.eq(item_id))
            .filter(item::Column::UserId.eq(user_id))
            .exec(db)
            .await?;
        if result.rows_affected > 0 {
            debug!(item_id, user_id, "Item deleted.");
        }
        Ok(result.rows_affected > 0)
    }

    async fn find_owned<C: ConnectionTrait>(
        db: &C,
        item_id: i32,
        user_id: i32,
    ) -> Result<Option<item::Model>, StorageError> {
        Ok(Item::find_by_id(item_id)
            .filter(item::Column::UserId.eq(user_id))
            .one(db)
            .await?)
    }

    /// Ownership-scoped base query with every active filter attached.
    fn filtered(user_id: i32, filter: &ItemFilter) -> Select<item::Entity> {
        let mut query = Item::find().filter(item::Column::UserId.eq(user_id));

        if let Some(status) = filter.status {
            query = query.filter(item::Column::Status.eq(status));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(item::Column::Kind.eq(kind));
        }
        if let Some(priority) = filter.priority {
            query = query.filter(item::Column::Priority.eq(priority));
        }
        if let Some(needle) = filter.title_contains.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((Item, item::Column::Title))))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }
        if let Some(from) = filter.created_from {
            query = query.filter(item::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(item::Column::CreatedAt.lte(to));
        }
        if let Some(tag_ids) = filter.tags_any.as_ref().filter(|ids| !ids.is_empty()) {
            // A subquery rather than a join, so an item matching several
            // tags still comes back once.
            query = query.filter(
                item::Column::Id.in_subquery(
                    Query::select()
                        .column(item_tag::Column::ItemId)
                        .from(ItemTag)
                        .and_where(item_tag::Column::TagId.is_in(tag_ids.iter().copied()))
                        .to_owned(),
                ),
            );
        }

        query
    }

    async fn tags_of<C: ConnectionTrait>(
        db: &C,
        model: &item::Model,
    ) -> Result<Vec<tag::Model>, StorageError> {
        Ok(model
            .find_related(Tag)
            .order_by_asc(tag::Column::Id)
            .all(db)
            .await?)
    }

    /// Loads the tags of a whole page in one round trip through the join.
    async fn attach_tags<C: ConnectionTrait>(
        db: &C,
        items: Vec<item::Model>,
    ) -> Result<Vec<ItemWithTags>, StorageError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let tag_sets = items.load_many_to_many(Tag, ItemTag, db).await?;

        Ok(items
            .into_iter()
            .zip(tag_sets)
            .map(|(item, mut tags)| {
                tags.sort_by_key(|t| t.id);
                ItemWithTags { item, tags }
            })
            .collect())
    }

    async fn replace_tags<C: ConnectionTrait>(
        db: &C,
        item_id: i32,
        user_id: i32,
        tag_ids: &[i32],
    ) -> Result<Vec<tag::Model>, StorageError> {
        let owned = TagRepository::find_owned(db, user_id, tag_ids).await?;
        if owned.len() < tag_ids.len() {
            debug!(
                item_id,
                user_id,
                requested = tag_ids.len(),
                kept = owned.len(),
                "Dropped tag ids that are not owned by the user."
            );
        }

        ItemTag::delete_many()
            .filter(item_tag::Column::ItemId.eq(item_id))
            .exec(db)
            .await?;

        if !owned.is_empty() {
            let links = owned.iter().map(|t| item_tag::ActiveModel {
                item_id: Set(item_id),
                tag_id: Set(t.id),
            });
            ItemTag::insert_many(links).exec_without_returning(db).await?;
        }

        Ok(owned)
    }
}

/// `updated_at` for a mutation: now, or one microsecond past the previous
/// stamp when the clock has not moved on at storage precision.
fn next_update_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = timestamp_now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
