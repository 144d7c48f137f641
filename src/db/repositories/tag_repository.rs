use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::entities::{prelude::Tag, tag};
use crate::db::error::StorageError;

pub struct TagRepository;

impl TagRepository {
    /// Fails with `StorageError::UniqueViolation` when the user already
    /// has a tag with this name.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        name: &str,
    ) -> Result<tag::Model, StorageError> {
        let new_tag = tag::ActiveModel {
            user_id: Set(user_id),
            name: Set(name.to_owned()),
            ..Default::default()
        };
        Ok(new_tag.insert(db).await?)
    }

    pub async fn get<C: ConnectionTrait>(
        db: &C,
        tag_id: i32,
        user_id: i32,
    ) -> Result<Option<tag::Model>, StorageError> {
        Ok(Tag::find_by_id(tag_id)
            .filter(tag::Column::UserId.eq(user_id))
            .one(db)
            .await?)
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
    ) -> Result<Vec<tag::Model>, StorageError> {
        Ok(Tag::find()
            .filter(tag::Column::UserId.eq(user_id))
            .order_by_asc(tag::Column::Name)
            .all(db)
            .await?)
    }

    /// Associations to items are removed by the join table's cascade.
    pub async fn delete<C: ConnectionTrait>(
        db: &C,
        tag_id: i32,
        user_id: i32,
    ) -> Result<bool, StorageError> {
        let result = Tag::delete_many()
            .filter(tag::Column::Id.eq(tag_id))
            .filter(tag::Column::UserId.eq(user_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// The tags among `tag_ids` that belong to `user_id`, ordered by id.
    /// Ids owned by other users, or by nobody, are dropped.
    pub async fn find_owned<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        tag_ids: &[i32],
    ) -> Result<Vec<tag::Model>, StorageError> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Tag::find()
            .filter(tag::Column::UserId.eq(user_id))
            .filter(tag::Column::Id.is_in(tag_ids.iter().copied()))
            .order_by_asc(tag::Column::Id)
            .all(db)
            .await?)
    }
}
