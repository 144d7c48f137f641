use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryOrder,
    Set,
};

use crate::db::entities::{prelude::User, user};
use crate::db::error::StorageError;
use crate::db::models::{NewUser, UserChanges};
use crate::db::timestamp_now;

pub struct UserRepository;

impl UserRepository {
    pub async fn get_by_id<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
    ) -> Result<Option<user::Model>, StorageError> {
        Ok(User::find_by_id(user_id).one(db).await?)
    }

    pub async fn get_all<C: ConnectionTrait>(db: &C) -> Result<Vec<user::Model>, StorageError> {
        Ok(User::find()
            .order_by_asc(user::Column::Id)
            .all(db)
            .await?)
    }

    pub async fn count<C: ConnectionTrait>(db: &C) -> Result<u64, StorageError> {
        Ok(User::find().count(db).await?)
    }

    /// Fails with `StorageError::UniqueViolation` when the email is taken.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        new_user: NewUser,
    ) -> Result<user::Model, StorageError> {
        let model = user::ActiveModel {
            email: Set(new_user.email),
            display_name: Set(new_user.display_name),
            created_at: Set(timestamp_now()),
            ..Default::default()
        };
        Ok(model.insert(db).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        changes: UserChanges,
    ) -> Result<Option<user::Model>, StorageError> {
        let Some(existing) = User::find_by_id(user_id).one(db).await? else {
            return Ok(None);
        };

        let mut active = existing.clone().into_active_model();
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(display_name) = changes.display_name {
            active.display_name = Set(display_name);
        }
        if !active.is_changed() {
            return Ok(Some(existing));
        }

        Ok(Some(active.update(db).await?))
    }

    /// Owned items and tags go with the user through `ON DELETE CASCADE`.
    pub async fn delete<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<bool, StorageError> {
        let result = User::delete_by_id(user_id).exec(db).await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_session;

    fn alice() -> NewUser {
        NewUser {
            email: "alice@example.com".to_string(),
            display_name: Some("Alice".to_string()),
        }
    }

    #[tokio::test]
    async fn create_and_fetch() {
        let session = memory_session().await;
        let db = session.connection();

        let created = UserRepository::create(db, alice()).await.unwrap();
        let fetched = UserRepository::get_by_id(db, created.id).await.unwrap();

        assert_eq!(fetched, Some(created));
        assert_eq!(UserRepository::count(db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let session = memory_session().await;
        let db = session.connection();

        UserRepository::create(db, alice()).await.unwrap();
        let err = UserRepository::create(db, alice()).await.unwrap_err();

        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn update_patches_only_given_fields() {
        let session = memory_session().await;
        let db = session.connection();
        let created = UserRepository::create(db, alice()).await.unwrap();

        let changes = UserChanges {
            display_name: Some(None),
            ..Default::default()
        };
        let updated = UserRepository::update(db, created.id, changes)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.email, "alice@example.com");
        assert_eq!(updated.display_name, None);
        assert_eq!(updated.created_at, created.created_at);

        let unchanged = UserRepository::update(db, created.id, UserChanges::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged, updated);
    }

    #[tokio::test]
    async fn update_and_delete_missing_user() {
        let session = memory_session().await;
        let db = session.connection();

        assert!(UserRepository::update(db, 42, UserChanges::default())
            .await
            .unwrap()
            .is_none());
        assert!(!UserRepository::delete(db, 42).await.unwrap());
    }

    #[tokio::test]
    async fn get_all_orders_by_id() {
        let session = memory_session().await;
        let db = session.connection();
        let first = UserRepository::create(db, alice()).await.unwrap();
        let second = UserRepository::create(
            db,
            NewUser {
                email: "bob@example.com".to_string(),
                display_name: None,
            },
        )
        .await
        .unwrap();

        let ids: Vec<i32> = UserRepository::get_all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
