use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, Schema,
    TransactionTrait,
};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::entities::{prelude::*, tag};
use crate::db::error::StorageError;

/// Pool settings. `pool_size + max_overflow` bounds the number of open
/// connections; a checkout that waits longer than `acquire_timeout_secs`
/// fails with a storage error.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub max_overflow: u32,
    pub acquire_timeout_secs: u64,
    pub sql_logging: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: 10,
            max_overflow: 20,
            acquire_timeout_secs: 30,
            sql_logging: false,
        }
    }

    pub fn max_connections(&self) -> u32 {
        self.pool_size.saturating_add(self.max_overflow).max(1)
    }
}

/// Boxed future handed back by a unit-of-work closure.
pub type WorkFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'c>>;

/// Owns the process-wide connection pool.
///
/// Built once at startup and shared by `Arc`; every request runs its
/// storage work through [`SessionManager::unit_of_work`].
#[derive(Clone, Debug)]
pub struct SessionManager {
    conn: DatabaseConnection,
}

impl SessionManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let mut opt = ConnectOptions::new(config.url.to_owned());
        opt.max_connections(config.max_connections())
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .sqlx_logging(config.sql_logging);

        let conn = Database::connect(opt).await?;
        info!(
            backend = ?conn.get_database_backend(),
            max_connections = config.max_connections(),
            "Database connection pool created."
        );
        Ok(Self { conn })
    }

    /// The shared pooled connection, for work that needs no transaction.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Starts an explicit transaction. Dropping it without `commit()`
    /// rolls it back and returns the connection to the pool.
    pub async fn begin(&self) -> Result<DatabaseTransaction, StorageError> {
        Ok(self.conn.begin().await?)
    }

    /// Runs `work` as one transactional unit.
    ///
    /// `Ok` commits, `Err` rolls back and is returned unchanged. The
    /// connection is released on every exit path.
    pub async fn unit_of_work<F, T>(&self, work: F) -> Result<T, StorageError>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> WorkFuture<'c, T> + Send,
        T: Send,
    {
        self.conn
            .transaction::<F, T, StorageError>(work)
            .await
            .map_err(|err| {
                let err = StorageError::from(err);
                warn!(error = %err, "Unit of work failed; transaction rolled back.");
                err
            })
    }

    /// Creates any missing tables and the per-user tag name index.
    pub async fn create_schema(&self) -> Result<(), StorageError> {
        self.unit_of_work(|txn| {
            Box::pin(async move {
                let backend = txn.get_database_backend();
                let schema = Schema::new(backend);

                // Parents first so foreign keys resolve.
                let mut tables = [
                    schema.create_table_from_entity(User),
                    schema.create_table_from_entity(Tag),
                    schema.create_table_from_entity(Item),
                    schema.create_table_from_entity(ItemTag),
                ];
                for table in tables.iter_mut() {
                    table.if_not_exists();
                    txn.execute(backend.build(&*table)).await?;
                }

                let tag_name_index = Index::create()
                    .if_not_exists()
                    .name("idx_tags_user_id_name")
                    .table(Tag)
                    .col(tag::Column::UserId)
                    .col(tag::Column::Name)
                    .unique()
                    .to_owned();
                txn.execute(backend.build(&tag_name_index)).await?;

                Ok(())
            })
        })
        .await?;

        info!("Database schema is in place.");
        Ok(())
    }

    /// Closes every pooled connection. Called once at process teardown.
    pub async fn shutdown(&self) -> Result<(), StorageError> {
        self.conn.clone().close().await?;
        info!("Database connection pool closed.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entities::user;
    use crate::db::test_support::memory_session;
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    fn new_user(email: &str) -> user::ActiveModel {
        user::ActiveModel {
            email: Set(email.to_owned()),
            display_name: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_schema_is_idempotent() {
        let session = memory_session().await;
        session.create_schema().await.unwrap();
        session.create_schema().await.unwrap();
    }

    #[tokio::test]
    async fn unit_of_work_commits_on_success() {
        let session = memory_session().await;

        let id = session
            .unit_of_work(|txn| {
                Box::pin(async move { Ok(new_user("a@example.com").insert(txn).await?.id) })
            })
            .await
            .unwrap();

        let found = User::find_by_id(id).one(session.connection()).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn unit_of_work_rolls_back_on_error() {
        let session = memory_session().await;

        let result: Result<(), StorageError> = session
            .unit_of_work(|txn| {
                Box::pin(async move {
                    new_user("a@example.com").insert(txn).await?;
                    // Second insert trips the unique email constraint.
                    new_user("a@example.com").insert(txn).await?;
                    Ok(())
                })
            })
            .await;

        assert!(result.unwrap_err().is_unique_violation());
        let count = User::find().count(session.connection()).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let session = memory_session().await;

        {
            let txn = session.begin().await.unwrap();
            new_user("b@example.com").insert(&txn).await.unwrap();
        }

        let count = User::find().count(session.connection()).await.unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn max_connections_includes_overflow() {
        let config = DatabaseConfig::new("sqlite::memory:");
        assert_eq!(config.max_connections(), 30);
    }

    #[test]
    fn max_connections_saturates() {
        let config = DatabaseConfig {
            pool_size: u32::MAX,
            max_overflow: u32::MAX,
            ..DatabaseConfig::new("sqlite::memory:")
        };
        assert_eq!(config.max_connections(), u32::MAX);

        let config = DatabaseConfig {
            pool_size: 0,
            max_overflow: 0,
            ..DatabaseConfig::new("sqlite::memory:")
        };
        assert_eq!(config.max_connections(), 1);
    }
}
