//! Data access for users, items and tags.
//!
//! Each repository is a stateless set of associated functions generic over
//! `ConnectionTrait`, so the same call works on the pooled connection or
//! inside a transaction handed out by `SessionManager::unit_of_work`.
//! Every item and tag operation is scoped to an owning user; rows owned by
//! someone else behave exactly like rows that do not exist.

pub mod item_repository;
pub mod tag_repository;
pub mod user_repository;

pub use item_repository::ItemRepository;
pub use tag_repository::TagRepository;
pub use user_repository::UserRepository;
