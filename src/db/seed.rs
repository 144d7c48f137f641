use chrono::Duration;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, EntityTrait, Set};
use std::collections::HashMap;
use tracing::info;

use crate::db::entities::prelude::ItemTag;
use crate::db::entities::{item, item_tag, tag, user};
use crate::db::enums::{ItemKind, ItemPriority, ItemStatus};
use crate::db::error::StorageError;
use crate::db::repositories::UserRepository;
use crate::db::session::SessionManager;
use crate::db::timestamp_now;

struct SeedUser {
    email: &'static str,
    display_name: &'static str,
    tags: [&'static str; 3],
}

struct SeedItem {
    owner: &'static str,
    title: &'static str,
    kind: ItemKind,
    status: ItemStatus,
    priority: ItemPriority,
    notes: Option<&'static str>,
    age: Duration,
    tags: &'static [&'static str],
}

const USERS: [SeedUser; 2] = [
    SeedUser {
        email: "alice@example.com",
        display_name: "Alice",
        tags: ["reading", "fiction", "science"],
    },
    SeedUser {
        email: "bob@example.com",
        display_name: "Bob",
        tags: ["business", "history", "tech"],
    },
];

fn items() -> [SeedItem; 6] {
    [
        SeedItem {
            owner: "alice@example.com",
            title: "The Martian",
            kind: ItemKind::Book,
            status: ItemStatus::Reading,
            priority: ItemPriority::High,
            notes: Some("Great sci-fi novel."),
            age: Duration::days(5),
            tags: &["fiction", "science"],
        },
        SeedItem {
            owner: "alice@example.com",
            title: "Python Cookbook",
            kind: ItemKind::Book,
            status: ItemStatus::Planned,
            priority: ItemPriority::Normal,
            notes: Some("Must read for deeper Python knowledge."),
            age: Duration::days(2),
            tags: &["science"],
        },
        SeedItem {
            owner: "alice@example.com",
            title: "Tech News Digest",
            kind: ItemKind::Article,
            status: ItemStatus::Done,
            priority: ItemPriority::Low,
            notes: None,
            age: Duration::days(1),
            tags: &["reading"],
        },
        SeedItem {
            owner: "bob@example.com",
            title: "Business Strategy 2025",
            kind: ItemKind::Article,
            status: ItemStatus::Planned,
            priority: ItemPriority::High,
            notes: Some("Long read."),
            age: Duration::days(3),
            tags: &["business"],
        },
        SeedItem {
            owner: "bob@example.com",
            title: "History of Roman Empire",
            kind: ItemKind::Book,
            status: ItemStatus::Reading,
            priority: ItemPriority::Normal,
            notes: Some("Very interesting."),
            age: Duration::days(7),
            tags: &["history"],
        },
        SeedItem {
            owner: "bob@example.com",
            title: "AI Trends in 2025",
            kind: ItemKind::Article,
            status: ItemStatus::Done,
            priority: ItemPriority::High,
            notes: None,
            age: Duration::hours(12),
            tags: &["tech"],
        },
    ]
}

/// Loads the demo users, tags and items in a single unit of work.
///
/// Returns `false` without writing anything when any user already exists.
pub async fn run_seed(session: &SessionManager) -> Result<bool, StorageError> {
    let seeded = session
        .unit_of_work(|txn| Box::pin(async move { seed_empty_database(txn).await }))
        .await?;

    if seeded {
        info!("Seed data inserted.");
    } else {
        info!("Database already has users; skipping seed.");
    }
    Ok(seeded)
}

async fn seed_empty_database(txn: &DatabaseTransaction) -> Result<bool, StorageError> {
    if UserRepository::count(txn).await? > 0 {
        return Ok(false);
    }

    let now = timestamp_now();
    let mut user_ids: HashMap<&str, i32> = HashMap::new();
    let mut tag_ids: HashMap<(&str, &str), i32> = HashMap::new();

    for seed in &USERS {
        let user = user::ActiveModel {
            email: Set(seed.email.to_owned()),
            display_name: Set(Some(seed.display_name.to_owned())),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        user_ids.insert(seed.email, user.id);

        for name in seed.tags {
            let tag = tag::ActiveModel {
                user_id: Set(user.id),
                name: Set(name.to_owned()),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            tag_ids.insert((seed.email, name), tag.id);
        }
    }

    for seed in items() {
        let owner_id = user_ids[seed.owner];
        let item = item::ActiveModel {
            user_id: Set(owner_id),
            title: Set(seed.title.to_owned()),
            kind: Set(seed.kind),
            status: Set(seed.status),
            priority: Set(seed.priority),
            notes: Set(seed.notes.map(str::to_owned)),
            created_at: Set(now - seed.age),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        let links = seed.tags.iter().map(|name| item_tag::ActiveModel {
            item_id: Set(item.id),
            tag_id: Set(tag_ids[&(seed.owner, *name)]),
        });
        ItemTag::insert_many(links).exec_without_returning(txn).await?;
    }

    Ok(true)
}
