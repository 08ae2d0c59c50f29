#![allow(dead_code)]

use async_trait::async_trait;
use crudlink::{Finder, HasRelations, RelationAccessor, SyncChanges};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement};
use std::sync::{Arc, Mutex};

pub mod article_entity;

// ===== TRACING =====

/// Route crate logs to the test harness; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

// ===== SQLITE SETUP =====

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    db.execute_unprepared(
        "CREATE TABLE articles (
            id INTEGER PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL
        )",
    )
    .await?;
    db.execute_unprepared(
        "CREATE TABLE tags (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        )",
    )
    .await?;
    db.execute_unprepared(
        "CREATE TABLE article_tag (
            article_id INTEGER NOT NULL REFERENCES articles (id),
            tag_id INTEGER NOT NULL REFERENCES tags (id),
            PRIMARY KEY (article_id, tag_id)
        )",
    )
    .await?;

    db.execute_unprepared(
        "INSERT INTO articles (id, title, body) VALUES (1, 'First', 'Hello'), (2, 'Second', 'World')",
    )
    .await?;
    db.execute_unprepared(
        "INSERT INTO tags (id, name) VALUES (1, 'rust'), (2, 'orm'), (3, 'axum'), (4, 'sqlite')",
    )
    .await?;

    Ok(db)
}

pub async fn pivot_rows(db: &DatabaseConnection, article_id: i32) -> Vec<i32> {
    let rows = db
        .query_all(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT tag_id FROM article_tag WHERE article_id = ? ORDER BY tag_id",
            [article_id.into()],
        ))
        .await
        .expect("Failed to read pivot rows");
    rows.iter()
        .map(|row| row.try_get::<i32>("", "tag_id").expect("tag_id column"))
        .collect()
}

// ===== SPY COLLABORATORS =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Attach(String, Vec<i64>),
    Detach(String, Vec<i64>),
    Sync(String, Vec<i64>),
}

/// Records every relation call and can be told to fail or what sync returns
#[derive(Clone, Default)]
pub struct Spy {
    calls: Arc<Mutex<Vec<Call>>>,
    lookups: Arc<Mutex<Vec<i64>>>,
    failure: Option<String>,
    sync_changes: SyncChanges<i64>,
}

impl Spy {
    pub fn new() -> Self {
        init_tracing();
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        init_tracing();
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_sync_changes(attached: Vec<i64>, detached: Vec<i64>) -> Self {
        Self {
            sync_changes: SyncChanges { attached, detached },
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<i64> {
        self.lookups.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), DbErr> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(message) => Err(DbErr::Custom(message.clone())),
            None => Ok(()),
        }
    }

    /// Finder resolving only the given ids, each exposing a `tags` relation
    pub fn finder(&self, ids: &[i64]) -> SpyFinder {
        SpyFinder {
            spy: self.clone(),
            ids: ids.to_vec(),
        }
    }
}

pub struct SpyFinder {
    spy: Spy,
    ids: Vec<i64>,
}

#[async_trait]
impl Finder<i64, i64> for SpyFinder {
    async fn find(&self, id: &i64) -> Result<Option<Box<dyn HasRelations<i64>>>, DbErr> {
        self.spy.lookups.lock().unwrap().push(*id);
        if self.ids.contains(id) {
            Ok(Some(Box::new(SpyEntity {
                spy: self.spy.clone(),
            })))
        } else {
            Ok(None)
        }
    }
}

/// Finder whose lookup itself fails
pub struct BrokenFinder;

#[async_trait]
impl Finder<i64, i64> for BrokenFinder {
    async fn find(&self, _id: &i64) -> Result<Option<Box<dyn HasRelations<i64>>>, DbErr> {
        Err(DbErr::Custom("connection reset".to_string()))
    }
}

pub struct SpyEntity {
    spy: Spy,
}

impl HasRelations<i64> for SpyEntity {
    fn relation(&self, name: &str) -> Option<Box<dyn RelationAccessor<i64> + '_>> {
        (name == "tags").then(|| {
            Box::new(SpyRelation {
                spy: &self.spy,
                name: name.to_string(),
            }) as Box<dyn RelationAccessor<i64> + '_>
        })
    }
}

struct SpyRelation<'a> {
    spy: &'a Spy,
    name: String,
}

#[async_trait]
impl RelationAccessor<i64> for SpyRelation<'_> {
    async fn attach(&self, ids: &[i64]) -> Result<(), DbErr> {
        self.spy.record(Call::Attach(self.name.clone(), ids.to_vec()))
    }

    async fn detach(&self, ids: &[i64]) -> Result<(), DbErr> {
        self.spy.record(Call::Detach(self.name.clone(), ids.to_vec()))
    }

    async fn sync(&self, ids: &[i64]) -> Result<SyncChanges<i64>, DbErr> {
        self.spy.record(Call::Sync(self.name.clone(), ids.to_vec()))?;
        Ok(self.spy.sync_changes.clone())
    }
}
