use async_trait::async_trait;
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};

/// Storage-native outcome of a sync: what the storage layer attached and detached.
///
/// Callers never see these names; the linker maps them to
/// [`SyncResult`](crate::SyncResult) before returning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChanges<R> {
    pub attached: Vec<R>,
    pub detached: Vec<R>,
}

impl<R> Default for SyncChanges<R> {
    fn default() -> Self {
        Self {
            attached: Vec::new(),
            detached: Vec::new(),
        }
    }
}

/// Mutates one many-to-many relation of one entity
#[async_trait]
pub trait RelationAccessor<R>: Send + Sync
where
    R: Send + Sync,
{
    /// Associate every id in `ids` with the entity
    ///
    /// # Errors
    /// Any storage failure, e.g. a referenced id that does not exist.
    async fn attach(&self, ids: &[R]) -> Result<(), DbErr>;

    /// Dissociate every id in `ids` from the entity
    ///
    /// # Errors
    /// Any storage failure.
    async fn detach(&self, ids: &[R]) -> Result<(), DbErr>;

    /// Make the associated set equal to `ids`
    ///
    /// # Errors
    /// Any storage failure.
    async fn sync(&self, ids: &[R]) -> Result<SyncChanges<R>, DbErr>;
}

/// Capability of an entity to hand out its named relations
pub trait HasRelations<R>: Send + Sync
where
    R: Send + Sync,
{
    /// Accessor for relation `name`, or `None` when the entity has no such relation
    fn relation(&self, name: &str) -> Option<Box<dyn RelationAccessor<R> + '_>>;
}

/// Resolves a primary key to an entity exposing relations
///
/// The linker keeps one finder per operation so attach, detach and sync can
/// each look up a different model.
#[async_trait]
pub trait Finder<I, R>: Send + Sync
where
    I: Send + Sync,
    R: Send + Sync,
{
    /// # Errors
    /// Storage failure during lookup. A missing row is `Ok(None)`.
    async fn find(&self, id: &I) -> Result<Option<Box<dyn HasRelations<R>>>, DbErr>;
}
