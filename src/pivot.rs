//! # Sea-ORM collaborators
//!
//! Default [`Finder`] and [`RelationAccessor`] implementations for entities
//! whose many-to-many relations live in plain pivot tables.
//!
//! ```rust,ignore
//! impl PivotRelations for article::Model {
//!     fn pivot(relation: &str) -> Option<Pivot> {
//!         match relation {
//!             "tags" => Some(Pivot::new("article_tag", "article_id", "tag_id")),
//!             _ => None,
//!         }
//!     }
//!
//!     fn pivot_key(&self) -> Value {
//!         self.id.into()
//!     }
//! }
//!
//! let linker: RelationLinker<i32, i32> =
//!     RelationLinker::new(EntityFinder::<article::Entity>::new(db));
//! ```

use crate::traits::{Finder, HasRelations, RelationAccessor, SyncChanges};
use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Query, SimpleExpr};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PrimaryKeyTrait, Statement,
    StatementBuilder, TransactionTrait, TryGetable, Value,
};
use std::marker::PhantomData;

/// Related id types the pivot adapter can bind and read back
pub trait PivotKey: Clone + PartialEq + Into<Value> + TryGetable + Send + Sync + 'static {}

impl<T> PivotKey for T where
    T: Clone + PartialEq + Into<Value> + TryGetable + Send + Sync + 'static
{
}

/// Location of one many-to-many relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pivot {
    /// Join table name
    pub table: &'static str,
    /// Column referencing the owning entity
    pub foreign_key: &'static str,
    /// Column referencing the related entity
    pub related_key: &'static str,
}

impl Pivot {
    #[must_use]
    pub const fn new(
        table: &'static str,
        foreign_key: &'static str,
        related_key: &'static str,
    ) -> Self {
        Self {
            table,
            foreign_key,
            related_key,
        }
    }
}

/// Declares which relations of a model are stored in pivot tables
pub trait PivotRelations {
    /// Pivot for relation `name`, `None` if the model has no such relation
    fn pivot(name: &str) -> Option<Pivot>;

    /// Value stored in the pivot's foreign key column for this row
    fn pivot_key(&self) -> Value;
}

/// A model fetched from the database, paired with the connection it came from
#[derive(Debug, Clone)]
pub struct Stored<M> {
    pub model: M,
    db: DatabaseConnection,
}

impl<M> Stored<M> {
    #[must_use]
    pub fn new(model: M, db: DatabaseConnection) -> Self {
        Self { model, db }
    }
}

impl<M, R> HasRelations<R> for Stored<M>
where
    M: PivotRelations + Send + Sync,
    R: PivotKey,
{
    fn relation(&self, name: &str) -> Option<Box<dyn RelationAccessor<R> + '_>> {
        let pivot = M::pivot(name)?;
        Some(Box::new(PivotRelation::new(
            &self.db,
            pivot,
            self.model.pivot_key(),
        )))
    }
}

/// Finds rows of entity `E` by primary key
pub struct EntityFinder<E> {
    db: DatabaseConnection,
    _entity: PhantomData<fn() -> E>,
}

impl<E> EntityFinder<E> {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E, I, R> Finder<I, R> for EntityFinder<E>
where
    E: EntityTrait,
    E::Model: PivotRelations + Sync,
    I: Clone + Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType> + Send + Sync,
    R: PivotKey,
{
    async fn find(&self, id: &I) -> Result<Option<Box<dyn HasRelations<R>>>, DbErr> {
        let model = E::find_by_id(id.clone()).one(&self.db).await?;
        Ok(model.map(|model| {
            Box::new(Stored::new(model, self.db.clone())) as Box<dyn HasRelations<R>>
        }))
    }
}

/// Attach / detach / sync against one owner's rows in a pivot table
pub struct PivotRelation<'a, R> {
    db: &'a DatabaseConnection,
    pivot: Pivot,
    owner: Value,
    _related: PhantomData<fn() -> R>,
}

impl<'a, R: PivotKey> PivotRelation<'a, R> {
    #[must_use]
    pub fn new(db: &'a DatabaseConnection, pivot: Pivot, owner: Value) -> Self {
        Self {
            db,
            pivot,
            owner,
            _related: PhantomData,
        }
    }

    /// Ids currently associated with the owner
    ///
    /// # Errors
    /// Any database error from the select.
    pub async fn current(&self) -> Result<Vec<R>, DbErr> {
        self.current_on(self.db).await
    }

    async fn current_on<C: ConnectionTrait>(&self, conn: &C) -> Result<Vec<R>, DbErr> {
        let mut select = Query::select();
        select
            .column(Alias::new(self.pivot.related_key))
            .from(Alias::new(self.pivot.table))
            .and_where(Expr::col(Alias::new(self.pivot.foreign_key)).eq(self.owner.clone()));

        let rows = conn.query_all(build(conn, &select)).await?;
        rows.iter()
            .map(|row| row.try_get::<R>("", self.pivot.related_key))
            .collect()
    }

    async fn attach_on<C: ConnectionTrait>(&self, conn: &C, ids: &[R]) -> Result<(), DbErr> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(self.pivot.table))
            .columns([
                Alias::new(self.pivot.foreign_key),
                Alias::new(self.pivot.related_key),
            ]);
        for id in ids {
            insert.values_panic([
                SimpleExpr::Value(self.owner.clone()),
                SimpleExpr::Value(id.clone().into()),
            ]);
        }

        conn.execute(build(conn, &insert)).await?;
        Ok(())
    }

    async fn detach_on<C: ConnectionTrait>(&self, conn: &C, ids: &[R]) -> Result<(), DbErr> {
        // An empty list never widens into "detach everything"
        if ids.is_empty() {
            return Ok(());
        }

        let mut delete = Query::delete();
        delete
            .from_table(Alias::new(self.pivot.table))
            .and_where(Expr::col(Alias::new(self.pivot.foreign_key)).eq(self.owner.clone()))
            .and_where(
                Expr::col(Alias::new(self.pivot.related_key))
                    .is_in(ids.iter().cloned().map(Into::<Value>::into)),
            );

        conn.execute(build(conn, &delete)).await?;
        Ok(())
    }
}

fn build<C: ConnectionTrait, S: StatementBuilder>(conn: &C, statement: &S) -> Statement {
    conn.get_database_backend().build(statement)
}

#[async_trait]
impl<R: PivotKey> RelationAccessor<R> for PivotRelation<'_, R> {
    async fn attach(&self, ids: &[R]) -> Result<(), DbErr> {
        self.attach_on(self.db, ids).await
    }

    async fn detach(&self, ids: &[R]) -> Result<(), DbErr> {
        self.detach_on(self.db, ids).await
    }

    /// Runs in one transaction; a rejected id leaves the pivot untouched
    async fn sync(&self, ids: &[R]) -> Result<SyncChanges<R>, DbErr> {
        let txn = self.db.begin().await?;
        let current = self.current_on(&txn).await?;

        let mut wanted: Vec<R> = Vec::with_capacity(ids.len());
        for id in ids {
            if !wanted.contains(id) {
                wanted.push(id.clone());
            }
        }

        let detached: Vec<R> = current
            .iter()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        let attached: Vec<R> = wanted
            .into_iter()
            .filter(|id| !current.contains(id))
            .collect();

        let applied = match self.detach_on(&txn, &detached).await {
            Ok(()) => self.attach_on(&txn, &attached).await,
            Err(err) => Err(err),
        };
        if let Err(err) = applied {
            txn.rollback().await?;
            return Err(err);
        }
        txn.commit().await?;

        tracing::debug!(
            table = self.pivot.table,
            attached = attached.len(),
            detached = detached.len(),
            "Pivot synced"
        );

        Ok(SyncChanges { attached, detached })
    }
}
